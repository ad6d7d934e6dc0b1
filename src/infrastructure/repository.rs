use crate::domain::PlanTier;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Profile service timed out")]
    Timeout,
    #[error("Profile service unavailable: {0}")]
    Unavailable(String),
}

/// Remote, authoritative record of each user's plan.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// `Ok(None)` when the user has no plan on record.
    #[must_use]
    async fn get_plan_tier(&self, user_id: &str) -> Result<Option<PlanTier>, ProfileError>;
    #[must_use]
    async fn set_plan_tier(&self, user_id: &str, tier: PlanTier) -> Result<(), ProfileError>;
}

pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn get_plan_tier(&self, user_id: &str) -> Result<Option<PlanTier>, ProfileError> {
        let row = sqlx::query(
            r#"
            SELECT plan_tier
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let tier_str: String = r.try_get("plan_tier")?;
                let tier = tier_str.parse::<PlanTier>().map_err(|_| {
                    ProfileError::InvalidData(format!("Unknown tier: {}", tier_str))
                })?;
                Ok(Some(tier))
            }
            None => Ok(None),
        }
    }

    async fn set_plan_tier(&self, user_id: &str, tier: PlanTier) -> Result<(), ProfileError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, plan_tier, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET plan_tier = EXCLUDED.plan_tier, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(tier.as_ref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
