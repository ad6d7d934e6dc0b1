use crate::application::{PlanResolver, SessionRegistry, SessionTimings, TextService};
use crate::infrastructure::{
    AppConfig, FileKeyValueStore, LlmClient, PostgresProfileRepository, SystemClock,
};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

pub type SessionRegistryType = SessionRegistry<PostgresProfileRepository, FileKeyValueStore>;

pub type TextServiceType = TextService<LlmClient>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sessions: Arc<SessionRegistryType>,
    pub text: Arc<TextServiceType>,
    pub admin_token: String,
    pub cors_allowed_origin: Option<String>,
}

/// Build full state from config + an existing pool.
///
/// Intended for embedding into a larger service that already manages a `PgPool`.
pub async fn build_state_with_pool(
    config: AppConfig,
    pool: PgPool,
    run_migrations: bool,
) -> anyhow::Result<AppState> {
    if run_migrations {
        // The profile store may be down at boot; plans then come from the
        // local cache until it is back.
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "Profile database migrations failed, continuing without it");
        }
    }

    let store = Arc::new(
        FileKeyValueStore::open(&config.store_path)
            .await
            .context("open local store")?,
    );

    let profiles = Arc::new(PostgresProfileRepository::new(pool.clone()));
    let resolver = PlanResolver::new(profiles, store.clone(), config.profile_timeout());
    let timings = SessionTimings {
        plan_refresh: config.plan_refresh(),
        plan_retry: config.plan_retry(),
        idle_timeout: config.session_idle(),
    };
    let sessions = Arc::new(
        SessionRegistry::new(resolver, store, Arc::new(SystemClock)).with_timings(timings),
    );

    let llm = Arc::new(
        LlmClient::new(
            config.llm_base_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
            config.llm_timeout(),
        )
        .context("init language model client")?,
    );
    let text = Arc::new(TextService::new(llm));

    Ok(AppState {
        pool,
        sessions,
        text,
        admin_token: config.admin_token,
        cors_allowed_origin: config.cors_allowed_origin,
    })
}

/// Build state for the standalone server.
///
/// Creates the `PgPool`, runs migrations, and wires the store and services.
///
/// The pool connects lazily, so an unreachable profile database does not
/// stop the server from starting.
pub async fn build_state_from_env(config: AppConfig) -> anyhow::Result<AppState> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(config.profile_timeout())
        .connect_lazy(&config.database_url)
        .context("parse database url")?;
    build_state_with_pool(config, pool, true).await
}
