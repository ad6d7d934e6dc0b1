use crate::domain::PlanTier;
use crate::infrastructure::{user_key, KeyValueStore, ProfileError, ProfileRepository};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tracing::{debug, info, warn};

const CACHED_TIER_FIELD: &str = "plan/cached_tier";

/// Where a resolved tier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanSource {
    Remote,
    Cache,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanResolution {
    pub tier: PlanTier,
    pub source: PlanSource,
}

pub struct PlanResolver<P, S>
where
    P: ProfileRepository,
    S: KeyValueStore,
{
    profiles: Arc<P>,
    store: Arc<S>,
    timeout: Duration,
}

impl<P, S> PlanResolver<P, S>
where
    P: ProfileRepository,
    S: KeyValueStore,
{
    pub fn new(profiles: Arc<P>, store: Arc<S>, timeout: Duration) -> Self {
        Self {
            profiles,
            store,
            timeout,
        }
    }

    /// Remote profile first, then the locally cached tier, then `free`.
    ///
    /// A remote answer refreshes the local cache. Remote errors, timeouts and
    /// "no plan on record" all fall through to the cache.
    pub async fn resolve(&self, user_id: &str) -> PlanResolution {
        match self.fetch_remote(user_id).await {
            Ok(Some(tier)) => {
                self.cache(user_id, tier).await;
                debug!(user_id = %user_id, tier = %tier, "Plan resolved from profile");
                return PlanResolution {
                    tier,
                    source: PlanSource::Remote,
                };
            }
            Ok(None) => {
                debug!(user_id = %user_id, "No plan on record, checking local cache");
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Profile lookup failed, checking local cache");
            }
        }

        if let Some(tier) = self.cached(user_id).await {
            return PlanResolution {
                tier,
                source: PlanSource::Cache,
            };
        }

        PlanResolution {
            tier: PlanTier::default(),
            source: PlanSource::Default,
        }
    }

    /// Records `tier` remotely and in the local cache.
    ///
    /// The cache is written even when the remote write fails; the error is
    /// returned so the caller can report it.
    pub async fn set_plan(&self, user_id: &str, tier: PlanTier) -> Result<(), ProfileError> {
        let remote = match tokio::time::timeout(
            self.timeout,
            self.profiles.set_plan_tier(user_id, tier),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProfileError::Timeout),
        };

        self.cache(user_id, tier).await;

        match remote {
            Ok(()) => {
                info!(user_id = %user_id, tier = %tier, "Plan recorded in profile");
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %user_id, tier = %tier, error = %e, "Failed to record plan in profile");
                Err(e)
            }
        }
    }

    async fn fetch_remote(&self, user_id: &str) -> Result<Option<PlanTier>, ProfileError> {
        tokio::time::timeout(self.timeout, self.profiles.get_plan_tier(user_id))
            .await
            .map_err(|_| ProfileError::Timeout)?
    }

    async fn cached(&self, user_id: &str) -> Option<PlanTier> {
        let key = user_key(user_id, CACHED_TIER_FIELD);
        match self.store.get(&key).await {
            Ok(Some(raw)) => match raw.parse::<PlanTier>() {
                Ok(tier) => Some(tier),
                Err(_) => {
                    warn!(user_id = %user_id, value = %raw, "Ignoring malformed cached plan tier");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to read cached plan tier");
                None
            }
        }
    }

    async fn cache(&self, user_id: &str, tier: PlanTier) {
        let key = user_key(user_id, CACHED_TIER_FIELD);
        if let Err(e) = self.store.set(&key, tier.to_string()).await {
            warn!(user_id = %user_id, error = %e, "Failed to cache plan tier");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryKeyValueStore;
    use async_trait::async_trait;

    enum Remote {
        Tier(Option<PlanTier>),
        Fails,
        Hangs,
    }

    struct StubProfiles(Remote);

    #[async_trait]
    impl ProfileRepository for StubProfiles {
        async fn get_plan_tier(&self, _user_id: &str) -> Result<Option<PlanTier>, ProfileError> {
            match &self.0 {
                Remote::Tier(tier) => Ok(*tier),
                Remote::Fails => Err(ProfileError::Unavailable("down".to_string())),
                Remote::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }

        async fn set_plan_tier(&self, _user_id: &str, _tier: PlanTier) -> Result<(), ProfileError> {
            match &self.0 {
                Remote::Fails => Err(ProfileError::Unavailable("down".to_string())),
                _ => Ok(()),
            }
        }
    }

    fn resolver(remote: Remote, store: Arc<InMemoryKeyValueStore>) -> PlanResolver<StubProfiles, InMemoryKeyValueStore> {
        PlanResolver::new(Arc::new(StubProfiles(remote)), store, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn remote_tier_wins_and_is_cached() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set("u1/plan/cached_tier", "plus".to_string()).await.unwrap();

        let resolution = resolver(Remote::Tier(Some(PlanTier::Pro)), store.clone())
            .resolve("u1")
            .await;

        assert_eq!(resolution.tier, PlanTier::Pro);
        assert_eq!(resolution.source, PlanSource::Remote);
        assert_eq!(
            store.get("u1/plan/cached_tier").await.unwrap(),
            Some("pro".to_string())
        );
    }

    #[tokio::test]
    async fn absent_remote_falls_back_to_cache() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set("u1/plan/cached_tier", "plus".to_string()).await.unwrap();

        let resolution = resolver(Remote::Tier(None), store).resolve("u1").await;
        assert_eq!(resolution.tier, PlanTier::Plus);
        assert_eq!(resolution.source, PlanSource::Cache);
    }

    #[tokio::test]
    async fn failing_remote_without_cache_defaults_to_free() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let resolution = resolver(Remote::Fails, store).resolve("u1").await;
        assert_eq!(
            resolution,
            PlanResolution {
                tier: PlanTier::Free,
                source: PlanSource::Default,
            }
        );
    }

    #[tokio::test]
    async fn slow_remote_times_out() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set("u1/plan/cached_tier", "pro".to_string()).await.unwrap();

        let resolution = resolver(Remote::Hangs, store).resolve("u1").await;
        assert_eq!(resolution.source, PlanSource::Cache);
    }

    #[tokio::test]
    async fn malformed_cache_is_ignored() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set("u1/plan/cached_tier", "gold".to_string()).await.unwrap();

        let resolution = resolver(Remote::Tier(None), store).resolve("u1").await;
        assert_eq!(resolution.source, PlanSource::Default);
    }

    #[tokio::test]
    async fn set_plan_caches_even_when_remote_fails() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let result = resolver(Remote::Fails, store.clone())
            .set_plan("u1", PlanTier::Plus)
            .await;

        assert!(matches!(result, Err(ProfileError::Unavailable(_))));
        assert_eq!(
            store.get("u1/plan/cached_tier").await.unwrap(),
            Some("plus".to_string())
        );
    }
}
