use super::export::{render, ExportError, ExportedDocument};
use super::gate::can_export;
use super::history::HistoryLog;
use super::plan_resolver::{PlanResolution, PlanResolver, PlanSource};
use super::quota_manager::QuotaManager;
use crate::domain::{ExportFormat, HistoryEntry, HistoryKind, PlanTier, QuotaState};
use crate::infrastructure::{Clock, KeyValueStore, ProfileError, ProfileRepository};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// How long a session trusts its plan and how long an unused one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Age after which a plan read from the profile store is looked up again.
    pub plan_refresh: Duration,
    /// Age after which a cached or default plan is retried against the profile store.
    pub plan_retry: Duration,
    /// Sessions nobody has used for this long are dropped.
    pub idle_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            plan_refresh: Duration::from_secs(300),
            plan_retry: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedPlan {
    resolution: PlanResolution,
    resolved_at: DateTime<Utc>,
}

fn has_elapsed(since: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    (now - since)
        .to_std()
        .map(|age| age >= window)
        .unwrap_or(false)
}

/// Everything the process holds for one user.
///
/// There is exactly one session per user id, so its quota manager is the only
/// writer of that user's counters.
pub struct UserSession<S>
where
    S: KeyValueStore,
{
    user_id: String,
    plan: RwLock<ResolvedPlan>,
    quota: QuotaManager<S>,
    history: HistoryLog<S>,
    clock: Arc<dyn Clock>,
    action_lock: Mutex<()>,
}

impl<S> UserSession<S>
where
    S: KeyValueStore,
{
    pub async fn start(
        user_id: &str,
        resolution: PlanResolution,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let quota = QuotaManager::load(user_id, resolution.tier, store.clone(), clock.clone()).await;
        let history = HistoryLog::new(user_id, store, clock.clone());
        let plan = ResolvedPlan {
            resolution,
            resolved_at: clock.now(),
        };

        Self {
            user_id: user_id.to_string(),
            plan: RwLock::new(plan),
            quota,
            history,
            clock,
            action_lock: Mutex::new(()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// How the plan was last resolved.
    pub async fn resolution(&self) -> PlanResolution {
        self.plan.read().await.resolution
    }

    pub fn quota(&self) -> &QuotaManager<S> {
        &self.quota
    }

    pub fn history_log(&self) -> &HistoryLog<S> {
        &self.history
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn tier(&self) -> PlanTier {
        self.quota.current_state().await.plan_tier
    }

    /// Held from the first gate check until the quota decrement, so two
    /// actions by the same user cannot both pass on the last unit.
    pub async fn lock_actions(&self) -> MutexGuard<'_, ()> {
        self.action_lock.lock().await
    }

    pub async fn history(&self, kind: HistoryKind) -> Vec<HistoryEntry> {
        let retention = self.tier().await.entitlements().history_retention_days;
        self.history.list(kind, retention).await
    }

    pub async fn export(&self, id: Uuid, format: ExportFormat) -> Result<ExportedDocument, ExportError> {
        let tier = self.tier().await;
        can_export(tier, format)
            .into_result()
            .map_err(ExportError::Denied)?;

        let retention = tier.entitlements().history_retention_days;
        let entry = self
            .history
            .find(id, retention)
            .await
            .ok_or(ExportError::NotFound(id))?;
        render(&entry, format)
    }

    /// Takes a freshly resolved plan, resetting the quota when the tier moved.
    ///
    /// A `Default` answer never replaces a plan that came from the profile
    /// store or the cache. Callers hold the action lock.
    async fn adopt(&self, resolution: PlanResolution) {
        let now = self.clock.now();
        let mut plan = self.plan.write().await;
        if resolution.source == PlanSource::Default
            && plan.resolution.source != PlanSource::Default
        {
            plan.resolved_at = now;
            return;
        }

        if self.tier().await != resolution.tier {
            info!(
                user_id = %self.user_id,
                tier = %resolution.tier,
                source = %resolution.source,
                "Plan changed on refresh"
            );
            self.quota.apply_plan_change(resolution.tier).await;
        }
        *plan = ResolvedPlan {
            resolution,
            resolved_at: now,
        };
    }

    async fn plan_is_stale(&self, timings: &SessionTimings) -> bool {
        let plan = *self.plan.read().await;
        let window = match plan.resolution.source {
            PlanSource::Remote => timings.plan_refresh,
            PlanSource::Cache | PlanSource::Default => timings.plan_retry,
        };
        has_elapsed(plan.resolved_at, self.clock.now(), window)
    }
}

struct SessionSlot<S>
where
    S: KeyValueStore,
{
    session: Arc<UserSession<S>>,
    last_used: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PlanChange {
    pub quota: QuotaState,
    /// Set when the remote profile could not be updated.
    pub profile_error: Option<ProfileError>,
}

/// Process-wide map of live sessions.
pub struct SessionRegistry<P, S>
where
    P: ProfileRepository,
    S: KeyValueStore,
{
    resolver: PlanResolver<P, S>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    timings: SessionTimings,
    sessions: RwLock<HashMap<String, SessionSlot<S>>>,
    start_lock: Mutex<()>,
}

impl<P, S> SessionRegistry<P, S>
where
    P: ProfileRepository,
    S: KeyValueStore,
{
    pub fn new(resolver: PlanResolver<P, S>, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver,
            store,
            clock,
            timings: SessionTimings::default(),
            sessions: RwLock::new(HashMap::new()),
            start_lock: Mutex::new(()),
        }
    }

    pub fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }

    /// The user's session, starting one (plan resolution + quota load) on
    /// first use.
    ///
    /// A live session whose plan is stale asks the profile store again before
    /// it is handed out.
    pub async fn session(&self, user_id: &str) -> Arc<UserSession<S>> {
        if let Some(session) = self.touch(user_id).await {
            self.refresh_plan(&session).await;
            return session;
        }

        let _guard = self.start_lock.lock().await;
        if let Some(session) = self.touch(user_id).await {
            return session;
        }
        self.evict_idle().await;

        let resolution = self.resolver.resolve(user_id).await;
        info!(
            user_id = %user_id,
            tier = %resolution.tier,
            source = %resolution.source,
            "Starting session"
        );
        let session = Arc::new(
            UserSession::start(user_id, resolution, self.store.clone(), self.clock.clone()).await,
        );
        self.sessions.write().await.insert(
            user_id.to_string(),
            SessionSlot {
                session: session.clone(),
                last_used: self.clock.now(),
            },
        );
        session
    }

    /// Drops sessions unused for longer than the idle timeout and returns how
    /// many went.
    ///
    /// A session someone still holds is kept, so a user never has two live
    /// quota managers.
    pub async fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let idle_timeout = self.timings.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| {
            Arc::strong_count(&slot.session) > 1 || !has_elapsed(slot.last_used, now, idle_timeout)
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    async fn touch(&self, user_id: &str) -> Option<Arc<UserSession<S>>> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(user_id)?;
        slot.last_used = now;
        Some(slot.session.clone())
    }

    // The action lock is held across the lookup so a concurrent plan change
    // cannot be overwritten by an older answer.
    async fn refresh_plan(&self, session: &UserSession<S>) {
        if !session.plan_is_stale(&self.timings).await {
            return;
        }

        let _actions = session.lock_actions().await;
        if !session.plan_is_stale(&self.timings).await {
            return;
        }
        let resolution = self.resolver.resolve(session.user_id()).await;
        session.adopt(resolution).await;
    }

    /// Records a new plan and resets the live quota to its limits.
    ///
    /// The local change always applies; a remote failure is reported in
    /// [`PlanChange::profile_error`].
    pub async fn change_plan(&self, user_id: &str, tier: PlanTier) -> PlanChange {
        let profile_error = self.resolver.set_plan(user_id, tier).await.err();

        let session = self.session(user_id).await;
        let _actions = session.lock_actions().await;
        let quota = session.quota().apply_plan_change(tier).await;
        let source = if profile_error.is_none() {
            PlanSource::Remote
        } else {
            PlanSource::Cache
        };
        *session.plan.write().await = ResolvedPlan {
            resolution: PlanResolution { tier, source },
            resolved_at: self.clock.now(),
        };

        PlanChange {
            quota,
            profile_error,
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
