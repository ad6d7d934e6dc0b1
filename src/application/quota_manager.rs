use crate::domain::{rollover, Limit, PlanTier, QuotaState};
use crate::infrastructure::{user_key, Clock, KeyValueStore, StoreError};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PLAN_TIER_FIELD: &str = "quota/plan_tier";
const REMAINING_REWRITES_FIELD: &str = "quota/remaining_rewrites";
const REMAINING_GENERATIONS_FIELD: &str = "quota/remaining_generations";
const LAST_RESET_FIELD: &str = "quota/last_reset_date";

/// Live daily counters for one user.
///
/// Every operation holds the state lock until it has persisted, so rollover
/// and decrements for the same user never interleave. Store failures are
/// logged and the in-memory state stays authoritative.
pub struct QuotaManager<S>
where
    S: KeyValueStore,
{
    user_id: String,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    state: Mutex<QuotaState>,
}

impl<S> QuotaManager<S>
where
    S: KeyValueStore,
{
    /// Restores the stored counters for `user_id` under the resolved `tier`.
    ///
    /// A stored record for a different tier is replaced by a fresh allowance
    /// for `tier`; a missing or malformed record starts a fresh day.
    pub async fn load(user_id: &str, tier: PlanTier, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();

        let initial = match read_state(store.as_ref(), user_id).await {
            Ok(Some(stored)) if stored.plan_tier == tier => stored.clamped(),
            Ok(Some(stored)) => {
                info!(
                    user_id = %user_id,
                    stored_tier = %stored.plan_tier,
                    resolved_tier = %tier,
                    "Stored quota belongs to another plan, resetting"
                );
                QuotaState::fresh(tier, today)
            }
            Ok(None) => QuotaState::fresh(tier, today),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Discarding unreadable quota record");
                QuotaState::fresh(tier, today)
            }
        };

        let manager = Self {
            user_id: user_id.to_string(),
            store,
            clock,
            state: Mutex::new(initial.clone()),
        };
        manager.persist(&initial).await;
        manager
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Counters after applying today's rollover.
    pub async fn current_state(&self) -> QuotaState {
        let mut state = self.state.lock().await;
        self.roll(&mut state).await;
        state.clone()
    }

    /// Spends one rewrite. No-op at zero; never a gate.
    pub async fn decrement_rewrite(&self) -> QuotaState {
        self.update(QuotaState::with_rewrite_consumed).await
    }

    /// Spends one generation. No-op at zero; never a gate.
    pub async fn decrement_generation(&self) -> QuotaState {
        self.update(QuotaState::with_generation_consumed).await
    }

    /// Manual reset to the plan's daily limits.
    pub async fn reset_today(&self) -> QuotaState {
        let today = self.clock.today();
        let mut state = self.state.lock().await;
        let fresh = QuotaState::fresh(state.plan_tier, today);
        info!(user_id = %self.user_id, tier = %fresh.plan_tier, "Quota reset on request");
        self.replace(&mut state, fresh).await;
        state.clone()
    }

    /// Switches plans and grants the new tier's full daily allowance.
    ///
    /// Unconditional in both directions: a downgrade revokes whatever was
    /// left of the old allowance.
    pub async fn apply_plan_change(&self, tier: PlanTier) -> QuotaState {
        let today = self.clock.today();
        let mut state = self.state.lock().await;
        info!(
            user_id = %self.user_id,
            from = %state.plan_tier,
            to = %tier,
            "Applying plan change"
        );
        self.replace(&mut state, QuotaState::fresh(tier, today)).await;
        state.clone()
    }

    async fn update(&self, f: impl FnOnce(&QuotaState) -> QuotaState) -> QuotaState {
        let mut state = self.state.lock().await;
        self.roll(&mut state).await;
        let next = f(&*state);
        if next != *state {
            self.replace(&mut state, next).await;
        } else {
            debug!(user_id = %self.user_id, "Counter already at zero, decrement skipped");
        }
        state.clone()
    }

    async fn roll(&self, state: &mut QuotaState) {
        let rolled = rollover(state, self.clock.today());
        if rolled != *state {
            debug!(
                user_id = %self.user_id,
                date = %rolled.last_reset_date,
                "Daily quota rollover"
            );
            self.replace(state, rolled).await;
        }
    }

    async fn replace(&self, state: &mut QuotaState, next: QuotaState) {
        *state = next;
        self.persist(state).await;
    }

    async fn persist(&self, state: &QuotaState) {
        if let Err(e) = write_state(self.store.as_ref(), &self.user_id, state).await {
            warn!(user_id = %self.user_id, error = %e, "Failed to persist quota state");
        }
    }
}

async fn read_state<S: KeyValueStore>(
    store: &S,
    user_id: &str,
) -> Result<Option<QuotaState>, StoreError> {
    let tier_key = user_key(user_id, PLAN_TIER_FIELD);
    let Some(tier_raw) = store.get(&tier_key).await? else {
        return Ok(None);
    };

    let plan_tier = tier_raw
        .parse::<PlanTier>()
        .map_err(|_| mismatch(&tier_key, &tier_raw))?;
    let remaining_rewrites = read_field::<Limit, S>(store, user_id, REMAINING_REWRITES_FIELD).await?;
    let remaining_generations =
        read_field::<Limit, S>(store, user_id, REMAINING_GENERATIONS_FIELD).await?;
    let last_reset_date = read_field::<NaiveDate, S>(store, user_id, LAST_RESET_FIELD).await?;

    Ok(Some(QuotaState {
        plan_tier,
        remaining_rewrites,
        remaining_generations,
        last_reset_date,
    }))
}

async fn read_field<T, S>(store: &S, user_id: &str, field: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    S: KeyValueStore,
{
    let key = user_key(user_id, field);
    let raw = store
        .get(&key)
        .await?
        .ok_or_else(|| mismatch(&key, "<missing>"))?;
    raw.parse::<T>().map_err(|_| mismatch(&key, &raw))
}

fn mismatch(key: &str, raw: &str) -> StoreError {
    StoreError::SchemaMismatch {
        key: key.to_string(),
        reason: format!("unexpected value {:?}", raw),
    }
}

async fn write_state<S: KeyValueStore>(
    store: &S,
    user_id: &str,
    state: &QuotaState,
) -> Result<(), StoreError> {
    store
        .set_many(vec![
            (user_key(user_id, PLAN_TIER_FIELD), state.plan_tier.to_string()),
            (
                user_key(user_id, REMAINING_REWRITES_FIELD),
                state.remaining_rewrites.to_string(),
            ),
            (
                user_key(user_id, REMAINING_GENERATIONS_FIELD),
                state.remaining_generations.to_string(),
            ),
            (
                user_key(user_id, LAST_RESET_FIELD),
                state.last_reset_date.format("%Y-%m-%d").to_string(),
            ),
        ])
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryKeyValueStore;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex as StdMutex;

    struct FixedClock {
        today: StdMutex<NaiveDate>,
    }

    impl FixedClock {
        fn on(date: NaiveDate) -> Arc<Self> {
            Arc::new(Self {
                today: StdMutex::new(date),
            })
        }

        fn set(&self, date: NaiveDate) {
            *self.today.lock().unwrap() = date;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }

        fn today(&self) -> NaiveDate {
            *self.today.lock().unwrap()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).expect("valid date")
    }

    #[tokio::test]
    async fn first_session_starts_with_full_allowance() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let manager = QuotaManager::load("u1", PlanTier::Free, store.clone(), FixedClock::on(day(1))).await;

        let state = manager.current_state().await;
        assert_eq!(state, QuotaState::fresh(PlanTier::Free, day(1)));
        assert_eq!(
            store.get("u1/quota/remaining_rewrites").await.unwrap(),
            Some("5".to_string())
        );
        assert_eq!(
            store.get("u1/quota/last_reset_date").await.unwrap(),
            Some("2024-06-01".to_string())
        );
    }

    #[tokio::test]
    async fn counters_survive_a_new_session() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let clock = FixedClock::on(day(1));
        let first = QuotaManager::load("u1", PlanTier::Free, store.clone(), clock.clone()).await;
        first.decrement_rewrite().await;
        first.decrement_generation().await;

        let second = QuotaManager::load("u1", PlanTier::Free, store, clock).await;
        let state = second.current_state().await;
        assert_eq!(state.remaining_rewrites, Limit::Limited(4));
        assert_eq!(state.remaining_generations, Limit::Limited(2));
    }

    #[tokio::test]
    async fn rollover_happens_on_read_after_midnight() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let clock = FixedClock::on(day(1));
        let manager = QuotaManager::load("u1", PlanTier::Free, store, clock.clone()).await;
        for _ in 0..5 {
            manager.decrement_rewrite().await;
        }
        assert_eq!(manager.current_state().await.remaining_rewrites, Limit::Limited(0));

        clock.set(day(2));
        let first = manager.current_state().await;
        let second = manager.current_state().await;
        assert_eq!(first.remaining_rewrites, Limit::Limited(5));
        assert_eq!(first.last_reset_date, day(2));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn clock_moving_backwards_keeps_counters() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let clock = FixedClock::on(day(5));
        let manager = QuotaManager::load("u1", PlanTier::Free, store, clock.clone()).await;
        manager.decrement_rewrite().await;

        clock.set(day(4));
        let state = manager.current_state().await;
        assert_eq!(state.remaining_rewrites, Limit::Limited(4));
        assert_eq!(state.last_reset_date, day(5));
    }

    #[tokio::test]
    async fn malformed_record_is_replaced_with_defaults() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store
            .set_many(vec![
                ("u1/quota/plan_tier".to_string(), "free".to_string()),
                ("u1/quota/remaining_rewrites".to_string(), "-3".to_string()),
                ("u1/quota/remaining_generations".to_string(), "1".to_string()),
                ("u1/quota/last_reset_date".to_string(), "yesterday".to_string()),
            ])
            .await
            .unwrap();

        let manager = QuotaManager::load("u1", PlanTier::Free, store.clone(), FixedClock::on(day(3))).await;
        assert_eq!(
            manager.current_state().await,
            QuotaState::fresh(PlanTier::Free, day(3))
        );
        assert_eq!(
            store.get("u1/quota/remaining_rewrites").await.unwrap(),
            Some("5".to_string())
        );
    }

    #[tokio::test]
    async fn resolved_tier_overrides_stored_tier() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let clock = FixedClock::on(day(1));
        let free = QuotaManager::load("u1", PlanTier::Free, store.clone(), clock.clone()).await;
        free.decrement_rewrite().await;

        let plus = QuotaManager::load("u1", PlanTier::Plus, store, clock).await;
        assert_eq!(
            plus.current_state().await,
            QuotaState::fresh(PlanTier::Plus, day(1))
        );
    }

    #[tokio::test]
    async fn reset_today_restores_limits() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let manager = QuotaManager::load("u1", PlanTier::Plus, store, FixedClock::on(day(1))).await;
        manager.decrement_rewrite().await;
        manager.decrement_generation().await;

        let state = manager.reset_today().await;
        assert_eq!(state, QuotaState::fresh(PlanTier::Plus, day(1)));
    }

    #[tokio::test]
    async fn plan_change_resets_regardless_of_prior_state() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let manager = QuotaManager::load("u1", PlanTier::Plus, store, FixedClock::on(day(1))).await;
        manager.decrement_rewrite().await;

        for tier in [PlanTier::Free, PlanTier::Pro, PlanTier::Plus, PlanTier::Free] {
            let state = manager.apply_plan_change(tier).await;
            let entitlements = tier.entitlements();
            assert_eq!(state.plan_tier, tier);
            assert_eq!(state.remaining_rewrites, entitlements.rewrites_per_day);
            assert_eq!(state.remaining_generations, entitlements.generations_per_day);
        }
    }
}
