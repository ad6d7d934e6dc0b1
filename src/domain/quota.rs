use super::plan::{entitlements_of, Limit, PlanTier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user daily counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub plan_tier: PlanTier,
    pub remaining_rewrites: Limit,
    pub remaining_generations: Limit,
    pub last_reset_date: NaiveDate,
}

impl QuotaState {
    /// Full daily allowance for `tier`, stamped with `today`.
    pub fn fresh(tier: PlanTier, today: NaiveDate) -> Self {
        let entitlements = entitlements_of(tier);
        Self {
            plan_tier: tier,
            remaining_rewrites: entitlements.rewrites_per_day,
            remaining_generations: entitlements.generations_per_day,
            last_reset_date: today,
        }
    }

    pub fn with_rewrite_consumed(&self) -> Self {
        Self {
            remaining_rewrites: self.remaining_rewrites.decremented(),
            ..self.clone()
        }
    }

    pub fn with_generation_consumed(&self) -> Self {
        Self {
            remaining_generations: self.remaining_generations.decremented(),
            ..self.clone()
        }
    }

    /// Counters clamped to the tier's daily limits.
    ///
    /// Stored records can carry counters above the plan limit (hand edits, a
    /// catalog change between releases); they never grant more than a fresh day.
    pub fn clamped(&self) -> Self {
        let entitlements = entitlements_of(self.plan_tier);
        Self {
            remaining_rewrites: self.remaining_rewrites.min(entitlements.rewrites_per_day),
            remaining_generations: self
                .remaining_generations
                .min(entitlements.generations_per_day),
            ..self.clone()
        }
    }
}

/// Daily rollover.
///
/// Resets the counters only when `today` is strictly after the last reset. A
/// clock moved backwards (`today < last_reset_date`) leaves the state alone.
pub fn rollover(state: &QuotaState, today: NaiveDate) -> QuotaState {
    if today > state.last_reset_date {
        QuotaState::fresh(state.plan_tier, today)
    } else {
        state.clone()
    }
}
