//! Entitlement checks.
//!
//! Every function here is pure: it reads the plan catalog or a quota snapshot
//! and returns a verdict. Callers run all relevant checks before invoking a
//! feature action and before touching the quota counters.

use crate::domain::{entitlements_of, ExportFormat, PlanTier, QuotaState};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenialReason {
    #[error("This style is not available on your plan ({unlocked} styles unlocked)")]
    StyleLocked { style_index: usize, unlocked: usize },
    #[error("Text has {words} words; your plan allows up to {max}")]
    WordLimitExceeded { words: u32, max: u32 },
    #[error("Advanced options are not available on your plan")]
    AdvancedOptionsLocked,
    #[error("You have used all of today's rewrites")]
    RewriteQuotaExhausted,
    #[error("You have used all of today's generations")]
    GenerationQuotaExhausted,
    #[error("Export as {format} is not available on your plan")]
    ExportFormatLocked { format: ExportFormat },
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::StyleLocked { .. } => "style_locked",
            DenialReason::WordLimitExceeded { .. } => "word_limit_exceeded",
            DenialReason::AdvancedOptionsLocked => "advanced_options_locked",
            DenialReason::RewriteQuotaExhausted => "rewrite_quota_exhausted",
            DenialReason::GenerationQuotaExhausted => "generation_quota_exhausted",
            DenialReason::ExportFormatLocked { .. } => "export_format_locked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Allowed,
    Denied(DenialReason),
}

impl GateVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateVerdict::Allowed)
    }

    pub fn reason(&self) -> Option<&DenialReason> {
        match self {
            GateVerdict::Allowed => None,
            GateVerdict::Denied(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), DenialReason> {
        match self {
            GateVerdict::Allowed => Ok(()),
            GateVerdict::Denied(reason) => Err(reason),
        }
    }

    fn check(allowed: bool, reason: impl FnOnce() -> DenialReason) -> Self {
        if allowed {
            GateVerdict::Allowed
        } else {
            GateVerdict::Denied(reason())
        }
    }
}

pub fn can_use_style(tier: PlanTier, style_index: usize) -> GateVerdict {
    let unlocked = entitlements_of(tier).unlocked_style_count;
    GateVerdict::check(style_index < unlocked, || DenialReason::StyleLocked {
        style_index,
        unlocked,
    })
}

pub fn can_use_word_count(tier: PlanTier, word_count: u32) -> GateVerdict {
    let max = entitlements_of(tier).max_words_per_text;
    GateVerdict::check(max.allows(word_count), || DenialReason::WordLimitExceeded {
        words: word_count,
        max: max.as_option().unwrap_or(u32::MAX),
    })
}

pub fn can_use_advanced_options(tier: PlanTier) -> GateVerdict {
    GateVerdict::check(entitlements_of(tier).advanced_options_allowed, || {
        DenialReason::AdvancedOptionsLocked
    })
}

pub fn can_perform_rewrite(state: &QuotaState) -> GateVerdict {
    GateVerdict::check(!state.remaining_rewrites.is_exhausted(), || {
        DenialReason::RewriteQuotaExhausted
    })
}

pub fn can_perform_generation(state: &QuotaState) -> GateVerdict {
    GateVerdict::check(!state.remaining_generations.is_exhausted(), || {
        DenialReason::GenerationQuotaExhausted
    })
}

pub fn can_export(tier: PlanTier, format: ExportFormat) -> GateVerdict {
    GateVerdict::check(entitlements_of(tier).export_formats.contains(&format), || {
        DenialReason::ExportFormatLocked { format }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Limit;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date")
    }

    #[test]
    fn free_tier_style_boundary() {
        let unlocked = entitlements_of(PlanTier::Free).unlocked_style_count;
        assert!(can_use_style(PlanTier::Free, 0).is_allowed());
        assert!(can_use_style(PlanTier::Free, unlocked - 1).is_allowed());
        assert_eq!(
            can_use_style(PlanTier::Free, unlocked),
            GateVerdict::Denied(DenialReason::StyleLocked {
                style_index: unlocked,
                unlocked,
            })
        );
    }

    #[test]
    fn word_limit_is_inclusive() {
        assert!(can_use_word_count(PlanTier::Free, 500).is_allowed());
        assert!(!can_use_word_count(PlanTier::Free, 501).is_allowed());
        assert!(can_use_word_count(PlanTier::Pro, u32::MAX).is_allowed());
    }

    #[test]
    fn advanced_options_locked_on_free() {
        assert_eq!(
            can_use_advanced_options(PlanTier::Free).reason(),
            Some(&DenialReason::AdvancedOptionsLocked)
        );
        assert!(can_use_advanced_options(PlanTier::Plus).is_allowed());
    }

    #[test]
    fn quota_checks_follow_remaining_counts() {
        let state = QuotaState {
            remaining_rewrites: Limit::Limited(0),
            remaining_generations: Limit::Limited(1),
            ..QuotaState::fresh(PlanTier::Free, today())
        };
        assert_eq!(
            can_perform_rewrite(&state).into_result(),
            Err(DenialReason::RewriteQuotaExhausted)
        );
        assert!(can_perform_generation(&state).is_allowed());

        let pro = QuotaState::fresh(PlanTier::Pro, today());
        assert!(can_perform_rewrite(&pro).is_allowed());
    }

    #[test]
    fn export_formats_follow_plan() {
        assert!(can_export(PlanTier::Free, ExportFormat::Txt).is_allowed());
        assert!(!can_export(PlanTier::Free, ExportFormat::Json).is_allowed());
        assert!(can_export(PlanTier::Plus, ExportFormat::Md).is_allowed());
    }

    #[test]
    fn reasons_carry_user_facing_messages() {
        let reason = DenialReason::WordLimitExceeded { words: 800, max: 500 };
        assert_eq!(reason.to_string(), "Text has 800 words; your plan allows up to 500");
        assert_eq!(reason.code(), "word_limit_exceeded");
    }
}
