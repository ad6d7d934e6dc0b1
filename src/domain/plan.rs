use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Subscription level. Ordered `Free < Plus < Pro`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanTier {
    Free,
    Plus,
    Pro,
}

impl Default for PlanTier {
    fn default() -> Self {
        PlanTier::Free
    }
}

impl PlanTier {
    pub fn entitlements(self) -> PlanEntitlements {
        entitlements_of(self)
    }

    /// The next tier up, if any.
    pub fn upgrade(self) -> Option<PlanTier> {
        PlanTier::iter().find(|t| *t > self)
    }
}

/// A daily allowance or size cap that may be unbounded.
///
/// `Limited(_)` always orders below `Unlimited`, so comparisons across tiers
/// work with the derived ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Limited(u32),
    Unlimited,
}

impl Limit {
    pub fn is_exhausted(self) -> bool {
        matches!(self, Limit::Limited(0))
    }

    /// Whether `amount` fits under this cap (inclusive).
    pub fn allows(self, amount: u32) -> bool {
        match self {
            Limit::Limited(max) => amount <= max,
            Limit::Unlimited => true,
        }
    }

    /// One less, saturating at zero. Unbounded stays unbounded.
    pub fn decremented(self) -> Limit {
        match self {
            Limit::Limited(n) => Limit::Limited(n.saturating_sub(1)),
            Limit::Unlimited => Limit::Unlimited,
        }
    }

    pub fn as_option(self) -> Option<u32> {
        match self {
            Limit::Limited(n) => Some(n),
            Limit::Unlimited => None,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Limited(n) => write!(f, "{}", n),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl FromStr for Limit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unlimited" => Ok(Limit::Unlimited),
            other => other
                .parse::<u32>()
                .map(Limit::Limited)
                .map_err(|_| format!("invalid limit: {:?}", s)),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    Txt,
    Md,
    Json,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain; charset=utf-8",
            ExportFormat::Md => "text/markdown; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntitlements {
    pub rewrites_per_day: Limit,
    pub generations_per_day: Limit,
    pub max_words_per_text: Limit,
    /// Styles are offered in a fixed order; index `i` is usable iff `i < unlocked_style_count`.
    pub unlocked_style_count: usize,
    pub advanced_options_allowed: bool,
    pub export_formats: BTreeSet<ExportFormat>,
    pub history_retention_days: Limit,
}

pub fn entitlements_of(tier: PlanTier) -> PlanEntitlements {
    match tier {
        PlanTier::Free => PlanEntitlements {
            rewrites_per_day: Limit::Limited(5),
            generations_per_day: Limit::Limited(3),
            max_words_per_text: Limit::Limited(500),
            unlocked_style_count: 3,
            advanced_options_allowed: false,
            export_formats: BTreeSet::from([ExportFormat::Txt]),
            history_retention_days: Limit::Limited(7),
        },
        PlanTier::Plus => PlanEntitlements {
            rewrites_per_day: Limit::Limited(30),
            generations_per_day: Limit::Limited(20),
            max_words_per_text: Limit::Limited(2000),
            unlocked_style_count: 10,
            advanced_options_allowed: true,
            export_formats: ExportFormat::iter().collect(),
            history_retention_days: Limit::Unlimited,
        },
        PlanTier::Pro => PlanEntitlements {
            rewrites_per_day: Limit::Unlimited,
            generations_per_day: Limit::Unlimited,
            max_words_per_text: Limit::Unlimited,
            unlocked_style_count: 10,
            advanced_options_allowed: true,
            export_formats: ExportFormat::iter().collect(),
            history_retention_days: Limit::Unlimited,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_extensions_match_format_names() {
        assert_eq!(ExportFormat::Txt.extension(), "txt");
        assert_eq!(ExportFormat::Md.extension(), "md");
        assert_eq!(ExportFormat::Json.extension(), "json");
    }

    fn at_most(lower: &PlanEntitlements, upper: &PlanEntitlements) -> bool {
        lower.rewrites_per_day <= upper.rewrites_per_day
            && lower.generations_per_day <= upper.generations_per_day
            && lower.max_words_per_text <= upper.max_words_per_text
            && lower.unlocked_style_count <= upper.unlocked_style_count
            && lower.advanced_options_allowed <= upper.advanced_options_allowed
            && lower.export_formats.is_subset(&upper.export_formats)
            && lower.history_retention_days <= upper.history_retention_days
    }

    #[test]
    fn entitlements_are_monotonic_across_tiers() {
        let tiers: Vec<PlanTier> = PlanTier::iter().collect();
        for pair in tiers.windows(2) {
            assert!(
                at_most(&entitlements_of(pair[0]), &entitlements_of(pair[1])),
                "{} must not exceed {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn limited_orders_below_unlimited() {
        assert!(Limit::Limited(u32::MAX) < Limit::Unlimited);
        assert!(Limit::Limited(3) < Limit::Limited(5));
    }

    #[test]
    fn decrement_saturates_at_zero() {
        assert_eq!(Limit::Limited(1).decremented(), Limit::Limited(0));
        assert_eq!(Limit::Limited(0).decremented(), Limit::Limited(0));
        assert_eq!(Limit::Unlimited.decremented(), Limit::Unlimited);
    }

    #[test]
    fn limit_string_form_round_trips() {
        assert_eq!("unlimited".parse::<Limit>(), Ok(Limit::Unlimited));
        assert_eq!("12".parse::<Limit>(), Ok(Limit::Limited(12)));
        assert_eq!(Limit::Limited(12).to_string(), "12");
        assert!("-1".parse::<Limit>().is_err());
        assert!("lots".parse::<Limit>().is_err());
    }

    #[test]
    fn tier_parsing_rejects_unknown_values() {
        assert_eq!("plus".parse::<PlanTier>().ok(), Some(PlanTier::Plus));
        assert!("basic".parse::<PlanTier>().is_err());
        assert!("".parse::<PlanTier>().is_err());
    }

    #[test]
    fn upgrade_path_ends_at_pro() {
        assert_eq!(PlanTier::Free.upgrade(), Some(PlanTier::Plus));
        assert_eq!(PlanTier::Plus.upgrade(), Some(PlanTier::Pro));
        assert_eq!(PlanTier::Pro.upgrade(), None);
    }
}
