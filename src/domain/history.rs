use super::plan::Limit;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
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
pub enum HistoryKind {
    Rewrite,
    Generation,
}

/// A past rewrite or generation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub kind: HistoryKind,
    pub input: String,
    pub output: String,
    pub style: String,
    pub length: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        kind: HistoryKind,
        input: String,
        output: String,
        style: String,
        length: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            input,
            output,
            style,
            length,
            created_at,
        }
    }

    pub fn is_retained(&self, now: DateTime<Utc>, retention_days: Limit) -> bool {
        match retention_days {
            Limit::Unlimited => true,
            Limit::Limited(days) => now - self.created_at <= Duration::days(i64::from(days)),
        }
    }
}

/// Entries still visible under `retention_days`, in their stored order.
///
/// Stored entries are never deleted; expiry only hides them.
pub fn retained(
    entries: &[HistoryEntry],
    now: DateTime<Utc>,
    retention_days: Limit,
) -> Vec<HistoryEntry> {
    entries
        .iter()
        .filter(|e| e.is_retained(now, retention_days))
        .cloned()
        .collect()
}
