use crate::domain::{retained, HistoryEntry, HistoryKind, Limit};
use crate::infrastructure::{user_key, Clock, KeyValueStore, StoreError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// One user's rewrite and generation history.
///
/// Each kind is a JSON array stored under its own key, newest entry first.
/// Entries are only ever added; retention is applied when reading.
pub struct HistoryLog<S>
where
    S: KeyValueStore,
{
    user_id: String,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl<S> HistoryLog<S>
where
    S: KeyValueStore,
{
    pub fn new(user_id: &str, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            user_id: user_id.to_string(),
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Adds `entry` at the front of its kind's list.
    pub async fn append(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(entry.kind).await?;
        let key = self.key(entry.kind);
        entries.insert(0, entry);
        let raw = serde_json::to_string(&entries)?;
        self.store.set(&key, raw).await
    }

    /// Entries of `kind` still visible under `retention_days`, newest first.
    pub async fn list(&self, kind: HistoryKind, retention_days: Limit) -> Vec<HistoryEntry> {
        match self.load(kind).await {
            Ok(entries) => retained(&entries, self.clock.now(), retention_days),
            Err(e) => {
                warn!(user_id = %self.user_id, kind = %kind, error = %e, "Failed to read history");
                Vec::new()
            }
        }
    }

    /// A visible entry of either kind by id.
    pub async fn find(&self, id: Uuid, retention_days: Limit) -> Option<HistoryEntry> {
        for kind in [HistoryKind::Rewrite, HistoryKind::Generation] {
            if let Some(entry) = self
                .list(kind, retention_days)
                .await
                .into_iter()
                .find(|e| e.id == id)
            {
                return Some(entry);
            }
        }
        None
    }

    async fn load(&self, kind: HistoryKind) -> Result<Vec<HistoryEntry>, StoreError> {
        let key = self.key(kind);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    key = %key,
                    error = %e,
                    "Discarding malformed history record"
                );
                Ok(Vec::new())
            }
        }
    }

    fn key(&self, kind: HistoryKind) -> String {
        user_key(&self.user_id, &format!("history/{}", kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{InMemoryKeyValueStore, SystemClock};
    use chrono::{Duration, Utc};

    fn log(store: Arc<InMemoryKeyValueStore>) -> HistoryLog<InMemoryKeyValueStore> {
        HistoryLog::new("u1", store, Arc::new(SystemClock))
    }

    fn entry(kind: HistoryKind, output: &str, age_days: i64) -> HistoryEntry {
        HistoryEntry::new(
            kind,
            "input".to_string(),
            output.to_string(),
            "formal".to_string(),
            None,
            Utc::now() - Duration::days(age_days),
        )
    }

    #[tokio::test]
    async fn newest_entry_comes_first() {
        let history = log(Arc::new(InMemoryKeyValueStore::new()));
        history.append(entry(HistoryKind::Rewrite, "first", 0)).await.unwrap();
        history.append(entry(HistoryKind::Rewrite, "second", 0)).await.unwrap();

        let outputs: Vec<String> = history
            .list(HistoryKind::Rewrite, Limit::Unlimited)
            .await
            .into_iter()
            .map(|e| e.output)
            .collect();
        assert_eq!(outputs, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn kinds_are_kept_apart() {
        let history = log(Arc::new(InMemoryKeyValueStore::new()));
        history.append(entry(HistoryKind::Rewrite, "r", 0)).await.unwrap();
        history.append(entry(HistoryKind::Generation, "g", 0)).await.unwrap();

        assert_eq!(history.list(HistoryKind::Rewrite, Limit::Unlimited).await.len(), 1);
        assert_eq!(history.list(HistoryKind::Generation, Limit::Unlimited).await.len(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_hidden_not_deleted() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let history = log(store.clone());
        let old = entry(HistoryKind::Rewrite, "old", 30);
        let old_id = old.id;
        history.append(old).await.unwrap();
        history.append(entry(HistoryKind::Rewrite, "new", 1)).await.unwrap();

        assert_eq!(history.list(HistoryKind::Rewrite, Limit::Limited(7)).await.len(), 1);
        assert!(history.find(old_id, Limit::Limited(7)).await.is_none());
        assert!(history.find(old_id, Limit::Unlimited).await.is_some());
    }

    #[tokio::test]
    async fn malformed_record_reads_as_empty() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set("u1/history/rewrite", "{not json".to_string()).await.unwrap();
        let history = log(store);

        assert!(history.list(HistoryKind::Rewrite, Limit::Unlimited).await.is_empty());
        history.append(entry(HistoryKind::Rewrite, "fresh", 0)).await.unwrap();
        assert_eq!(history.list(HistoryKind::Rewrite, Limit::Unlimited).await.len(), 1);
    }
}
