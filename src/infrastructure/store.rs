use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Schema mismatch for {key}: {reason}")]
    SchemaMismatch { key: String, reason: String },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key → string persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    /// Writes all entries with a single flush.
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError>;
}

/// Namespaced key for one user's field, e.g. `user-1/quota/plan_tier`.
pub fn user_key(user_id: &str, field: &str) -> String {
    format!("{}/{}", user_id, field)
}

/// JSON object file, rewritten whole on every mutation.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    flush_lock: tokio::sync::Mutex<()>,
}

impl FileKeyValueStore {
    /// Opens `path`, starting empty if the file is missing or unreadable.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding malformed store file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened key-value store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            flush_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(serde_json::to_vec_pretty(&*entries)?)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.flush_lock.lock().await;
        let bytes = self.snapshot()?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn insert_all(&self, items: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        entries.extend(items);
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.insert_all(vec![(key.to_string(), value)])?;
        self.flush().await
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        self.insert_all(entries)?;
        self.flush().await
    }
}

/// Process-local store for tests and ephemeral deployments.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.set_many(vec![(key.to_string(), value)]).await
    }

    async fn set_many(&self, items: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        entries.extend(items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("texto-maestro-{}-{}", name, uuid::Uuid::new_v4()))
            .join("store.json")
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let path = temp_store_path("reopen");

        let store = FileKeyValueStore::open(&path).await.expect("open");
        store
            .set_many(vec![
                ("u/a".to_string(), "1".to_string()),
                ("u/b".to_string(), "two".to_string()),
            ])
            .await
            .expect("write");
        drop(store);

        let reopened = FileKeyValueStore::open(&path).await.expect("reopen");
        assert_eq!(reopened.get("u/a").await.expect("get"), Some("1".to_string()));
        assert_eq!(reopened.get("u/b").await.expect("get"), Some("two".to_string()));
        assert_eq!(reopened.get("u/c").await.expect("get"), None);
    }

    #[tokio::test]
    async fn malformed_file_starts_empty() {
        let path = temp_store_path("malformed");
        tokio::fs::create_dir_all(path.parent().expect("parent"))
            .await
            .expect("mkdir");
        tokio::fs::write(&path, b"{not json").await.expect("seed");

        let store = FileKeyValueStore::open(&path).await.expect("open");
        assert_eq!(store.get("anything").await.expect("get"), None);
    }

    #[test]
    fn in_memory_store_overwrites() {
        let store = InMemoryKeyValueStore::new();
        tokio_test::block_on(async {
            store.set("k", "1".to_string()).await.expect("set");
            store.set("k", "2".to_string()).await.expect("set");
            assert_eq!(store.get("k").await.expect("get"), Some("2".to_string()));
        });
    }

    #[test]
    fn user_keys_are_namespaced() {
        assert_eq!(user_key("abc", "quota/plan_tier"), "abc/quota/plan_tier");
    }
}
