//! In-process key-value store.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{diff_changes, KeyValueStore, Record, StorageChanges};

const CHANNEL_CAPACITY: usize = 64;

/// In-process key-value store.
///
/// Backs tests and `--ephemeral` runs. Writes hold the lock while the
/// notification is sent, so subscribers observe writes in commit order.
pub struct MemoryStore {
    record: RwLock<Record>,
    changes: broadcast::Sender<StorageChanges>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::with_record(Record::new())
    }

    /// Store pre-seeded with `record`. Seeding does not notify.
    pub fn with_record(record: Record) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            record: RwLock::new(record),
            changes,
        }
    }

    async fn apply(&self, updates: Vec<(String, Option<Value>)>) {
        let mut record = self.record.write().await;
        let changes = diff_changes(&record, updates.iter().cloned());
        for (key, value) in updates {
            match value {
                Some(value) => {
                    record.insert(key, value);
                }
                None => {
                    record.remove(&key);
                }
            }
        }
        if !changes.is_empty() {
            trace!(keys = ?changes.keys().collect::<Vec<_>>(), "memory store changed");
            // No receivers is fine
            let _ = self.changes.send(changes);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> DomainResult<Record> {
        let record = self.record.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| record.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect())
    }

    async fn get_all(&self) -> DomainResult<Record> {
        Ok(self.record.read().await.clone())
    }

    async fn set(&self, entries: Record) -> DomainResult<()> {
        self.apply(entries.into_iter().map(|(k, v)| (k, Some(v))).collect())
            .await;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> DomainResult<()> {
        self.apply(keys.iter().map(|k| ((*k).to_string(), None)).collect())
            .await;
        Ok(())
    }

    async fn clear(&self) -> DomainResult<()> {
        let keys: Vec<String> = self.record.read().await.keys().cloned().collect();
        self.apply(keys.into_iter().map(|k| (k, None)).collect()).await;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChanges> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_get_returns_only_present_keys() {
        let store = MemoryStore::with_record(record(&[("a", json!(1))]));
        let got = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(got, record(&[("a", json!(1))]));
    }

    #[tokio::test]
    async fn test_set_notifies_changed_keys_once() {
        let store = MemoryStore::with_record(record(&[("a", json!(1))]));
        let mut rx = store.subscribe();

        store
            .set(record(&[("a", json!(1)), ("b", json!("x"))]))
            .await
            .unwrap();

        let changes = rx.recv().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["b"].new_value, Some(json!("x")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unchanged_write_is_silent() {
        let store = MemoryStore::with_record(record(&[("a", json!(1))]));
        let mut rx = store.subscribe();

        store.set(record(&[("a", json!(1))])).await.unwrap();

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_clear_reports_removals() {
        let store = MemoryStore::with_record(record(&[("a", json!(1)), ("b", json!(2))]));
        let mut rx = store.subscribe();

        store.clear().await.unwrap();

        let changes = rx.recv().await.unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.values().all(|c| c.new_value.is_none()));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::with_record(record(&[("a", json!(1)), ("b", json!(2))]));
        store.remove(&["a"]).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), record(&[("b", json!(2))]));
    }
}
