use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::domain::errors::DomainResult;

/// A partial or full persisted record: key → JSON value.
pub type Record = Map<String, Value>;

/// Old and new value of one changed key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// Value before the write, `None` if the key was absent
    pub old_value: Option<Value>,

    /// Value after the write, `None` if the key was removed
    pub new_value: Option<Value>,
}

/// One change notification, keyed by the changed storage key.
pub type StorageChanges = BTreeMap<String, StorageChange>;

/// Persisted key-value store with change notifications
///
/// Writers read-modify-write a single key with the latest snapshot; there is
/// no cross-key locking. Each `set` lands as one write and produces at most
/// one notification, covering only keys whose value actually changed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the given keys. Absent keys are missing from the result.
    async fn get(&self, keys: &[&str]) -> DomainResult<Record>;

    /// Read every stored key.
    async fn get_all(&self) -> DomainResult<Record>;

    /// Write all entries of `entries` in one atomic write.
    async fn set(&self, entries: Record) -> DomainResult<()>;

    /// Remove the given keys.
    async fn remove(&self, keys: &[&str]) -> DomainResult<()>;

    /// Remove every key.
    async fn clear(&self) -> DomainResult<()>;

    /// Subscribe to change notifications for writes made after this call.
    fn subscribe(&self) -> broadcast::Receiver<StorageChanges>;
}

/// Compute the notification for writing `updates` over `previous`.
///
/// `None` in `updates` means the key is removed. Keys whose value is
/// unchanged are left out.
pub fn diff_changes(
    previous: &Record,
    updates: impl IntoIterator<Item = (String, Option<Value>)>,
) -> StorageChanges {
    let mut changes = StorageChanges::new();
    for (key, new_value) in updates {
        let old_value = previous.get(&key).cloned();
        if old_value != new_value {
            changes.insert(key, StorageChange { old_value, new_value });
        }
    }
    changes
}
