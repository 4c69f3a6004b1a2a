//! Persistence façade for the desired character list and preferences.
//!
//! Every read of an absent key writes the documented default back, so later
//! reads are deterministic. A malformed value is treated as absent.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    default_model, keys, CharacterId, CharacterItem, CharacterModel, WebsiteFilterMode,
    WebsiteFilterPolicy,
};
use crate::domain::ports::{KeyValueStore, Record, StorageChanges};

const DEFAULT_ALLOW_INTERACTION: bool = true;

/// Typed access to the persisted desired state and preferences.
pub struct DesiredStateStore {
    store: Arc<dyn KeyValueStore>,
}

impl DesiredStateStore {
    /// Wrap `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Subscribe to change notifications of the underlying store.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChanges> {
        self.store.subscribe()
    }

    /// Current desired list, initialized with one default entry when absent.
    pub async fn characters(&self) -> DomainResult<Vec<CharacterItem>> {
        self.read_or_init(keys::CHARACTERS, || vec![default_item(&[])])
            .await
    }

    /// Append an entry bound to `model`.
    pub async fn add_character(&self, model: CharacterModel) -> DomainResult<CharacterItem> {
        let mut characters = self.characters().await?;
        let item = CharacterItem::new(next_id(&characters), model);
        characters.push(item.clone());
        self.write(keys::CHARACTERS, &characters).await?;

        info!(character_id = item.id, model_id = %item.model.id, "character added");
        Ok(item)
    }

    /// Rebind an existing entry to `model`.
    pub async fn update_character(&self, id: CharacterId, model: CharacterModel) -> DomainResult<()> {
        let mut characters = self.characters().await?;
        let item = characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(DomainError::CharacterNotFound(id))?;

        if item.model == model {
            return Ok(());
        }
        debug!(character_id = id, from = %item.model.id, to = %model.id, "character model changed");
        item.model = model;
        self.write(keys::CHARACTERS, &characters).await
    }

    /// Remove an entry.
    pub async fn delete_character(&self, id: CharacterId) -> DomainResult<()> {
        let mut characters = self.characters().await?;
        let before = characters.len();
        characters.retain(|c| c.id != id);
        if characters.len() == before {
            return Err(DomainError::CharacterNotFound(id));
        }
        self.write(keys::CHARACTERS, &characters).await?;

        info!(character_id = id, "character deleted");
        Ok(())
    }

    /// Clear all persisted state and reinitialize defaults.
    ///
    /// The fresh default entry gets an id distinct from every previous one so
    /// it is treated as a new instance.
    pub async fn reset(&self) -> DomainResult<Vec<CharacterItem>> {
        let previous = self.characters().await?;
        self.store.clear().await?;

        let characters = vec![default_item(&previous)];
        let mut record = Record::new();
        record.insert(keys::CHARACTERS.to_string(), to_value(&characters)?);
        record.insert(keys::ALLOW_INTERACTION.to_string(), Value::Bool(DEFAULT_ALLOW_INTERACTION));
        record.insert(keys::WEBSITE_FILTER.to_string(), to_value(&WebsiteFilterMode::default())?);
        record.insert(keys::DOMAIN_LIST.to_string(), Value::String(String::new()));
        self.store.set(record).await?;

        info!("desired state reset to defaults");
        Ok(characters)
    }

    /// Whether characters react to the pointer. Defaults to `true`.
    pub async fn allow_interaction(&self) -> DomainResult<bool> {
        self.read_or_init(keys::ALLOW_INTERACTION, || DEFAULT_ALLOW_INTERACTION)
            .await
    }

    /// Persist the interaction preference.
    pub async fn set_allow_interaction(&self, allow: bool) -> DomainResult<()> {
        self.write(keys::ALLOW_INTERACTION, &allow).await
    }

    /// Filter mode. Unknown values read as `all`.
    pub async fn website_filter(&self) -> DomainResult<WebsiteFilterMode> {
        self.read_or_init(keys::WEBSITE_FILTER, WebsiteFilterMode::default)
            .await
    }

    /// Persist the filter mode.
    pub async fn set_website_filter(&self, mode: WebsiteFilterMode) -> DomainResult<()> {
        self.write(keys::WEBSITE_FILTER, &mode).await
    }

    /// Raw newline-delimited domain patterns.
    pub async fn domain_list(&self) -> DomainResult<String> {
        self.read_or_init(keys::DOMAIN_LIST, String::new).await
    }

    /// Persist the raw newline-separated pattern text.
    pub async fn set_domain_list(&self, raw: &str) -> DomainResult<()> {
        self.write(keys::DOMAIN_LIST, raw).await
    }

    /// Filter mode and parsed patterns.
    pub async fn website_filter_policy(&self) -> DomainResult<WebsiteFilterPolicy> {
        let mode = self.website_filter().await?;
        let raw = self.domain_list().await?;
        Ok(WebsiteFilterPolicy::from_raw(mode, &raw))
    }

    async fn read_or_init<T, F>(&self, key: &str, default: F) -> DomainResult<T>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce() -> T,
    {
        let record = self.store.get(&[key]).await?;
        if let Some(value) = record.get(key) {
            match decode::<T>(key, value) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => warn!(error = %err, "reinitializing malformed value"),
            }
        }

        let value = default();
        self.write(key, &value).await?;
        debug!(key, "wrote default value");
        Ok(value)
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DomainResult<()> {
        let mut record = Record::new();
        record.insert(key.to_string(), to_value(value)?);
        self.store.set(record).await
    }
}

/// Decode a persisted value, mapping failures to [`DomainError::ConfigParse`].
pub fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> DomainResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| DomainError::ConfigParse {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> DomainResult<Value> {
    serde_json::to_value(value).map_err(|e| DomainError::Persistence(e.to_string()))
}

/// Next entry id: the current time in milliseconds, bumped past every
/// existing id so ids stay unique and increasing.
pub fn next_id(existing: &[CharacterItem]) -> CharacterId {
    let now = Utc::now().timestamp_millis();
    existing
        .iter()
        .map(|c| c.id.saturating_add(1))
        .max()
        .map_or(now, |floor| floor.max(now))
}

fn default_item(existing: &[CharacterItem]) -> CharacterItem {
    CharacterItem::new(next_id(existing), default_model())
}
