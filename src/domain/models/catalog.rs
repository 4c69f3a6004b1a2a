//! Catalog of selectable character models.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::character::{embedded_models, CharacterModel};

/// Metadata about the cached fetched catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    /// Epoch milliseconds of the last successful fetch
    pub last_updated: Option<i64>,

    /// Application version at the time of the last successful fetch
    pub version: Option<String>,

    /// Source that produced the cached catalog
    pub source: Option<String>,
}

impl CatalogMetadata {
    /// Whether a catalog was ever fetched.
    pub const fn is_never_updated(&self) -> bool {
        self.last_updated.is_none()
    }

    /// Last successful fetch as a UTC timestamp.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// The combined catalog: embedded models first, then the fetched subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Fetched models, replaced wholesale on each successful refresh
    pub fetched: Vec<CharacterModel>,

    /// Metadata describing `fetched`
    pub metadata: CatalogMetadata,
}

impl Catalog {
    /// Catalog with `fetched` after the embedded models.
    pub const fn new(fetched: Vec<CharacterModel>, metadata: CatalogMetadata) -> Self {
        Self { fetched, metadata }
    }

    /// Catalog with no fetched models.
    pub fn embedded_only(metadata: CatalogMetadata) -> Self {
        Self::new(Vec::new(), metadata)
    }

    /// Visible catalog: embedded ++ fetched.
    pub fn models(&self) -> Vec<CharacterModel> {
        let mut models = embedded_models();
        models.extend(self.fetched.iter().cloned());
        models
    }

    /// Look a model up by id. Embedded entries win ties.
    pub fn find(&self, id: &str) -> Option<CharacterModel> {
        self.models().into_iter().find(|m| m.id == id)
    }

    /// The model new entries default to.
    pub fn default_model(&self) -> CharacterModel {
        super::character::default_model()
    }

    /// Number of visible models.
    pub fn len(&self) -> usize {
        embedded_models().len() + self.fetched.len()
    }

    /// Always false while embedded models exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
