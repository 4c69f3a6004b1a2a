//! Catalog refresher: racing multi-source fetch with version-gated caching.
//!
//! The fetched subset of the catalog is cached under the `models*` keys of
//! the persisted record. A cache written by an older application version is
//! stale and refreshed in the background on load. Refreshes race every
//! configured source and keep the first one that succeeds; the losers are
//! cancelled through child cancellation tokens.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{keys, Catalog, CatalogMetadata, CatalogSourceConfig, CharacterModel};
use crate::domain::ports::{CatalogFetcher, KeyValueStore, Record};

use super::version::is_stale;

/// Result of [`CatalogRefresher::load_catalog`].
pub struct LoadedCatalog {
    /// Catalog available right now
    pub catalog: Catalog,

    /// Refresh started because the cache was absent or stale
    pub background_refresh: Option<JoinHandle<DomainResult<Catalog>>>,
}

/// Keeps the fetched catalog fresh from the configured sources.
pub struct CatalogRefresher {
    fetcher: Arc<dyn CatalogFetcher>,
    store: Arc<dyn KeyValueStore>,
    sources: Vec<CatalogSourceConfig>,
    app_version: String,
}

impl CatalogRefresher {
    /// Refresher racing `sources` and caching into `store`.
    ///
    /// `app_version` is the staleness key written with every refresh.
    pub fn new(
        fetcher: Arc<dyn CatalogFetcher>,
        store: Arc<dyn KeyValueStore>,
        sources: Vec<CatalogSourceConfig>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            store,
            sources,
            app_version: app_version.into(),
        }
    }

    /// Configured sources, in race order.
    pub fn sources(&self) -> &[CatalogSourceConfig] {
        &self.sources
    }

    /// Version that cached catalogs are compared against.
    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Read the cached catalog without triggering a refresh.
    pub async fn cached_catalog(&self) -> DomainResult<Catalog> {
        let (models, metadata) = self.read_cache().await?;
        Ok(Catalog::new(models.unwrap_or_default(), metadata))
    }

    /// Load the catalog, refreshing in the background when needed.
    ///
    /// When the cache is absent or stale the embedded-only catalog is
    /// returned together with whatever metadata is cached, and the refresh
    /// runs in the background. A current cache is returned as-is.
    pub async fn load_catalog(self: &Arc<Self>) -> DomainResult<LoadedCatalog> {
        let (models, metadata) = self.read_cache().await?;
        let needs_refresh =
            models.is_none() || is_stale(metadata.version.as_deref(), &self.app_version);

        let background_refresh = if needs_refresh {
            info!(
                cached_version = metadata.version.as_deref().unwrap_or("none"),
                app_version = %self.app_version,
                "catalog cache absent or stale, refreshing in background"
            );
            let this = Arc::clone(self);
            Some(tokio::spawn(async move {
                let result = this.refresh_catalog(None).await;
                if let Err(ref err) = result {
                    warn!(error = %err, "background catalog refresh failed");
                }
                result
            }))
        } else {
            None
        };

        let catalog = if needs_refresh {
            Catalog::embedded_only(metadata)
        } else {
            Catalog::new(models.unwrap_or_default(), metadata)
        };

        Ok(LoadedCatalog {
            catalog,
            background_refresh,
        })
    }

    /// Refresh from one named source, or race all sources when `None`.
    pub async fn refresh_catalog(&self, source: Option<&str>) -> DomainResult<Catalog> {
        self.refresh_catalog_with(source, CancellationToken::new()).await
    }

    /// Like [`Self::refresh_catalog`], aborting when `cancel` fires.
    #[instrument(skip(self, cancel), fields(app_version = %self.app_version))]
    pub async fn refresh_catalog_with(
        &self,
        source: Option<&str>,
        cancel: CancellationToken,
    ) -> DomainResult<Catalog> {
        let (source_id, models) = match source {
            Some(id) => {
                let source = self
                    .sources
                    .iter()
                    .find(|s| s.id == id)
                    .ok_or_else(|| DomainError::UnknownSource(id.to_string()))?;
                let models = self
                    .fetcher
                    .fetch(source, cancel)
                    .await
                    .map_err(|e| DomainError::Network(format!("{}: {e}", source.id)))?;
                (source.id.clone(), models)
            }
            None => self.race(cancel).await?,
        };

        self.persist(source_id, models).await
    }

    /// First-success-wins race across every configured source.
    async fn race(&self, cancel: CancellationToken) -> DomainResult<(String, Vec<CharacterModel>)> {
        if self.sources.is_empty() {
            return Err(DomainError::AllSourcesFailed(
                "no catalog sources configured".to_string(),
            ));
        }

        let race = cancel.child_token();
        let mut pending: FuturesUnordered<_> = self
            .sources
            .iter()
            .map(|source| {
                let token = race.child_token();
                async move { (source, self.fetcher.fetch(source, token).await) }
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((source, result)) = pending.next().await {
            match result {
                Ok(models) => {
                    // Losing branches observe the cancellation and are dropped below.
                    race.cancel();
                    info!(source = %source.id, count = models.len(), "catalog source won race");
                    return Ok((source.id.clone(), models));
                }
                Err(err) => {
                    warn!(source = %source.id, error = %err, "catalog source failed");
                    failures.push(format!("{}: {err}", source.id));
                }
            }
        }

        Err(DomainError::AllSourcesFailed(failures.join("; ")))
    }

    /// Persist a successful fetch as one storage write.
    async fn persist(&self, source_id: String, models: Vec<CharacterModel>) -> DomainResult<Catalog> {
        let metadata = CatalogMetadata {
            last_updated: Some(Utc::now().timestamp_millis()),
            version: Some(self.app_version.clone()),
            source: Some(source_id),
        };

        let mut record = Record::new();
        record.insert(
            keys::MODELS.to_string(),
            serde_json::to_value(&models).map_err(|e| DomainError::Persistence(e.to_string()))?,
        );
        record.insert(keys::MODELS_LAST_UPDATED.to_string(), json!(metadata.last_updated));
        record.insert(keys::MODELS_VERSION.to_string(), json!(metadata.version));
        record.insert(keys::MODELS_SOURCE.to_string(), json!(metadata.source));
        self.store.set(record).await?;

        debug!(count = models.len(), "persisted fetched catalog");
        Ok(Catalog::new(models, metadata))
    }

    async fn read_cache(&self) -> DomainResult<(Option<Vec<CharacterModel>>, CatalogMetadata)> {
        let record = self.store.get(&keys::CATALOG).await?;

        let models = record.get(keys::MODELS).and_then(|value| {
            serde_json::from_value::<Vec<CharacterModel>>(value.clone())
                .map_err(|e| warn!(error = %e, "cached catalog is malformed, treating as absent"))
                .ok()
        });

        let metadata = CatalogMetadata {
            last_updated: record.get(keys::MODELS_LAST_UPDATED).and_then(Value::as_i64),
            version: record
                .get(keys::MODELS_VERSION)
                .and_then(Value::as_str)
                .map(ToString::to_string),
            source: record
                .get(keys::MODELS_SOURCE)
                .and_then(Value::as_str)
                .map(ToString::to_string),
        };

        Ok((models, metadata))
    }
}
