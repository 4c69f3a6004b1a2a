use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::models::Config;
use crate::domain::ports::KeyValueStore;
use crate::infrastructure::remote::HttpCatalogFetcher;
use crate::infrastructure::storage::{MemoryStore, SqliteStore};
use crate::services::{CatalogRefresher, DesiredStateStore};

/// Services wired for one CLI invocation.
pub struct AppContext {
    /// Validated configuration
    pub config: Config,
    /// Persisted state, file-backed unless `--ephemeral`
    pub store: Arc<dyn KeyValueStore>,
    /// Desired characters and preferences
    pub desired: Arc<DesiredStateStore>,
    /// Catalog cache and refresh
    pub refresher: Arc<CatalogRefresher>,
}

impl AppContext {
    /// Open the store and wire the services for `config`.
    pub async fn build(config: Config, ephemeral: bool) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = if ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(
                SqliteStore::open(&config.storage)
                    .await
                    .with_context(|| {
                        format!("Failed to open state store at {}", config.storage.path)
                    })?,
            )
        };

        let fetcher = Arc::new(HttpCatalogFetcher::new(&config.catalog)?);
        let refresher = Arc::new(CatalogRefresher::new(
            fetcher,
            Arc::clone(&store),
            config.catalog.sources.clone(),
            config.app_version.clone(),
        ));
        let desired = Arc::new(DesiredStateStore::new(Arc::clone(&store)));

        Ok(Self {
            config,
            store,
            desired,
            refresher,
        })
    }
}
