//! HTTP implementation of the catalog fetcher port.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::models_data::{extract_models, ModelsData};
use crate::domain::models::{CatalogConfig, CatalogSourceConfig, CharacterModel};
use crate::domain::ports::{CatalogFetcher, FetchError};

/// HTTP fetcher for upstream catalog documents
///
/// One reusable reqwest client; each request carries the configured
/// timeout and is abandoned as soon as its cancellation token fires.
pub struct HttpCatalogFetcher {
    http_client: ReqwestClient,
    timeout_secs: u64,
    character_type: String,
    character_directory: String,
}

impl HttpCatalogFetcher {
    /// Build a fetcher from the catalog section of the configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("arkpets/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            timeout_secs: config.request_timeout_secs,
            character_type: config.character_type.clone(),
            character_directory: config.character_directory.clone(),
        })
    }

    async fn fetch_document(&self, source: &CatalogSourceConfig) -> Result<ModelsData, FetchError> {
        let response = self
            .http_client
            .get(&source.index_url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: source.index_url.clone(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    #[instrument(skip(self, source, cancel), fields(source = %source.id))]
    async fn fetch(
        &self,
        source: &CatalogSourceConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<CharacterModel>, FetchError> {
        debug!(url = %source.index_url, "fetching catalog document");

        let document = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = self.fetch_document(source) => result,
        };

        let document = document.inspect_err(|e| {
            warn!(error = %e, "catalog fetch failed");
        })?;

        let models = extract_models(
            &document,
            source,
            &self.character_type,
            &self.character_directory,
        );
        debug!(count = models.len(), "catalog document extracted");
        Ok(models)
    }
}
