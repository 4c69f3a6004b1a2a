use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::models::{CatalogSourceConfig, CharacterModel};

/// Errors from fetching one catalog source
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Connection or transfer failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The document could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request exceeded its timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// The request was cancelled before it completed
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether the fetch was aborted rather than failed.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Fetches and extracts the character models of one remote source
///
/// Implementations must observe `cancel` and return [`FetchError::Cancelled`]
/// promptly once it fires.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Fetch `source` and extract its character models.
    async fn fetch(
        &self,
        source: &CatalogSourceConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<CharacterModel>, FetchError>;
}
