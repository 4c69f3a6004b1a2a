//! Domain errors for the Arkpets system.

use thiserror::Error;

use super::models::CharacterId;

/// Domain-level errors that can occur in the Arkpets system.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Storage read or write failed; callers keep their prior in-memory state.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A single catalog fetch failed or was aborted.
    #[error("Network error: {0}")]
    Network(String),

    /// Every raced catalog source failed; the cached catalog stays authoritative.
    #[error("All catalog sources failed: {0}")]
    AllSourcesFailed(String),

    /// The rendering collaborator rejected a create/update/destroy.
    #[error("Instance lifecycle error for character {id}: {reason}")]
    InstanceLifecycle {
        /// Desired entry the instance belongs to
        id: CharacterId,
        /// Collaborator's error message
        reason: String,
    },

    /// A persisted value could not be decoded.
    #[error("Malformed value for '{key}': {reason}")]
    ConfigParse {
        /// Storage key holding the value
        key: String,
        /// Decoder error message
        reason: String,
    },

    /// No desired entry has this id.
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// No catalog model has this id.
    #[error("Model not found in catalog: {0}")]
    ModelNotFound(String),

    /// A refresh named a source that is not configured.
    #[error("Unknown catalog source: {0}")]
    UnknownSource(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DomainError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DomainError::Persistence(format!("migration failed: {err}"))
    }
}
