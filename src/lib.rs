//! Arkpets - desktop companion characters driven by persisted state
//!
//! A persisted desired-state record (the character list plus preferences)
//! is reconciled against live character instances owned by a rendering
//! collaborator. A multi-source catalog refresher keeps the model catalog
//! cached and version-gated, and a domain matcher decides which pages
//! characters appear on.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, error taxonomy, port traits
//! - **Service Layer** (`services`): reconciler, catalog refresher,
//!   desired-state store, domain matcher, version gate
//! - **Infrastructure Layer** (`infrastructure`): config, logging, storage,
//!   remote catalog client, headless renderer
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use arkpets::infrastructure::storage::MemoryStore;
//! use arkpets::services::DesiredStateStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let desired = DesiredStateStore::new(Arc::new(MemoryStore::new()));
//!     let characters = desired.characters().await?;
//!     assert_eq!(characters.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
/// Business logic: matcher, version gate, catalog refresher, desired state and reconciler.
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Catalog, CatalogMetadata, CharacterId, CharacterItem, CharacterModel, Config,
    WebsiteFilterMode, WebsiteFilterPolicy,
};
pub use domain::ports::{
    CatalogFetcher, CharacterInstance, CharacterRenderer, InteractionHandler, KeyValueStore,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CatalogRefresher, DesiredStateStore, Reconciler};
