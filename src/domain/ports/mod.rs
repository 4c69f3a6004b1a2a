//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - KeyValueStore: persisted settings record with change notifications
//! - CatalogFetcher: one remote catalog source
//! - CharacterRenderer: lifecycle of on-screen character instances
//!
//! These traits define the contracts that allow the services to be independent
//! of specific infrastructure implementations.

/// Remote catalog sources.
pub mod catalog_source;
/// Persisted key-value store with change notifications.
pub mod key_value_store;
/// Rendering collaborator and interaction callbacks.
pub mod renderer;

pub use catalog_source::{CatalogFetcher, FetchError};
pub use key_value_store::{diff_changes, KeyValueStore, Record, StorageChange, StorageChanges};
pub use renderer::{
    CharacterInstance, CharacterRenderer, InstanceOptions, InteractionHandler, RendererError,
};
