//! Domain layer for Arkpets
//!
//! This module contains the models, the error taxonomy and the port traits
//! the services depend on.

pub mod errors;
/// Catalog, character, settings and configuration types.
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
