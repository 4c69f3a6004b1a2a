//! Remote catalog client
//!
//! - `HttpCatalogFetcher`: reqwest-based `CatalogFetcher`
//! - `models_data`: upstream document types and model extraction

pub mod client;
pub mod models_data;

pub use client::HttpCatalogFetcher;
pub use models_data::{extract_models, ModelsData, DEFAULT_SKIN_GROUP};
