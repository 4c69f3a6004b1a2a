pub mod catalog;
pub mod character;
/// Application configuration tree.
pub mod config;
pub mod settings;

pub use catalog::{Catalog, CatalogMetadata};
pub use character::{
    default_model, embedded_models, CharacterId, CharacterItem, CharacterModel,
    EMBEDDED_RESOURCE_PATH,
};
pub use config::{
    CatalogConfig, CatalogSourceConfig, Config, LoggingConfig, ReconcilerConfig, StorageConfig,
};
pub use settings::{keys, parse_patterns, WebsiteFilterMode, WebsiteFilterPolicy};
