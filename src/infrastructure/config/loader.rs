use std::collections::HashSet;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::services::version::is_valid_version;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `app_version` is not a dotted triplet
    #[error("Invalid app_version: {0}. Must be a dotted triplet like 1.2.3")]
    InvalidAppVersion(String),

    /// Empty `storage.path`
    #[error("Storage path cannot be empty")]
    EmptyStoragePath,

    /// `storage.max_connections` is zero
    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    /// `storage.poll_interval_ms` is zero
    #[error("Invalid poll_interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    /// `catalog.sources` is empty
    #[error("At least one catalog source must be configured")]
    NoCatalogSources,

    /// Two sources share an id
    #[error("Duplicate catalog source id: {0}")]
    DuplicateSource(String),

    /// A source URL is not http(s)
    #[error("Invalid URL for catalog source '{source_id}': {url}")]
    InvalidSourceUrl {
        /// Offending source
        source_id: String,
        /// The URL that failed to parse as http(s)
        url: String,
    },

    /// `catalog.request_timeout_secs` is zero
    #[error("Invalid request_timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    /// Empty `reconciler.instance_prefix`
    #[error("Instance prefix cannot be empty")]
    EmptyInstancePrefix,

    /// Unknown `logging.level`
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown `logging.rotation`
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    /// Any other invalid setting
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .arkpets/config.yaml (project config)
    /// 3. .arkpets/local.yaml (local overrides, optional)
    /// 4. Environment variables (ARKPETS_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".arkpets/config.yaml"))
            .merge(Yaml::file(".arkpets/local.yaml"))
            .merge(Env::prefixed("ARKPETS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("ARKPETS_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if !is_valid_version(&config.app_version) {
            return Err(ConfigError::InvalidAppVersion(config.app_version.clone()));
        }

        // Storage
        if config.storage.path.trim().is_empty() {
            return Err(ConfigError::EmptyStoragePath);
        }
        if config.storage.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.storage.max_connections,
            ));
        }
        if config.storage.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(0));
        }

        // Catalog sources
        if config.catalog.sources.is_empty() {
            return Err(ConfigError::NoCatalogSources);
        }
        let mut ids = HashSet::new();
        for source in &config.catalog.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "catalog source id cannot be empty".to_string(),
                ));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(ConfigError::DuplicateSource(source.id.clone()));
            }
            for url in [&source.index_url, &source.base_url] {
                if !is_http_url(url) {
                    return Err(ConfigError::InvalidSourceUrl {
                        source_id: source.id.clone(),
                        url: url.clone(),
                    });
                }
            }
        }
        if config.catalog.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                config.catalog.request_timeout_secs,
            ));
        }
        if config.catalog.character_type.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "catalog character_type cannot be empty".to_string(),
            ));
        }

        if config.reconciler.instance_prefix.is_empty() {
            return Err(ConfigError::EmptyInstancePrefix);
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}
