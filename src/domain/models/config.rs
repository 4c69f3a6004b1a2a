use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure for Arkpets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Running application version, the staleness key for cached catalogs
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Persistent store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote catalog configuration
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Reconciler configuration
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_version: default_app_version(),
            storage: StorageConfig::default(),
            catalog: CatalogConfig::default(),
            reconciler: ReconcilerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Persistent key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Path to `SQLite` database file, or `:memory:`
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How often to check the database for writes made by other processes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_storage_path() -> String {
    ".arkpets/state.db".to_string()
}

const fn default_max_connections() -> u32 {
    4
}

const fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_connections: default_max_connections(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl StorageConfig {
    /// Interval between checks for external writes.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `SQLite` connection URL for the configured path.
    pub fn database_url(&self) -> String {
        if self.path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// One upstream catalog source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogSourceConfig {
    /// Identifier persisted as `modelsSource`
    pub id: String,

    /// URL of the catalog document
    pub index_url: String,

    /// Base URL model assets are resolved against
    pub base_url: String,
}

impl CatalogSourceConfig {
    /// Source with the given id and URLs.
    pub fn new(id: impl Into<String>, index_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index_url: index_url.into(),
            base_url: base_url.into(),
        }
    }
}

/// Remote catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogConfig {
    /// Sources raced when no source is named
    #[serde(default = "default_sources")]
    pub sources: Vec<CatalogSourceConfig>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Entry type kept from catalog documents
    #[serde(default = "default_character_type")]
    pub character_type: String,

    /// Key of the storage directory holding character assets
    #[serde(default = "default_character_type")]
    pub character_directory: String,
}

fn default_sources() -> Vec<CatalogSourceConfig> {
    vec![
        CatalogSourceConfig::new(
            "github",
            "https://raw.githubusercontent.com/isHarryh/Ark-Models/refs/heads/main/models_data.json",
            "https://raw.githubusercontent.com/isHarryh/Ark-Models/refs/heads/main/",
        ),
        CatalogSourceConfig::new(
            "jsdelivr",
            "https://cdn.jsdelivr.net/gh/isHarryh/Ark-Models@main/models_data.json",
            "https://cdn.jsdelivr.net/gh/isHarryh/Ark-Models@main/",
        ),
    ]
}

const fn default_request_timeout_secs() -> u64 {
    30
}

fn default_character_type() -> String {
    "Operator".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            request_timeout_secs: default_request_timeout_secs(),
            character_type: default_character_type(),
            character_directory: default_character_type(),
        }
    }
}

impl CatalogConfig {
    /// Look a source up by id.
    pub fn source(&self, id: &str) -> Option<&CatalogSourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReconcilerConfig {
    /// Prefix of the stable per-entry identifier handed to the renderer
    #[serde(default = "default_instance_prefix")]
    pub instance_prefix: String,
}

fn default_instance_prefix() -> String {
    "arkpets-character-".to_string()
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            instance_prefix: default_instance_prefix(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
