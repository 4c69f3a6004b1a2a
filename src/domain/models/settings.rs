//! Persisted settings: storage keys, website filter policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys of the persisted record.
pub mod keys {
    /// Desired character entries
    pub const CHARACTERS: &str = "characters";
    /// Whether rendered characters react to the user
    pub const ALLOW_INTERACTION: &str = "allowInteraction";
    /// Website filter mode
    pub const WEBSITE_FILTER: &str = "websiteFilter";
    /// Newline-delimited domain patterns
    pub const DOMAIN_LIST: &str = "domainList";
    /// Fetched catalog models
    pub const MODELS: &str = "models";
    /// Epoch milliseconds of the last successful catalog fetch
    pub const MODELS_LAST_UPDATED: &str = "modelsLastUpdated";
    /// Application version at the last successful catalog fetch
    pub const MODELS_VERSION: &str = "modelsVersion";
    /// Source of the cached catalog
    pub const MODELS_SOURCE: &str = "modelsSource";

    /// Keys written by catalog refreshes.
    pub const CATALOG: [&str; 4] = [MODELS, MODELS_LAST_UPDATED, MODELS_VERSION, MODELS_SOURCE];
}

/// How the domain list gates activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebsiteFilterMode {
    /// Active everywhere
    #[default]
    All,
    /// Active everywhere except matching domains
    Blacklist,
    /// Active only on matching domains
    Whitelist,
}

impl WebsiteFilterMode {
    /// Persisted spelling of the mode.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
        }
    }
}

impl fmt::Display for WebsiteFilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebsiteFilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "blacklist" => Ok(Self::Blacklist),
            "whitelist" => Ok(Self::Whitelist),
            other => Err(format!(
                "Invalid website filter: {other}. Must be one of: all, blacklist, whitelist"
            )),
        }
    }
}

/// Website filter policy: a mode plus parsed domain patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteFilterPolicy {
    /// How `patterns` gate activation
    pub mode: WebsiteFilterMode,
    /// Normalized domain patterns
    pub patterns: Vec<String>,
}

impl WebsiteFilterPolicy {
    /// Policy from already-normalized patterns.
    pub fn new(mode: WebsiteFilterMode, patterns: Vec<String>) -> Self {
        Self { mode, patterns }
    }

    /// Build a policy from the raw newline-delimited domain list.
    pub fn from_raw(mode: WebsiteFilterMode, domain_list: &str) -> Self {
        Self::new(mode, parse_patterns(domain_list))
    }
}

/// Split the raw domain list into normalized patterns.
///
/// Lines are trimmed and lowercased; blank lines are dropped.
pub fn parse_patterns(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim().to_ascii_lowercase())
        .filter(|line| !line.is_empty())
        .collect()
}
