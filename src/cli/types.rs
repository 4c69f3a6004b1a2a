//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::models::{CharacterId, WebsiteFilterMode};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "arkpets")]
#[command(about = "Arkpets - desktop companion characters, reconciled from persisted state", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .arkpets/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep state in memory for this run only
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Character catalog commands
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Desired character list commands
    #[command(subcommand)]
    Characters(CharacterCommands),

    /// Website filter commands
    #[command(subcommand)]
    Filter(FilterCommands),

    /// Turn pointer interaction with characters on or off
    Interaction {
        /// `on` or `off`
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Reconcile characters for a page until interrupted
    Watch {
        /// Hostname of the page the characters would appear on
        #[arg(long)]
        host: String,

        /// Fade-out duration of the headless renderer, in milliseconds
        #[arg(long, default_value = "300")]
        fade_ms: u64,
    },
}

/// `catalog` subcommands.
#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List selectable models (embedded first)
    List {
        /// Fetch a fresh catalog before listing
        #[arg(short, long)]
        refresh: bool,
    },

    /// Fetch the catalog now
    Refresh {
        /// Fetch only from this source instead of racing all of them
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show when and from where the cached catalog was fetched
    Status,
}

/// `characters` subcommands.
#[derive(Subcommand)]
pub enum CharacterCommands {
    /// List desired characters
    List,

    /// Add a character
    Add {
        /// Model id from the catalog (defaults to the first embedded model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Remove a character
    Remove {
        /// Id of the character to remove
        id: CharacterId,
    },

    /// Bind a character to a different model
    SetModel {
        /// Id of the character to change
        id: CharacterId,
        /// Catalog id of the new model
        model_id: String,
    },

    /// Clear all state and start over with one default character
    Reset,
}

/// `filter` subcommands.
#[derive(Subcommand)]
pub enum FilterCommands {
    /// Show the filter mode and patterns
    Show,

    /// Set the filter mode
    Mode {
        /// New filter mode
        #[arg(value_enum)]
        mode: FilterModeArg,
    },

    /// Replace the domain patterns (one per argument)
    Patterns {
        /// Domain patterns, matched as suffixes
        patterns: Vec<String>,
    },

    /// Check whether characters would appear on a hostname
    Check {
        /// Hostname to test against the filter
        hostname: String,
    },
}

/// On/off argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    /// Enable
    On,
    /// Disable
    Off,
}

impl Toggle {
    /// Whether this is `on`.
    pub const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Website filter mode argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterModeArg {
    /// Show characters everywhere
    All,
    /// Hide on matching domains
    Blacklist,
    /// Show only on matching domains
    Whitelist,
}

impl From<FilterModeArg> for WebsiteFilterMode {
    fn from(arg: FilterModeArg) -> Self {
        match arg {
            FilterModeArg::All => Self::All,
            FilterModeArg::Blacklist => Self::Blacklist,
            FilterModeArg::Whitelist => Self::Whitelist,
        }
    }
}
