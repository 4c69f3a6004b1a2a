//! Command-line interface
//!
//! clap definitions, one handler module per command group, and the
//! table/spinner output helpers.

pub mod commands;
/// Service wiring shared by every command.
pub mod context;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{CatalogCommands, CharacterCommands, Cli, Commands, FilterCommands};

/// Report a command failure and exit with status 1
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let output = serde_json::json!({ "error": format!("{err:#}") });
        println!("{output}");
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(1)
}
