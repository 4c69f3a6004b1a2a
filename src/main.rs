//! Arkpets CLI entry point.

use clap::Parser;

use arkpets::cli::{commands, handle_error, AppContext, Cli, Commands};
use arkpets::infrastructure::config::ConfigLoader;
use arkpets::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json),
    };

    let ctx = match AppContext::build(config, cli.ephemeral).await {
        Ok(ctx) => ctx,
        Err(err) => handle_error(err, json),
    };

    let result = match cli.command {
        Commands::Catalog(command) => commands::catalog::execute(&ctx, command, json).await,
        Commands::Characters(command) => commands::characters::execute(&ctx, command, json).await,
        Commands::Filter(command) => commands::filter::execute(&ctx, command, json).await,
        Commands::Interaction { state } => commands::interaction::execute(&ctx, state, json).await,
        Commands::Watch { host, fade_ms } => {
            commands::watch::execute(&ctx, &host, fade_ms, json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, json);
    }
}
