use anyhow::{Context, Result};
use serde_json::json;
use tracing::warn;

use crate::cli::output::{create_spinner, format_models_table};
use crate::cli::types::CatalogCommands;
use crate::cli::AppContext;
use crate::domain::models::Catalog;
use crate::services::is_stale;

/// Handle `catalog` commands.
pub async fn execute(ctx: &AppContext, command: CatalogCommands, json: bool) -> Result<()> {
    match command {
        CatalogCommands::List { refresh } => handle_list(ctx, refresh, json).await,
        CatalogCommands::Refresh { source } => handle_refresh(ctx, source.as_deref(), json).await,
        CatalogCommands::Status => handle_status(ctx, json).await,
    }
}

/// Handle catalog list command
///
/// A background refresh started by the load is awaited, since the process
/// would otherwise exit before it lands. If it fails the cached catalog is
/// listed.
pub async fn handle_list(ctx: &AppContext, refresh: bool, json: bool) -> Result<()> {
    let catalog = if refresh {
        refresh_with_spinner(ctx, None, json).await?
    } else {
        let loaded = ctx
            .refresher
            .load_catalog()
            .await
            .context("Failed to load catalog")?;
        match loaded.background_refresh {
            Some(handle) => {
                let spinner = create_spinner("Refreshing catalog...", json);
                let refreshed = handle.await.context("Catalog refresh task panicked")?;
                spinner.finish_and_clear();
                match refreshed {
                    Ok(catalog) => catalog,
                    Err(err) => {
                        warn!(error = %err, "catalog refresh failed, listing cached catalog");
                        ctx.refresher
                            .cached_catalog()
                            .await
                            .context("Failed to read cached catalog")?
                    }
                }
            }
            None => loaded.catalog,
        }
    };

    let models = catalog.models();
    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        println!("{}", format_models_table(&models));
        println!(
            "\n{} models ({} fetched)",
            models.len(),
            catalog.fetched.len()
        );
    }

    Ok(())
}

/// Handle catalog refresh command
pub async fn handle_refresh(ctx: &AppContext, source: Option<&str>, json: bool) -> Result<()> {
    let catalog = refresh_with_spinner(ctx, source, json).await?;

    if json {
        let output = json!({
            "fetched": catalog.fetched.len(),
            "source": catalog.metadata.source,
            "version": catalog.metadata.version,
            "lastUpdated": catalog.metadata.last_updated,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Fetched {} models from {}",
            catalog.fetched.len(),
            catalog.metadata.source.as_deref().unwrap_or("unknown source")
        );
    }

    Ok(())
}

/// Handle catalog status command
pub async fn handle_status(ctx: &AppContext, json: bool) -> Result<()> {
    let catalog = ctx
        .refresher
        .cached_catalog()
        .await
        .context("Failed to read cached catalog")?;
    let metadata = &catalog.metadata;
    let stale = is_stale(metadata.version.as_deref(), ctx.refresher.app_version());

    if json {
        let output = json!({
            "fetched": catalog.fetched.len(),
            "lastUpdated": metadata.last_updated,
            "version": metadata.version,
            "source": metadata.source,
            "appVersion": ctx.refresher.app_version(),
            "stale": stale,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if metadata.is_never_updated() {
        println!("Catalog has never been fetched; only embedded models are available.");
        return Ok(());
    }

    println!("Fetched models: {}", catalog.fetched.len());
    if let Some(at) = metadata.last_updated_at() {
        println!("Last updated:   {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Source:         {}", metadata.source.as_deref().unwrap_or("-"));
    println!("Version:        {}", metadata.version.as_deref().unwrap_or("-"));
    if stale {
        println!(
            "Cache is stale for version {}; it will refresh on next load.",
            ctx.refresher.app_version()
        );
    }

    Ok(())
}

async fn refresh_with_spinner(ctx: &AppContext, source: Option<&str>, json: bool) -> Result<Catalog> {
    let spinner = create_spinner(
        match source {
            Some(id) => format!("Fetching catalog from {id}..."),
            None => "Fetching catalog...".to_string(),
        },
        json,
    );
    let result = ctx.refresher.refresh_catalog(source).await;
    spinner.finish_and_clear();
    result.context("Failed to refresh catalog")
}
