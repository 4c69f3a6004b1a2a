use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::types::{FilterCommands, FilterModeArg};
use crate::cli::AppContext;
use crate::domain::models::WebsiteFilterMode;
use crate::services::should_activate;

/// Handle `filter` commands.
pub async fn execute(ctx: &AppContext, command: FilterCommands, json: bool) -> Result<()> {
    match command {
        FilterCommands::Show => handle_show(ctx, json).await,
        FilterCommands::Mode { mode } => handle_mode(ctx, mode, json).await,
        FilterCommands::Patterns { patterns } => handle_patterns(ctx, &patterns, json).await,
        FilterCommands::Check { hostname } => handle_check(ctx, &hostname, json).await,
    }
}

/// Handle filter show command
pub async fn handle_show(ctx: &AppContext, json: bool) -> Result<()> {
    let policy = ctx
        .desired
        .website_filter_policy()
        .await
        .context("Failed to read website filter")?;

    if json {
        let output = json!({ "mode": policy.mode, "patterns": policy.patterns });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Mode: {}", policy.mode);
        if policy.patterns.is_empty() {
            println!("No patterns.");
        } else {
            println!("Patterns:");
            for pattern in &policy.patterns {
                println!("  {pattern}");
            }
        }
    }

    Ok(())
}

/// Handle filter mode command
pub async fn handle_mode(ctx: &AppContext, mode: FilterModeArg, json: bool) -> Result<()> {
    let mode = WebsiteFilterMode::from(mode);
    ctx.desired
        .set_website_filter(mode)
        .await
        .context("Failed to set website filter")?;

    if json {
        println!("{}", json!({ "mode": mode }));
    } else {
        println!("Website filter set to {mode}");
    }

    Ok(())
}

/// Handle filter patterns command
///
/// Patterns are stored as the raw newline-delimited list.
pub async fn handle_patterns(ctx: &AppContext, patterns: &[String], json: bool) -> Result<()> {
    let raw = patterns.join("\n");
    ctx.desired
        .set_domain_list(&raw)
        .await
        .context("Failed to set domain list")?;
    let policy = ctx.desired.website_filter_policy().await?;

    if json {
        println!("{}", json!({ "patterns": policy.patterns }));
    } else {
        println!("Stored {} pattern(s)", policy.patterns.len());
    }

    Ok(())
}

/// Handle filter check command
pub async fn handle_check(ctx: &AppContext, hostname: &str, json: bool) -> Result<()> {
    let policy = ctx
        .desired
        .website_filter_policy()
        .await
        .context("Failed to read website filter")?;
    let active = should_activate(hostname, &policy);

    if json {
        println!(
            "{}",
            json!({ "hostname": hostname, "mode": policy.mode, "active": active })
        );
    } else if active {
        println!("Characters appear on {hostname} ({} mode)", policy.mode);
    } else {
        println!("Characters are hidden on {hostname} ({} mode)", policy.mode);
    }

    Ok(())
}
