use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::AppContext;
use crate::infrastructure::renderer::TracingRenderer;
use crate::services::{should_activate, Reconciler, StoreInteractionHandler};

/// Handle watch command
///
/// Runs the reconcile loop against the headless renderer for one page until
/// Ctrl-C. Characters stay off pages the website filter excludes.
pub async fn execute(ctx: &AppContext, host: &str, fade_ms: u64, json: bool) -> Result<()> {
    let policy = ctx
        .desired
        .website_filter_policy()
        .await
        .context("Failed to read website filter")?;
    if !should_activate(host, &policy) {
        if json {
            println!("{}", serde_json::json!({ "hostname": host, "active": false }));
        } else {
            println!("Characters are hidden on {host} ({} mode); nothing to do.", policy.mode);
        }
        return Ok(());
    }

    let loaded = ctx
        .refresher
        .load_catalog()
        .await
        .context("Failed to load catalog")?;
    info!(models = loaded.catalog.len(), "catalog loaded");

    let prefix = ctx.config.reconciler.instance_prefix.clone();
    let renderer = Arc::new(TracingRenderer::new(Duration::from_millis(fade_ms)));
    let interactions = Arc::new(StoreInteractionHandler::new(
        Arc::clone(&ctx.desired),
        prefix.clone(),
    ));
    let mut reconciler = Reconciler::new(renderer, interactions, prefix);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                signal.cancel();
            }
            Err(err) => warn!(error = %err, "failed to listen for Ctrl-C"),
        }
    });

    if !json {
        println!("Watching {host}. Press Ctrl-C to stop.");
    }
    reconciler
        .run(&ctx.desired, Arc::new(Notify::new()), shutdown)
        .await
        .context("Reconcile loop failed")?;

    if let Some(handle) = loaded.background_refresh {
        handle.abort();
    }

    Ok(())
}
