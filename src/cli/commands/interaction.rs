use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::types::Toggle;
use crate::cli::AppContext;

/// Handle interaction command
pub async fn execute(ctx: &AppContext, state: Toggle, json: bool) -> Result<()> {
    let allow = state.enabled();
    ctx.desired
        .set_allow_interaction(allow)
        .await
        .context("Failed to store interaction preference")?;

    if json {
        println!("{}", json!({ "allowInteraction": allow }));
    } else {
        println!(
            "Interaction {}",
            if allow { "enabled" } else { "disabled" }
        );
    }

    Ok(())
}
