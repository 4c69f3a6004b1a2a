use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::output::format_characters_table;
use crate::cli::types::CharacterCommands;
use crate::cli::AppContext;
use crate::domain::models::{CharacterId, CharacterModel};
use crate::domain::DomainError;

/// Handle `characters` commands.
pub async fn execute(ctx: &AppContext, command: CharacterCommands, json: bool) -> Result<()> {
    match command {
        CharacterCommands::List => handle_list(ctx, json).await,
        CharacterCommands::Add { model } => handle_add(ctx, model.as_deref(), json).await,
        CharacterCommands::Remove { id } => handle_remove(ctx, id, json).await,
        CharacterCommands::SetModel { id, model_id } => {
            handle_set_model(ctx, id, &model_id, json).await
        }
        CharacterCommands::Reset => handle_reset(ctx, json).await,
    }
}

/// Handle characters list command
pub async fn handle_list(ctx: &AppContext, json: bool) -> Result<()> {
    let characters = ctx
        .desired
        .characters()
        .await
        .context("Failed to read characters")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&characters)?);
    } else if characters.is_empty() {
        println!("No characters.");
    } else {
        println!("{}", format_characters_table(&characters));
    }

    Ok(())
}

/// Handle characters add command
pub async fn handle_add(ctx: &AppContext, model_id: Option<&str>, json: bool) -> Result<()> {
    let model = match model_id {
        Some(id) => resolve_model(ctx, id).await?,
        None => ctx.refresher.cached_catalog().await?.default_model(),
    };
    let item = ctx
        .desired
        .add_character(model)
        .await
        .context("Failed to add character")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Added character {} ({})", item.id, item.model.display_name());
    }

    Ok(())
}

/// Handle characters remove command
pub async fn handle_remove(ctx: &AppContext, id: CharacterId, json: bool) -> Result<()> {
    ctx.desired
        .delete_character(id)
        .await
        .with_context(|| format!("Failed to remove character {id}"))?;

    if json {
        println!("{}", json!({ "removed": id }));
    } else {
        println!("Removed character {id}");
    }

    Ok(())
}

/// Handle characters set-model command
pub async fn handle_set_model(
    ctx: &AppContext,
    id: CharacterId,
    model_id: &str,
    json: bool,
) -> Result<()> {
    let model = resolve_model(ctx, model_id).await?;
    let name = model.display_name();
    ctx.desired
        .update_character(id, model)
        .await
        .with_context(|| format!("Failed to update character {id}"))?;

    if json {
        println!("{}", json!({ "id": id, "model": model_id }));
    } else {
        println!("Character {id} now shows {name}");
    }

    Ok(())
}

/// Handle characters reset command
pub async fn handle_reset(ctx: &AppContext, json: bool) -> Result<()> {
    let characters = ctx.desired.reset().await.context("Failed to reset state")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&characters)?);
    } else {
        println!("State reset. {} default character restored.", characters.len());
    }

    Ok(())
}

async fn resolve_model(ctx: &AppContext, model_id: &str) -> Result<CharacterModel> {
    let catalog = ctx
        .refresher
        .cached_catalog()
        .await
        .context("Failed to read cached catalog")?;
    catalog
        .find(model_id)
        .ok_or_else(|| DomainError::ModelNotFound(model_id.to_string()).into())
}
