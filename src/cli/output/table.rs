//! Table output formatting for CLI commands using comfy-table

use chrono::{TimeZone, Utc};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{CharacterItem, CharacterModel};

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label).add_attribute(Attribute::Bold))
        .collect()
}

/// Catalog models, one row each
pub fn format_models_table(models: &[CharacterModel]) -> String {
    let mut table = base_table();
    table.set_header(header(&["ID", "Name", "Skin", "Skeleton"]));

    for model in models {
        let skin = model
            .skin_name
            .as_deref()
            .map_or_else(|| Cell::new("-"), |name| Cell::new(name).fg(Color::Magenta));
        table.add_row(vec![
            Cell::new(&model.id),
            Cell::new(&model.name),
            skin,
            Cell::new(truncate_text(&model.skeleton, 48)),
        ]);
    }

    table.to_string()
}

/// Desired characters, one row each
pub fn format_characters_table(characters: &[CharacterItem]) -> String {
    let mut table = base_table();
    table.set_header(header(&["ID", "Model", "Name", "Added"]));

    for item in characters {
        let added = Utc
            .timestamp_millis_opt(item.id)
            .single()
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M:%S").to_string());
        table.add_row(vec![
            Cell::new(item.id).fg(Color::Cyan),
            Cell::new(&item.model.id),
            Cell::new(item.model.display_name()),
            Cell::new(added),
        ]);
    }

    table.to_string()
}

/// Truncate to `max_len` characters, marking the cut with an ellipsis
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
