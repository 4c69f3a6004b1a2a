//! Upstream catalog document and model extraction.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::models::{CatalogSourceConfig, CharacterModel};

/// Skin group id the catalog uses for a character's default appearance.
pub const DEFAULT_SKIN_GROUP: &str = "ILLUST_0";

/// Top-level catalog document (`models_data.json`).
///
/// Only the fields extraction needs are modelled; the rest are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsData {
    /// Entry type → directory holding that type's assets
    #[serde(default)]
    pub storage_directory: HashMap<String, String>,

    /// Entry key → raw entry
    pub data: HashMap<String, ModelEntry>,
}

/// One raw catalog entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Entry type; only the configured character type is kept
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name
    pub name: String,
    /// Skin group, `ILLUST_0` for the default appearance
    #[serde(default)]
    pub skin_group_id: Option<String>,
    /// Display name of the skin group
    #[serde(default)]
    pub skin_group_name: Option<String>,
    /// Asset file names
    pub asset_list: AssetList,
}

/// The three files a model is rendered from.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetList {
    /// Spine skeleton
    #[serde(rename = ".skel")]
    pub skeleton: String,
    /// Texture atlas
    #[serde(rename = ".atlas")]
    pub atlas: String,
    /// Texture image
    #[serde(rename = ".png")]
    pub texture: String,
}

/// Map the entries of `character_type` to catalog models, sorted by id.
///
/// Locators are `<dir>/<key>/<asset>` where `dir` is the storage directory
/// registered for `character_directory`; when none is registered the
/// directory name itself is used.
pub fn extract_models(
    document: &ModelsData,
    source: &CatalogSourceConfig,
    character_type: &str,
    character_directory: &str,
) -> Vec<CharacterModel> {
    let directory = document
        .storage_directory
        .get(character_directory)
        .map_or(character_directory, String::as_str)
        .trim_end_matches('/');

    let mut models: Vec<CharacterModel> = document
        .data
        .iter()
        .filter(|(_, entry)| entry.kind == character_type)
        .map(|(key, entry)| {
            let skin = entry
                .skin_group_id
                .as_deref()
                .filter(|group| !group.is_empty() && *group != DEFAULT_SKIN_GROUP);
            CharacterModel {
                id: key.clone(),
                name: entry.name.clone(),
                skeleton: format!("{directory}/{key}/{}", entry.asset_list.skeleton),
                atlas: format!("{directory}/{key}/{}", entry.asset_list.atlas),
                texture: format!("{directory}/{key}/{}", entry.asset_list.texture),
                resource_path: source.base_url.clone(),
                skin_id: skin.map(str::to_string),
                skin_name: skin.and(entry.skin_group_name.clone()),
            }
        })
        .collect();

    models.sort_by(|a, b| a.id.cmp(&b.id));
    models
}
