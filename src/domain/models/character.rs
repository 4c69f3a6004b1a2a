//! Character models and desired-state entries.

use serde::{Deserialize, Serialize};

/// Resource path the bundled models are served from.
pub const EMBEDDED_RESOURCE_PATH: &str = "http://localhost:8000/assets/models";

/// Identifier of a desired-state entry.
///
/// Generated locally from the creation time in epoch milliseconds and only
/// meaningful for matching entries across reconciliation passes.
pub type CharacterId = i64;

/// A selectable character model from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterModel {
    /// Stable key, unique within a catalog
    pub id: String,

    /// Display name
    pub name: String,

    /// Skeleton file, relative to `resource_path`
    pub skeleton: String,

    /// Atlas file, relative to `resource_path`
    pub atlas: String,

    /// Texture file, relative to `resource_path`
    pub texture: String,

    /// Base URL the asset locators are relative to
    pub resource_path: String,

    /// Skin group id, present only for non-default skins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_id: Option<String>,

    /// Skin group display name, present only for non-default skins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_name: Option<String>,
}

impl CharacterModel {
    /// Whether this model is a tagged skin variant.
    pub const fn is_skin_variant(&self) -> bool {
        self.skin_id.is_some()
    }

    /// Name shown to users, including the skin name for variants.
    pub fn display_name(&self) -> String {
        match &self.skin_name {
            Some(skin) => format!("{} ({skin})", self.name),
            None => self.name.clone(),
        }
    }
}

/// A desired-state entry: one character that ought to be on screen.
///
/// The model is an embedded snapshot rather than a catalog reference, so
/// catalog churn never orphans an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterItem {
    /// Locally generated, unique within the desired list
    pub id: CharacterId,

    /// Model this entry renders
    pub model: CharacterModel,
}

impl CharacterItem {
    /// Entry `id` bound to `model`.
    pub const fn new(id: CharacterId, model: CharacterModel) -> Self {
        Self { id, model }
    }
}

fn embedded(id: &str, name: &str, dir: &str, file: &str) -> CharacterModel {
    CharacterModel {
        id: id.to_string(),
        name: name.to_string(),
        skeleton: format!("{dir}/{file}.skel"),
        atlas: format!("{dir}/{file}.atlas"),
        texture: format!("{dir}/{file}.png"),
        resource_path: EMBEDDED_RESOURCE_PATH.to_string(),
        skin_id: None,
        skin_name: None,
    }
}

/// Models bundled with the application. Always present, never expire.
pub fn embedded_models() -> Vec<CharacterModel> {
    vec![
        default_model(),
        embedded(
            "lappland_the_decadenza",
            "荒芜拉普兰德",
            "1038_whitw2",
            "build_char_1038_whitw2",
        ),
    ]
}

/// The first embedded model; new and reset entries are bound to it.
pub fn default_model() -> CharacterModel {
    embedded("pepe", "佩佩", "4058_pepe", "build_char_4058_pepe")
}
