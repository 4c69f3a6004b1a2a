use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::CharacterModel;

/// Errors raised by the rendering collaborator
#[derive(Debug, Error)]
pub enum RendererError {
    /// The instance could not be created.
    #[error("Failed to create instance {stable_id}: {reason}")]
    CreateFailed {
        /// Identifier the instance would have had
        stable_id: String,
        /// Why the collaborator refused
        reason: String,
    },

    /// Swapping to a new model failed; the old one stays.
    #[error("Failed to load model {model_id}: {reason}")]
    ModelLoadFailed {
        /// Model that failed to load
        model_id: String,
        /// Why loading failed
        reason: String,
    },

    /// Tearing the instance down failed.
    #[error("Failed to destroy instance: {0}")]
    DestroyFailed(String),
}

/// Options applied when an instance is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceOptions {
    /// Whether the character reacts to pointer interaction
    pub allow_interaction: bool,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            allow_interaction: true,
        }
    }
}

/// Callbacks the renderer invokes on end-user interaction
///
/// Both identify the instance by the stable identifier it was created with.
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    /// The user picked a different model for this instance.
    async fn on_select_model(&self, stable_id: &str, model: CharacterModel);

    /// The user dismissed this instance.
    async fn on_hide(&self, stable_id: &str);
}

/// A running character object owned by the renderer
#[async_trait]
pub trait CharacterInstance: Send + Sync {
    /// Swap the model in place.
    async fn apply_model(&self, model: &CharacterModel) -> Result<(), RendererError>;

    /// Graceful exit animation; resolves when it has finished.
    async fn fade_out(&self);

    /// Release the instance.
    async fn destroy(&self) -> Result<(), RendererError>;

    /// Toggle pointer interaction.
    async fn set_interactive(&self, allow: bool);
}

/// The rendering collaborator's lifecycle contract
#[async_trait]
pub trait CharacterRenderer: Send + Sync {
    /// Create and show a character.
    ///
    /// # Arguments
    /// * `stable_id` - Identifier derived from the desired entry id
    /// * `model` - Model to render
    /// * `options` - Creation options
    /// * `handler` - Callbacks for menu actions on this instance
    async fn create(
        &self,
        stable_id: &str,
        model: &CharacterModel,
        options: InstanceOptions,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<Arc<dyn CharacterInstance>, RendererError>;
}
