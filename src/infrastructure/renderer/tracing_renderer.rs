//! Headless renderer that only logs lifecycle calls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::domain::models::CharacterModel;
use crate::domain::ports::{
    CharacterInstance, CharacterRenderer, InstanceOptions, InteractionHandler, RendererError,
};

/// Headless renderer that reports every lifecycle call through tracing.
///
/// Lets the reconcile loop run without a display, e.g. under `arkpets watch`.
pub struct TracingRenderer {
    fade_duration: Duration,
    live: Arc<AtomicUsize>,
}

impl TracingRenderer {
    /// Renderer whose fade-out takes `fade_duration`.
    pub fn new(fade_duration: Duration) -> Self {
        Self {
            fade_duration,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Instances created and not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for TracingRenderer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[async_trait]
impl CharacterRenderer for TracingRenderer {
    async fn create(
        &self,
        stable_id: &str,
        model: &CharacterModel,
        options: InstanceOptions,
        _handler: Arc<dyn InteractionHandler>,
    ) -> Result<Arc<dyn CharacterInstance>, RendererError> {
        info!(
            stable_id,
            model_id = %model.id,
            name = %model.display_name(),
            allow_interaction = options.allow_interaction,
            "instance created"
        );
        self.live.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(TracingInstance {
            stable_id: stable_id.to_string(),
            model_id: Mutex::new(model.id.clone()),
            interactive: AtomicBool::new(options.allow_interaction),
            fade_duration: self.fade_duration,
            live: Arc::clone(&self.live),
        }))
    }
}

struct TracingInstance {
    stable_id: String,
    model_id: Mutex<String>,
    interactive: AtomicBool,
    fade_duration: Duration,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl CharacterInstance for TracingInstance {
    async fn apply_model(&self, model: &CharacterModel) -> Result<(), RendererError> {
        let mut current = self
            .model_id
            .lock()
            .map_err(|e| RendererError::ModelLoadFailed {
                model_id: model.id.clone(),
                reason: e.to_string(),
            })?;
        info!(stable_id = %self.stable_id, from = %current, to = %model.id, "model applied");
        current.clone_from(&model.id);
        Ok(())
    }

    async fn fade_out(&self) {
        info!(stable_id = %self.stable_id, "fading out");
        tokio::time::sleep(self.fade_duration).await;
    }

    async fn destroy(&self) -> Result<(), RendererError> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        info!(stable_id = %self.stable_id, "instance destroyed");
        Ok(())
    }

    async fn set_interactive(&self, allow: bool) {
        if self.interactive.swap(allow, Ordering::SeqCst) != allow {
            info!(stable_id = %self.stable_id, allow, "interaction toggled");
        }
    }
}
