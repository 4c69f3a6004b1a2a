//! Common test utilities for integration tests
//!
//! Provides a recording renderer, a scripted catalog fetcher and small
//! fixtures shared across the integration test files.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arkpets::domain::models::{CatalogSourceConfig, CharacterItem, CharacterModel};
use arkpets::domain::ports::{
    CatalogFetcher, CharacterInstance, CharacterRenderer, FetchError, InstanceOptions,
    InteractionHandler, RendererError,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub const PREFIX: &str = "arkpets-character-";

/// Build a catalog model with predictable asset paths
pub fn model(id: &str) -> CharacterModel {
    CharacterModel {
        id: id.to_string(),
        name: format!("Model {id}"),
        skeleton: format!("models/{id}/{id}.skel"),
        atlas: format!("models/{id}/{id}.atlas"),
        texture: format!("models/{id}/{id}.png"),
        resource_path: "https://example.com/".to_string(),
        skin_id: None,
        skin_name: None,
    }
}

pub fn item(id: i64, model_id: &str) -> CharacterItem {
    CharacterItem::new(id, model(model_id))
}

pub fn stable(id: i64) -> String {
    format!("{PREFIX}{id}")
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 10ms until it returns true or timeout is reached.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}

/// One lifecycle call observed by [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { stable_id: String, model_id: String },
    Apply { stable_id: String, model_id: String },
    FadeOut { stable_id: String },
    Destroy { stable_id: String },
    SetInteractive { stable_id: String, allow: bool },
}

#[derive(Default)]
struct RendererState {
    calls: Vec<Call>,
    fail_create: HashSet<String>,
    fail_apply: HashSet<String>,
    handlers: HashMap<String, Arc<dyn InteractionHandler>>,
    options: HashMap<String, InstanceOptions>,
}

/// Renderer fake that records every call and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    state: Arc<Mutex<RendererState>>,
    fade_delay: Duration,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fade_delay(fade_delay: Duration) -> Self {
        Self {
            fade_delay,
            ..Self::default()
        }
    }

    /// Creates of `model_id` fail until [`Self::allow_create`] is called
    pub fn fail_create(&self, model_id: &str) {
        self.state.lock().unwrap().fail_create.insert(model_id.to_string());
    }

    pub fn allow_create(&self, model_id: &str) {
        self.state.lock().unwrap().fail_create.remove(model_id);
    }

    /// Swapping to `model_id` fails
    pub fn fail_apply(&self, model_id: &str) {
        self.state.lock().unwrap().fail_apply.insert(model_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create { .. }))
    }

    pub fn destroys(&self) -> usize {
        self.count(|c| matches!(c, Call::Destroy { .. }))
    }

    pub fn created_models(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create { model_id, .. } => Some(model_id),
                _ => None,
            })
            .collect()
    }

    pub fn handler(&self, stable_id: &str) -> Option<Arc<dyn InteractionHandler>> {
        self.state.lock().unwrap().handlers.get(stable_id).cloned()
    }

    pub fn options(&self, stable_id: &str) -> Option<InstanceOptions> {
        self.state.lock().unwrap().options.get(stable_id).copied()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl CharacterRenderer for RecordingRenderer {
    async fn create(
        &self,
        stable_id: &str,
        model: &CharacterModel,
        options: InstanceOptions,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<Arc<dyn CharacterInstance>, RendererError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_create.contains(&model.id) {
                return Err(RendererError::CreateFailed {
                    stable_id: stable_id.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            state.calls.push(Call::Create {
                stable_id: stable_id.to_string(),
                model_id: model.id.clone(),
            });
            state.handlers.insert(stable_id.to_string(), handler);
            state.options.insert(stable_id.to_string(), options);
        }

        Ok(Arc::new(RecordingInstance {
            stable_id: stable_id.to_string(),
            renderer: self.clone(),
        }))
    }
}

struct RecordingInstance {
    stable_id: String,
    renderer: RecordingRenderer,
}

#[async_trait]
impl CharacterInstance for RecordingInstance {
    async fn apply_model(&self, model: &CharacterModel) -> Result<(), RendererError> {
        if self.renderer.state.lock().unwrap().fail_apply.contains(&model.id) {
            return Err(RendererError::ModelLoadFailed {
                model_id: model.id.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.renderer.record(Call::Apply {
            stable_id: self.stable_id.clone(),
            model_id: model.id.clone(),
        });
        Ok(())
    }

    async fn fade_out(&self) {
        self.renderer.record(Call::FadeOut {
            stable_id: self.stable_id.clone(),
        });
        tokio::time::sleep(self.renderer.fade_delay).await;
    }

    async fn destroy(&self) -> Result<(), RendererError> {
        self.renderer.record(Call::Destroy {
            stable_id: self.stable_id.clone(),
        });
        Ok(())
    }

    async fn set_interactive(&self, allow: bool) {
        self.renderer.record(Call::SetInteractive {
            stable_id: self.stable_id.clone(),
            allow,
        });
    }
}

/// Scripted behavior of one catalog source
#[derive(Clone)]
pub enum Script {
    Succeed { delay_ms: u64, models: Vec<CharacterModel> },
    Fail { delay_ms: u64, reason: String },
}

/// Catalog fetcher whose sources resolve or reject after fixed delays
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    tokens: Mutex<HashMap<String, CancellationToken>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, source: &str, delay_ms: u64, models: Vec<CharacterModel>) -> Self {
        self.scripts
            .insert(source.to_string(), Script::Succeed { delay_ms, models });
        self
    }

    pub fn fail(mut self, source: &str, delay_ms: u64, reason: &str) -> Self {
        self.scripts.insert(
            source.to_string(),
            Script::Fail {
                delay_ms,
                reason: reason.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Token handed to the fetch of `source`, if it was fetched
    pub fn token(&self, source: &str) -> Option<CancellationToken> {
        self.tokens.lock().unwrap().get(source).cloned()
    }
}

#[async_trait]
impl CatalogFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        source: &CatalogSourceConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<CharacterModel>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .insert(source.id.clone(), cancel.clone());

        let script = self
            .scripts
            .get(&source.id)
            .cloned()
            .unwrap_or(Script::Fail {
                delay_ms: 0,
                reason: "unscripted source".to_string(),
            });
        let delay_ms = match &script {
            Script::Succeed { delay_ms, .. } | Script::Fail { delay_ms, .. } => *delay_ms,
        };

        tokio::select! {
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            () = tokio::time::sleep(Duration::from_millis(delay_ms)) => match script {
                Script::Succeed { models, .. } => Ok(models),
                Script::Fail { reason, .. } => Err(FetchError::Transport(reason)),
            },
        }
    }
}

/// Source config pointing nowhere; the scripted fetcher keys on the id
pub fn source(id: &str) -> CatalogSourceConfig {
    CatalogSourceConfig::new(
        id,
        format!("https://{id}.example.com/models_data.json"),
        format!("https://{id}.example.com/"),
    )
}
