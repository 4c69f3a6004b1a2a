//! Integration tests for the reconciler: diffing, idempotence, failure
//! handling and the store-driven run loop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use arkpets::domain::models::{default_model, keys};
use arkpets::domain::ports::KeyValueStore;
use arkpets::domain::ports::InstanceOptions;
use arkpets::infrastructure::storage::MemoryStore;
use arkpets::services::{DesiredStateStore, Reconciler, StoreInteractionHandler};
use common::{item, model, stable, wait_for, Call, RecordingRenderer, PREFIX};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn reconciler(renderer: &RecordingRenderer) -> Reconciler {
    let desired = Arc::new(DesiredStateStore::new(Arc::new(MemoryStore::new())));
    let handler = Arc::new(StoreInteractionHandler::new(desired, PREFIX));
    Reconciler::new(Arc::new(renderer.clone()), handler, PREFIX)
}

struct RunningLoop {
    handle: JoinHandle<Reconciler>,
    shutdown: CancellationToken,
    nudge: Arc<Notify>,
}

impl RunningLoop {
    fn spawn(renderer: &RecordingRenderer, desired: Arc<DesiredStateStore>) -> Self {
        let handler = Arc::new(StoreInteractionHandler::new(Arc::clone(&desired), PREFIX));
        let mut reconciler = Reconciler::new(Arc::new(renderer.clone()), handler, PREFIX);
        let shutdown = CancellationToken::new();
        let nudge = Arc::new(Notify::new());

        let (token, notify) = (shutdown.clone(), Arc::clone(&nudge));
        let handle = tokio::spawn(async move {
            reconciler
                .run(&desired, notify, token)
                .await
                .expect("run loop failed");
            reconciler
        });

        Self {
            handle,
            shutdown,
            nudge,
        }
    }

    async fn stop(self) -> Reconciler {
        self.shutdown.cancel();
        self.handle.await.expect("run loop panicked")
    }
}

fn desired_store() -> Arc<DesiredStateStore> {
    Arc::new(DesiredStateStore::new(Arc::new(MemoryStore::new())))
}

#[tokio::test]
async fn test_initial_pass_creates_every_entry() {
    let renderer = RecordingRenderer::new();
    let mut reconciler = reconciler(&renderer);

    let report = reconciler
        .reconcile(&[item(1, "amiya"), item(2, "kaltsit")])
        .await;

    assert_eq!(report.created, vec![1, 2]);
    assert_eq!(reconciler.live().len(), 2);
    assert_eq!(reconciler.live().get(1).unwrap().stable_id, stable(1));
    assert_eq!(
        renderer.calls(),
        vec![
            Call::Create {
                stable_id: stable(1),
                model_id: "amiya".to_string()
            },
            Call::Create {
                stable_id: stable(2),
                model_id: "kaltsit".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_second_pass_with_same_snapshot_is_noop() {
    let renderer = RecordingRenderer::new();
    let mut reconciler = reconciler(&renderer);
    let desired = [item(1, "amiya"), item(2, "kaltsit")];

    reconciler.reconcile(&desired).await;
    renderer.clear_calls();
    let report = reconciler.reconcile(&desired).await;

    assert!(report.is_noop());
    assert!(renderer.calls().is_empty());
    assert_eq!(reconciler.live().ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_model_change_swaps_in_place() {
    let renderer = RecordingRenderer::new();
    let mut reconciler = reconciler(&renderer);

    reconciler.reconcile(&[item(1, "amiya")]).await;
    renderer.clear_calls();
    let report = reconciler.reconcile(&[item(1, "kaltsit")]).await;

    assert_eq!(report.updated, vec![1]);
    assert_eq!(
        renderer.calls(),
        vec![Call::Apply {
            stable_id: stable(1),
            model_id: "kaltsit".to_string()
        }]
    );
    assert_eq!(reconciler.live().get(1).unwrap().model.id, "kaltsit");
}

#[tokio::test]
async fn test_same_model_id_with_new_name_is_not_an_update() {
    let renderer = RecordingRenderer::new();
    let mut reconciler = reconciler(&renderer);

    reconciler.reconcile(&[item(1, "amiya")]).await;
    renderer.clear_calls();
    let mut renamed = item(1, "amiya");
    renamed.model.name = "Amiya (renamed)".to_string();
    let report = reconciler.reconcile(&[renamed]).await;

    assert!(report.is_noop());
    assert!(renderer.calls().is_empty());
}

#[tokio::test]
async fn test_removal_drops_row_before_exit_completes() {
    let renderer = RecordingRenderer::with_fade_delay(Duration::from_millis(50));
    let mut reconciler = reconciler(&renderer);

    reconciler
        .reconcile(&[item(1, "amiya"), item(2, "kaltsit")])
        .await;
    let report = reconciler.reconcile(&[item(2, "kaltsit")]).await;

    assert_eq!(report.removed, vec![1]);
    assert_eq!(reconciler.live().ids(), vec![2]);
    assert_eq!(renderer.destroys(), 0, "destroy waits for the fade-out");
    assert_eq!(reconciler.pending_exits(), 1);

    reconciler.settle().await;

    let exit_calls: Vec<Call> = renderer
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::FadeOut { .. } | Call::Destroy { .. }))
        .collect();
    assert_eq!(
        exit_calls,
        vec![
            Call::FadeOut {
                stable_id: stable(1)
            },
            Call::Destroy {
                stable_id: stable(1)
            },
        ]
    );
    assert_eq!(reconciler.pending_exits(), 0);
}

#[tokio::test]
async fn test_readding_removed_id_during_fade_creates_fresh_instance() {
    let renderer = RecordingRenderer::with_fade_delay(Duration::from_millis(50));
    let mut reconciler = reconciler(&renderer);

    reconciler.reconcile(&[item(1, "amiya")]).await;
    reconciler.reconcile(&[]).await;
    let report = reconciler.reconcile(&[item(1, "amiya")]).await;

    assert_eq!(report.created, vec![1]);
    assert_eq!(renderer.creates(), 2);
    reconciler.settle().await;
    assert_eq!(renderer.destroys(), 1);
    assert_eq!(reconciler.live().len(), 1);
}

#[tokio::test]
async fn test_failed_create_is_retried_on_next_pass() {
    let renderer = RecordingRenderer::new();
    renderer.fail_create("broken");
    let mut reconciler = reconciler(&renderer);
    let desired = [item(1, "amiya"), item(2, "broken")];

    let report = reconciler.reconcile(&desired).await;
    assert_eq!(report.created, vec![1]);
    assert_eq!(report.failed, vec![2]);
    assert!(!reconciler.live().contains(2));

    renderer.allow_create("broken");
    let report = reconciler.reconcile(&desired).await;
    assert_eq!(report.created, vec![2]);
    assert_eq!(reconciler.live().len(), 2);
}

#[tokio::test]
async fn test_failed_update_keeps_previous_model() {
    let renderer = RecordingRenderer::new();
    renderer.fail_apply("broken");
    let mut reconciler = reconciler(&renderer);

    reconciler.reconcile(&[item(1, "amiya")]).await;
    let report = reconciler.reconcile(&[item(1, "broken")]).await;

    assert_eq!(report.failed, vec![1]);
    assert_eq!(reconciler.live().get(1).unwrap().model.id, "amiya");
}

#[tokio::test]
async fn test_duplicate_ids_create_one_instance() {
    let renderer = RecordingRenderer::new();
    let mut reconciler = reconciler(&renderer);

    let report = reconciler
        .reconcile(&[item(1, "amiya"), item(1, "kaltsit")])
        .await;

    assert_eq!(report.created, vec![1]);
    assert_eq!(renderer.created_models(), vec!["amiya".to_string()]);
}

#[tokio::test]
async fn test_interaction_preference_reaches_instances() {
    let renderer = RecordingRenderer::new();
    let mut reconciler = reconciler(&renderer).with_options(InstanceOptions {
        allow_interaction: false,
    });

    reconciler.reconcile(&[item(1, "amiya")]).await;
    assert_eq!(
        renderer.options(&stable(1)),
        Some(InstanceOptions {
            allow_interaction: false
        })
    );

    reconciler.set_allow_interaction(true).await;
    reconciler.set_allow_interaction(true).await;
    assert_eq!(
        renderer.count(|c| matches!(c, Call::SetInteractive { allow: true, .. })),
        1
    );
}

#[tokio::test]
async fn test_run_loop_follows_store_changes() {
    let renderer = RecordingRenderer::new();
    let desired = desired_store();
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));

    assert!(wait_for(|| renderer.creates() == 1, 1000).await);
    assert_eq!(renderer.created_models(), vec![default_model().id]);

    let added = desired.add_character(model("amiya")).await.unwrap();
    assert!(wait_for(|| renderer.creates() == 2, 1000).await);

    desired.delete_character(added.id).await.unwrap();
    assert!(wait_for(|| renderer.destroys() == 1, 1000).await);

    let reconciler = running.stop().await;
    assert_eq!(reconciler.live().len(), 1);
    assert!(!reconciler.live().contains(added.id));
}

#[tokio::test]
async fn test_queued_notifications_are_superseded_by_newest() {
    let renderer = RecordingRenderer::new();
    let desired = desired_store();
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));
    assert!(wait_for(|| renderer.creates() == 1, 1000).await);

    // No await point yields to the loop between these writes.
    let ghost = desired.add_character(model("ghost")).await.unwrap();
    desired.delete_character(ghost.id).await.unwrap();
    desired.add_character(model("amiya")).await.unwrap();

    assert!(wait_for(|| renderer.creates() == 2, 1000).await);
    assert!(!renderer.created_models().contains(&"ghost".to_string()));

    let reconciler = running.stop().await;
    assert_eq!(reconciler.live().len(), 2);
}

#[tokio::test]
async fn test_menu_actions_write_back_through_store() {
    let renderer = RecordingRenderer::new();
    let desired = desired_store();
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));
    assert!(wait_for(|| renderer.creates() == 1, 1000).await);

    let id = desired.characters().await.unwrap()[0].id;
    let handler = renderer.handler(&stable(id)).expect("handler captured");

    handler.on_select_model(&stable(id), model("kaltsit")).await;
    assert!(
        wait_for(
            || renderer.count(|c| matches!(c, Call::Apply { model_id, .. } if model_id == "kaltsit")) == 1,
            1000
        )
        .await
    );
    assert_eq!(desired.characters().await.unwrap()[0].model.id, "kaltsit");

    handler.on_hide(&stable(id)).await;
    assert!(wait_for(|| renderer.destroys() == 1, 1000).await);
    assert!(desired.characters().await.unwrap().is_empty());

    let reconciler = running.stop().await;
    assert!(reconciler.live().is_empty());
}

#[tokio::test]
async fn test_interaction_toggle_is_pushed_to_live_instances() {
    let renderer = RecordingRenderer::new();
    let desired = desired_store();
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));
    assert!(wait_for(|| renderer.creates() == 1, 1000).await);

    desired.set_allow_interaction(false).await.unwrap();
    assert!(
        wait_for(
            || renderer.count(|c| matches!(c, Call::SetInteractive { allow: false, .. })) == 1,
            1000
        )
        .await
    );

    let reconciler = running.stop().await;
    assert!(!reconciler.options().allow_interaction);
}

#[tokio::test]
async fn test_nudge_retries_failed_create() {
    let renderer = RecordingRenderer::new();
    renderer.fail_create(&default_model().id);
    let desired = desired_store();
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(renderer.creates(), 0);

    renderer.allow_create(&default_model().id);
    running.nudge.notify_one();
    assert!(wait_for(|| renderer.creates() == 1, 1000).await);

    running.stop().await;
}

#[tokio::test]
async fn test_reset_replaces_instance_with_fresh_default() {
    let renderer = RecordingRenderer::new();
    let desired = desired_store();
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));
    assert!(wait_for(|| renderer.creates() == 1, 1000).await);
    let old_id = desired.characters().await.unwrap()[0].id;
    desired.add_character(model("amiya")).await.unwrap();
    assert!(wait_for(|| renderer.creates() == 2, 1000).await);

    let characters = desired.reset().await.unwrap();
    assert_eq!(characters.len(), 1);
    assert_ne!(characters[0].id, old_id);

    assert!(wait_for(|| renderer.destroys() == 2, 1000).await);
    assert!(wait_for(|| renderer.creates() == 3, 1000).await);

    let reconciler = running.stop().await;
    assert_eq!(reconciler.live().ids(), vec![characters[0].id]);
}

#[tokio::test]
async fn test_removed_characters_key_tears_down_without_write_back() {
    let renderer = RecordingRenderer::new();
    let store = Arc::new(MemoryStore::new());
    let desired = Arc::new(DesiredStateStore::new(Arc::clone(&store) as _));
    let running = RunningLoop::spawn(&renderer, Arc::clone(&desired));
    assert!(wait_for(|| renderer.creates() == 1, 1000).await);

    store.remove(&[keys::CHARACTERS]).await.unwrap();
    assert!(wait_for(|| renderer.destroys() == 1, 1000).await);

    let reconciler = running.stop().await;
    assert!(reconciler.live().is_empty());
    assert!(store.get(&[keys::CHARACTERS]).await.unwrap().is_empty());

    // The next read through the store restores the default entry.
    let restored = desired.characters().await.unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].model, default_model());
}
