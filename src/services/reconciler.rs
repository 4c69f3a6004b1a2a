//! Reconciler: keeps live character instances consistent with desired state.
//!
//! The live table is a derived projection of the desired list. Each pass
//! diffs the desired snapshot against the table by entry id:
//!
//! - **Removed**: the row is dropped synchronously, then the instance fades
//!   out and is destroyed in a detached task.
//! - **Updated**: the bound model id changed; the model is swapped in place.
//! - **Added**: a new instance is created and registered.
//!
//! User interactions never touch the table. They write to the
//! [`DesiredStateStore`] and the resulting change notification drives the
//! next pass.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{keys, CharacterId, CharacterItem, CharacterModel};
use crate::domain::ports::{
    CharacterInstance, CharacterRenderer, InstanceOptions, InteractionHandler, StorageChanges,
};

use super::desired_state::{decode, DesiredStateStore};

/// A running instance bound to one desired entry.
pub struct LiveInstance {
    /// Desired entry id
    pub id: CharacterId,
    /// Identifier the renderer knows the instance by
    pub stable_id: String,
    /// Model the instance currently renders
    pub model: CharacterModel,
    handle: Arc<dyn CharacterInstance>,
}

/// Live instances keyed by desired entry id.
#[derive(Default)]
pub struct LiveTable {
    rows: BTreeMap<CharacterId, LiveInstance>,
}

impl LiveTable {
    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is live.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether entry `id` is live.
    pub fn contains(&self, id: CharacterId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Live instance for entry `id`.
    pub fn get(&self, id: CharacterId) -> Option<&LiveInstance> {
        self.rows.get(&id)
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<CharacterId> {
        self.rows.keys().copied().collect()
    }

    /// Live instances in id order.
    pub fn iter(&self) -> impl Iterator<Item = &LiveInstance> {
        self.rows.values()
    }

    fn get_mut(&mut self, id: CharacterId) -> Option<&mut LiveInstance> {
        self.rows.get_mut(&id)
    }

    fn insert(&mut self, instance: LiveInstance) {
        self.rows.insert(instance.id, instance);
    }

    fn remove(&mut self, id: CharacterId) -> Option<LiveInstance> {
        self.rows.remove(&id)
    }
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries given a new instance
    pub created: Vec<CharacterId>,
    /// Entries whose model was swapped in place
    pub updated: Vec<CharacterId>,
    /// Entries whose instance is exiting
    pub removed: Vec<CharacterId>,
    /// Entries whose create or update was rejected; retried next pass
    pub failed: Vec<CharacterId>,
}

impl ReconcileReport {
    /// Whether the pass issued no lifecycle calls.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.failed.is_empty()
    }
}

/// Stable renderer identifier for an entry.
pub fn stable_id(prefix: &str, id: CharacterId) -> String {
    format!("{prefix}{id}")
}

/// Recover the entry id from a stable identifier.
pub fn parse_stable_id(prefix: &str, stable_id: &str) -> Option<CharacterId> {
    stable_id.strip_prefix(prefix)?.parse().ok()
}

/// Owns the live table and applies desired snapshots to it.
pub struct Reconciler {
    renderer: Arc<dyn CharacterRenderer>,
    interactions: Arc<dyn InteractionHandler>,
    instance_prefix: String,
    options: InstanceOptions,
    live: LiveTable,
    exits: Vec<JoinHandle<()>>,
}

impl Reconciler {
    /// Reconciler with an empty live table.
    pub fn new(
        renderer: Arc<dyn CharacterRenderer>,
        interactions: Arc<dyn InteractionHandler>,
        instance_prefix: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            interactions,
            instance_prefix: instance_prefix.into(),
            options: InstanceOptions::default(),
            live: LiveTable::default(),
            exits: Vec::new(),
        }
    }

    /// Options passed to instances created from now on.
    pub const fn with_options(mut self, options: InstanceOptions) -> Self {
        self.options = options;
        self
    }

    /// Current live table.
    pub const fn live(&self) -> &LiveTable {
        &self.live
    }

    /// Options new instances are created with.
    pub const fn options(&self) -> InstanceOptions {
        self.options
    }

    /// Number of fade-out/destroy sequences still running.
    pub fn pending_exits(&mut self) -> usize {
        self.exits.retain(|handle| !handle.is_finished());
        self.exits.len()
    }

    /// Wait for every detached fade-out/destroy sequence to finish.
    pub async fn settle(&mut self) {
        for handle in self.exits.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "instance exit task failed");
            }
        }
    }

    /// Apply one desired snapshot to the live table.
    ///
    /// Idempotent: a second call with the same snapshot issues no lifecycle
    /// calls unless an earlier create or update failed.
    pub async fn reconcile(&mut self, desired: &[CharacterItem]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.exits.retain(|handle| !handle.is_finished());

        let mut seen = HashSet::with_capacity(desired.len());
        let desired: Vec<&CharacterItem> = desired
            .iter()
            .filter(|item| {
                let first = seen.insert(item.id);
                if !first {
                    warn!(character_id = item.id, "duplicate id in desired state, ignoring");
                }
                first
            })
            .collect();

        let removed: Vec<CharacterId> = self
            .live
            .ids()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();
        for id in removed {
            if let Some(instance) = self.live.remove(id) {
                self.exit(instance);
                report.removed.push(id);
            }
        }

        for item in desired {
            match self.live.get_mut(item.id) {
                Some(instance) if instance.model.id != item.model.id => {
                    match instance.handle.apply_model(&item.model).await {
                        Ok(()) => {
                            debug!(
                                character_id = item.id,
                                from = %instance.model.id,
                                to = %item.model.id,
                                "character updated"
                            );
                            instance.model = item.model.clone();
                            report.updated.push(item.id);
                        }
                        Err(err) => {
                            let err = DomainError::InstanceLifecycle {
                                id: item.id,
                                reason: err.to_string(),
                            };
                            warn!(error = %err, "update failed, keeping previous model");
                            report.failed.push(item.id);
                        }
                    }
                }
                Some(_) => {}
                None => {
                    if self.create(item).await {
                        report.created.push(item.id);
                    } else {
                        report.failed.push(item.id);
                    }
                }
            }
        }

        if !report.is_noop() {
            info!(
                created = report.created.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                failed = report.failed.len(),
                live = self.live.len(),
                "reconciliation pass applied"
            );
        }
        report
    }

    /// Push a new interaction preference to every live instance.
    pub async fn set_allow_interaction(&mut self, allow: bool) {
        if self.options.allow_interaction == allow {
            return;
        }
        self.options.allow_interaction = allow;
        for instance in self.live.iter() {
            instance.handle.set_interactive(allow).await;
        }
        debug!(allow, live = self.live.len(), "interaction preference applied");
    }

    /// Drive passes from the store until `shutdown` fires.
    ///
    /// Notifications that queue up while a pass runs are coalesced; the
    /// newest snapshot supersedes older ones. `nudge` re-runs a pass against
    /// the last snapshot, which retries failed creates.
    pub async fn run(
        &mut self,
        store: &DesiredStateStore,
        nudge: Arc<Notify>,
        shutdown: CancellationToken,
    ) -> DomainResult<()> {
        let mut changes = store.subscribe();

        let allow = store.allow_interaction().await?;
        self.set_allow_interaction(allow).await;
        let mut current = store.characters().await?;
        self.reconcile(&current).await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = nudge.notified() => {
                    debug!("reconcile nudged");
                    self.reconcile(&current).await;
                }
                received = changes.recv() => {
                    let update = match received {
                        Ok(first) => coalesce(first, &mut changes),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "change notifications lagged, rereading store");
                            PendingUpdate::reread()
                        }
                        Err(RecvError::Closed) => break,
                    };
                    match self.apply_update(update, store).await {
                        Ok(Some(next)) => current = next,
                        Ok(None) => {}
                        Err(err) => warn!(error = %err, "failed to read desired state, keeping live instances"),
                    }
                }
            }
        }

        self.settle().await;
        info!(live = self.live.len(), "reconciler stopped");
        Ok(())
    }

    /// Apply one coalesced notification and return the snapshot it produced.
    ///
    /// A notification that removes `characters` is applied as an empty
    /// desired list and nothing is written back. `DesiredStateStore::reset`
    /// clears the store before writing its fresh default, and restoring a
    /// default here would race that write. The default entry comes back on
    /// the next read through [`DesiredStateStore::characters`].
    async fn apply_update(
        &mut self,
        update: PendingUpdate,
        store: &DesiredStateStore,
    ) -> DomainResult<Option<Vec<CharacterItem>>> {
        let allow = if update.reread {
            Some(store.allow_interaction().await?)
        } else {
            match update.allow_interaction {
                Some(value) => match value.as_ref().and_then(Value::as_bool) {
                    Some(allow) => Some(allow),
                    None => Some(store.allow_interaction().await?),
                },
                None => None,
            }
        };
        if let Some(allow) = allow {
            self.set_allow_interaction(allow).await;
        }

        let desired = match (update.reread, update.characters) {
            (true, _) => store.characters().await?,
            (false, None) => return Ok(None),
            (false, Some(None)) => Vec::new(),
            (false, Some(Some(value))) => match decode::<Vec<CharacterItem>>(keys::CHARACTERS, &value) {
                Ok(items) => items,
                Err(err) => {
                    warn!(error = %err, "malformed desired state notification, reinitializing");
                    store.characters().await?
                }
            },
        };

        self.reconcile(&desired).await;
        Ok(Some(desired))
    }

    async fn create(&mut self, item: &CharacterItem) -> bool {
        let stable_id = stable_id(&self.instance_prefix, item.id);
        let result = self
            .renderer
            .create(
                &stable_id,
                &item.model,
                self.options,
                Arc::clone(&self.interactions),
            )
            .await;

        match result {
            Ok(handle) => {
                debug!(character_id = item.id, model_id = %item.model.id, %stable_id, "character created");
                self.live.insert(LiveInstance {
                    id: item.id,
                    stable_id,
                    model: item.model.clone(),
                    handle,
                });
                true
            }
            Err(err) => {
                let err = DomainError::InstanceLifecycle {
                    id: item.id,
                    reason: err.to_string(),
                };
                warn!(error = %err, "create failed, entry stays desired but not live");
                false
            }
        }
    }

    fn exit(&mut self, instance: LiveInstance) {
        let LiveInstance {
            id,
            stable_id,
            handle,
            ..
        } = instance;
        let span = tracing::debug_span!("instance_exit", character_id = id, %stable_id);
        self.exits.push(tokio::spawn(
            async move {
                handle.fade_out().await;
                match handle.destroy().await {
                    Ok(()) => debug!("character destroyed"),
                    Err(err) => warn!(error = %err, "destroy failed"),
                }
            }
            .instrument(span),
        ));
    }
}

/// Coalesced content of one or more change notifications.
///
/// Outer `Option`: whether the key changed; inner: its new value.
#[derive(Debug, Default)]
struct PendingUpdate {
    characters: Option<Option<Value>>,
    allow_interaction: Option<Option<Value>>,
    reread: bool,
}

impl PendingUpdate {
    fn reread() -> Self {
        Self {
            reread: true,
            ..Self::default()
        }
    }

    fn absorb(&mut self, mut changes: StorageChanges) {
        if let Some(change) = changes.remove(keys::CHARACTERS) {
            self.characters = Some(change.new_value);
        }
        if let Some(change) = changes.remove(keys::ALLOW_INTERACTION) {
            self.allow_interaction = Some(change.new_value);
        }
    }
}

fn coalesce(
    first: StorageChanges,
    receiver: &mut broadcast::Receiver<StorageChanges>,
) -> PendingUpdate {
    let mut update = PendingUpdate::default();
    update.absorb(first);
    loop {
        match receiver.try_recv() {
            Ok(changes) => update.absorb(changes),
            Err(TryRecvError::Lagged(_)) => update.reread = true,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    update
}

/// Writes user interactions back into the desired state.
pub struct StoreInteractionHandler {
    store: Arc<DesiredStateStore>,
    instance_prefix: String,
}

impl StoreInteractionHandler {
    /// Handler resolving stable ids with `instance_prefix`.
    pub fn new(store: Arc<DesiredStateStore>, instance_prefix: impl Into<String>) -> Self {
        Self {
            store,
            instance_prefix: instance_prefix.into(),
        }
    }

    fn resolve(&self, stable_id: &str) -> Option<CharacterId> {
        let id = parse_stable_id(&self.instance_prefix, stable_id);
        if id.is_none() {
            warn!(%stable_id, "interaction from unknown instance");
        }
        id
    }
}

#[async_trait]
impl InteractionHandler for StoreInteractionHandler {
    async fn on_select_model(&self, stable_id: &str, model: CharacterModel) {
        let Some(id) = self.resolve(stable_id) else {
            return;
        };
        if let Err(err) = self.store.update_character(id, model).await {
            warn!(character_id = id, error = %err, "failed to apply model selection");
        }
    }

    async fn on_hide(&self, stable_id: &str) {
        let Some(id) = self.resolve(stable_id) else {
            return;
        };
        if let Err(err) = self.store.delete_character(id).await {
            warn!(character_id = id, error = %err, "failed to hide character");
        }
    }
}
