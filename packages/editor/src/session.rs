//! # Properties Editor Session
//!
//! One editor instance bound to one host document and one selection at a
//! time. Ties the field store, commit scheduler, selection controller,
//! document adapter and serializer bridge together.
//!
//! All mutable state sits behind a single lock that is never held across
//! an await point. Commit tasks re-enter the lock when their timer fires
//! and again after the serialized text has been propagated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dadm_model::{NodeKey, SharedDocument};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapter::DocumentAdapter;
use crate::bridge::{DocumentSink, RenderStamp, Rendered, SerializerBridge};
use crate::config::EditorConfig;
use crate::errors::{BridgeError, EditorError};
use crate::field::{FieldBinding, FieldPath, FieldStatus};
use crate::scheduler::{CommitRequest, CommitScheduler, ScheduledCommit};
use crate::selection::{SelectionContext, SelectionController};
use crate::store::FieldStateStore;
use crate::validator::validate;

/// Callback observing every field edit before it is committed
pub type FieldEditHook = Arc<dyn Fn(&FieldPath, &str) + Send + Sync>;

/// Optional host callbacks
#[derive(Clone, Default)]
pub struct EditorHooks {
    pub on_field_edit: Option<FieldEditHook>,
}

impl std::fmt::Debug for EditorHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorHooks")
            .field("on_field_edit", &self.on_field_edit.is_some())
            .finish()
    }
}

/// Handle to a properties editor. Clones share the same session.
#[derive(Clone)]
pub struct PropertiesEditor {
    inner: Arc<Inner>,
}

struct Inner {
    config: EditorConfig,
    bridge: SerializerBridge,
    hooks: EditorHooks,
    /// Root of every selection and commit token
    lifetime: CancellationToken,
    state: Mutex<EditorState>,
}

struct EditorState {
    adapter: Option<DocumentAdapter>,
    selection: SelectionController,
    store: FieldStateStore,
    scheduler: CommitScheduler,
    /// Bumped on every attach so texts of a replaced document sort older
    epoch: u64,
    /// Oldest document state the host has not received because rendering or
    /// publishing failed
    owed: Option<RenderStamp>,
}

/// What a fired timer decided under the lock
enum FireOutcome {
    /// Nothing to propagate
    Done,
    /// Text still has to reach the host
    Render { rendered: Rendered, value: String },
}

impl PropertiesEditor {
    pub fn new(config: EditorConfig, sink: Arc<dyn DocumentSink>) -> Self {
        Self::with_hooks(config, sink, EditorHooks::default())
    }

    pub fn with_hooks(config: EditorConfig, sink: Arc<dyn DocumentSink>, hooks: EditorHooks) -> Self {
        let lifetime = CancellationToken::new();
        let state = EditorState {
            adapter: None,
            selection: SelectionController::new(&lifetime),
            store: FieldStateStore::new(),
            scheduler: CommitScheduler::new(config.debounce()),
            epoch: 0,
            owed: None,
        };

        Self {
            inner: Arc::new(Inner {
                config,
                bridge: SerializerBridge::new(sink),
                hooks,
                lifetime,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    /// Bind the host document. The current selection, if any, is reloaded.
    pub fn attach(&self, document: SharedDocument) {
        if self.is_shut_down() {
            return;
        }

        let mut guard = self.inner.state();
        let state = &mut *guard;
        if let Some(node) = state.selection.current() {
            state.scheduler.cancel_node(node);
        }

        state.adapter = Some(DocumentAdapter::new(document));
        state.epoch += 1;
        state.owed = None;
        state
            .selection
            .reload(&mut state.store, state.adapter.as_ref(), &self.inner.config.extension_keys);
        info!("Host document attached");
    }

    /// Unbind the host document. Pending commits are dropped.
    pub fn detach(&self) {
        let mut guard = self.inner.state();
        let state = &mut *guard;
        if let Some(node) = state.selection.current() {
            state.scheduler.cancel_node(node);
        }
        state.adapter = None;
        state.store.clear();
        info!("Host document detached");
    }

    /// Whether a host document is attached
    pub fn is_ready(&self) -> bool {
        self.inner.state().adapter.is_some()
    }

    /// Observe a new selected element. Returns `false` if nothing changed.
    pub fn select(&self, node: Option<NodeKey>) -> bool {
        if self.is_shut_down() {
            return false;
        }

        let mut guard = self.inner.state();
        let state = &mut *guard;
        state.selection.change(
            node,
            &self.inner.lifetime,
            SelectionContext {
                store: &mut state.store,
                scheduler: &mut state.scheduler,
                adapter: state.adapter.as_ref(),
                extension_keys: &self.inner.config.extension_keys,
            },
        )
    }

    pub fn selected(&self) -> Option<NodeKey> {
        self.inner.state().selection.current().cloned()
    }

    pub fn focus(&self, path: &FieldPath) {
        self.inner.state().store.mark_focused(path);
    }

    /// Record an edit in the field store. Never touches the document.
    ///
    /// A validation failure is returned but the value is still kept, so the
    /// user can keep typing.
    pub fn edit(&self, path: &FieldPath, value: &str) -> Result<(), EditorError> {
        if self.is_shut_down() {
            return Err(EditorError::ShutDown);
        }

        let result = self.inner.state().store.set_field(path, value);
        if matches!(result, Err(EditorError::UnboundField(_))) {
            return result;
        }

        if let Some(hook) = &self.inner.hooks.on_field_edit {
            hook(path, value);
        }
        result
    }

    /// Field lost focus: schedule its commit.
    ///
    /// Returns `true` if a commit was scheduled. Invalid fields, fields not
    /// bound for the selection and a host that is not ready schedule nothing.
    pub fn blur(&self, path: &FieldPath) -> bool {
        if self.is_shut_down() {
            return false;
        }

        let mut guard = self.inner.state();
        let state = &mut *guard;

        let Some(node) = state.selection.current().cloned() else {
            return false;
        };
        if state.adapter.is_none() {
            debug!(node = %node, field = %path, "Host document not ready; blur ignored");
            return false;
        }
        if let Err(e) = state.store.mark_blurred(path) {
            debug!(node = %node, field = %path, error = %e, "Blur without commit");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "No async runtime; commit not scheduled");
                state
                    .store
                    .set_status(path, FieldStatus::Error("no async runtime".to_string()));
                return false;
            }
        };

        let commit = state.scheduler.schedule(&node, path, state.selection.token());
        debug!(node = %node, field = %path, seq = commit.request.seq, "Commit scheduled");

        let inner = Arc::clone(&self.inner);
        let handle = runtime.spawn(inner.run_commit(commit));
        state.scheduler.track(handle);
        true
    }

    pub fn status(&self, path: &FieldPath) -> Option<FieldStatus> {
        self.inner
            .state()
            .store
            .binding(path)
            .map(|b| b.status.clone())
    }

    pub fn binding(&self, path: &FieldPath) -> Option<FieldBinding> {
        self.inner.state().store.binding(path).cloned()
    }

    pub fn value(&self, path: &FieldPath) -> Option<String> {
        self.inner.state().store.value(path).map(str::to_string)
    }

    /// Every field bound for the current selection, in path order
    pub fn bindings(&self) -> Vec<FieldBinding> {
        self.inner.state().store.bindings().cloned().collect()
    }

    pub fn pending_commits(&self) -> usize {
        self.inner.state().scheduler.pending_count()
    }

    /// True while a commit for `node` is between its write and the end of
    /// propagation
    pub fn is_write_in_flight(&self, node: &NodeKey) -> bool {
        self.inner.state().scheduler.is_in_flight(node)
    }

    /// Wait until every spawned commit task has run to completion
    pub async fn settle(&self) {
        loop {
            let tasks = self.inner.state().scheduler.take_tasks();
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    warn!(error = %e, "Commit task failed");
                }
            }
        }
    }

    /// Tear down: cancel every timer and drop all field state
    pub fn shutdown(&self) {
        self.inner.lifetime.cancel();

        let mut state = self.inner.state();
        state.scheduler.cancel_all();
        state.store.clear();
        info!("Properties editor shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lifetime.is_cancelled()
    }
}

impl std::fmt::Debug for PropertiesEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertiesEditor")
            .field("config", &self.inner.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(
        skip_all,
        fields(node = %commit.request.node, field = %commit.request.path, seq = commit.request.seq)
    )]
    async fn run_commit(self: Arc<Self>, commit: ScheduledCommit) {
        let request = &commit.request;

        let Some(permit) = commit.wait_for_turn().await else {
            debug!("Commit cancelled before firing");
            self.state().scheduler.finish(request);
            return;
        };

        let outcome = self.state().fire(request, &self.bridge);
        if let FireOutcome::Render { rendered, value } = outcome {
            let stamp = rendered.stamp;
            let result = self.bridge.propagate(rendered).await;
            self.state().settle_publish(request, &value, stamp, result);
        }

        drop(permit);
        self.state().scheduler.finish(request);
    }
}

impl EditorState {
    /// Validate, write and serialize one field. Runs with the gate held.
    fn fire(&mut self, request: &CommitRequest, bridge: &SerializerBridge) -> FireOutcome {
        let node = &request.node;
        let path = &request.path;

        if !self.scheduler.is_current(request) {
            debug!("Superseded commit dropped");
            return FireOutcome::Done;
        }
        if !self.selection.is_current(node) || !self.store.is_loaded_for(node) {
            debug!("Stale commit dropped");
            return FireOutcome::Done;
        }
        let Some(adapter) = self.adapter.as_ref() else {
            debug!("Host document not ready; commit skipped");
            return FireOutcome::Done;
        };
        let Some(value) = self.store.value(path).map(str::to_string) else {
            return FireOutcome::Done;
        };

        if let Err(e) = validate(path, &value) {
            debug!(error = %e, "Invalid value at commit time");
            self.store.set_status(path, FieldStatus::Error(e.message));
            return FireOutcome::Done;
        }

        match adapter.write(node, path, &value) {
            Ok(true) => info!("Field committed"),
            Ok(false) if self.owed.is_some() => {
                debug!("Value unchanged; re-sending document the host is missing");
            }
            Ok(false) => {
                debug!("Value unchanged; nothing written");
                self.store.mark_committed(path, &value);
                self.store.set_status(path, FieldStatus::Saved);
                return FireOutcome::Done;
            }
            Err(e) => {
                warn!(error = %e, "Field write failed");
                self.store.set_status(path, FieldStatus::Error(e.to_string()));
                return FireOutcome::Done;
            }
        }

        // The tree now holds the value whatever happens to serialization.
        self.store.mark_committed(path, &value);

        let epoch = self.epoch;
        let rendered = adapter
            .with_document(|doc| bridge.render(doc, epoch))
            .map_err(EditorError::from)
            .and_then(|r| r.map_err(EditorError::from));
        match rendered {
            Ok(rendered) => FireOutcome::Render { rendered, value },
            Err(e) => {
                warn!(error = %e, "Serialization failed; document change kept");
                let revision = adapter.with_document(|doc| doc.revision()).unwrap_or_default();
                self.record_owed(RenderStamp { epoch, revision });
                self.store.set_status(path, FieldStatus::Error(e.to_string()));
                FireOutcome::Done
            }
        }
    }

    /// Record the propagation result, and on the field if it is still shown
    fn settle_publish(
        &mut self,
        request: &CommitRequest,
        value: &str,
        stamp: RenderStamp,
        result: Result<bool, BridgeError>,
    ) {
        let status = match result {
            Ok(delivered) => {
                if self.owed.is_some_and(|owed| owed <= stamp) {
                    self.owed = None;
                }
                debug!(value, delivered, "Serialized document propagated");
                FieldStatus::Saved
            }
            Err(e) => {
                warn!(error = %e, "Failed to propagate serialized document");
                self.record_owed(stamp);
                FieldStatus::Error(e.to_string())
            }
        };

        if !self.store.is_loaded_for(&request.node) {
            debug!("Selection moved during propagation");
            return;
        }
        if self.scheduler.is_current(request) {
            self.store.set_status(&request.path, status);
        }
    }

    fn record_owed(&mut self, stamp: RenderStamp) {
        if stamp.epoch != self.epoch {
            return;
        }
        self.owed = Some(self.owed.map_or(stamp, |owed| owed.min(stamp)));
    }
}
