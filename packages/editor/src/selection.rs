//! Selection Controller: the only reload path for the field store.

use dadm_model::NodeKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::DocumentAdapter;
use crate::scheduler::CommitScheduler;
use crate::store::FieldStateStore;

/// Components a selection change reaches into
pub struct SelectionContext<'a> {
    pub store: &'a mut FieldStateStore,
    pub scheduler: &'a mut CommitScheduler,
    pub adapter: Option<&'a DocumentAdapter>,
    pub extension_keys: &'a [String],
}

#[derive(Debug)]
pub struct SelectionController {
    current: Option<NodeKey>,
    /// Parent of every commit token scheduled for `current`
    token: CancellationToken,
}

impl SelectionController {
    pub fn new(lifetime: &CancellationToken) -> Self {
        Self {
            current: None,
            token: lifetime.child_token(),
        }
    }

    pub fn current(&self) -> Option<&NodeKey> {
        self.current.as_ref()
    }

    pub fn is_current(&self, node: &NodeKey) -> bool {
        self.current.as_ref() == Some(node)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Observe a new selected element (or none).
    ///
    /// Cancels timers scheduled for the previous element and reloads the
    /// store wholesale. Unsaved edits of the previous element are dropped.
    /// Returns `false` when `next` is already the selection.
    pub fn change(
        &mut self,
        next: Option<NodeKey>,
        lifetime: &CancellationToken,
        ctx: SelectionContext<'_>,
    ) -> bool {
        if self.current == next {
            return false;
        }

        self.token.cancel();
        if let Some(previous) = &self.current {
            let cancelled = ctx.scheduler.cancel_node(previous);
            if ctx.store.has_dirty_fields() {
                debug!(node = %previous, "Discarding uncommitted edits on selection change");
            }
            if cancelled > 0 {
                debug!(node = %previous, cancelled, "Cancelled pending commits");
            }
        }

        self.token = lifetime.child_token();
        self.current = next;
        info!(
            node = self.current.as_ref().map(|n| n.as_str()).unwrap_or("<none>"),
            "Selection changed"
        );

        self.reload(ctx.store, ctx.adapter, ctx.extension_keys);
        true
    }

    /// Load the store for the current selection
    pub fn reload(
        &self,
        store: &mut FieldStateStore,
        adapter: Option<&DocumentAdapter>,
        extension_keys: &[String],
    ) {
        match (&self.current, adapter) {
            (Some(node), Some(adapter)) => {
                if let Err(e) = store.load(adapter, node, extension_keys) {
                    warn!(node = %node, error = %e, "Failed to load element fields");
                }
            }
            (Some(node), None) => {
                store.clear();
                debug!(node = %node, "Host document not ready; fields left empty");
            }
            (None, _) => store.clear(),
        }
    }
}
