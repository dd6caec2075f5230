//! # Commit Scheduler
//!
//! Turns field blurs into at most one eventual write per field.
//!
//! ## Design
//!
//! - Each blur registers a [`CommitRequest`] with a fresh sequence number and
//!   its own cancellation token; an older pending request for the same field
//!   is cancelled (superseded), so bursts coalesce into one write.
//! - Tokens are children of the selection token: a selection change cancels
//!   every timer that has not fired yet.
//! - After the debounce interval the request waits for its element's write
//!   gate. Only one commit per element runs at a time, from adapter write
//!   through propagation of the serialized text.
//!
//! ```text
//! blur ─▶ schedule ─▶ sleep(debounce) ─▶ acquire gate ─▶ commit ─▶ release
//!            │              │                  │
//!            └─ supersede ──┴──── cancelled ───┴──▶ dropped
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dadm_model::NodeKey;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::field::FieldPath;

/// In-flight-write gate for one element; held while a commit runs
pub type WriteGate = Arc<AsyncMutex<()>>;

/// Proof that the holder owns its element's write gate
pub type GatePermit = OwnedMutexGuard<()>;

/// One scheduled write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    /// Element selected when the commit was scheduled
    pub node: NodeKey,
    pub path: FieldPath,
    /// Monotonic per editor
    pub seq: u64,
}

/// A registered request plus what it needs to run
#[derive(Debug)]
pub struct ScheduledCommit {
    pub request: CommitRequest,
    pub token: CancellationToken,
    debounce: Duration,
    gate: WriteGate,
}

#[derive(Debug)]
struct PendingCommit {
    seq: u64,
    token: CancellationToken,
}

#[derive(Debug)]
pub struct CommitScheduler {
    debounce: Duration,
    next_seq: u64,
    pending: HashMap<(NodeKey, FieldPath), PendingCommit>,
    gates: HashMap<NodeKey, WriteGate>,
    tasks: Vec<JoinHandle<()>>,
}

impl CommitScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            next_seq: 0,
            pending: HashMap::new(),
            gates: HashMap::new(),
            tasks: Vec::new(),
        }
    }

    /// Register a commit for `path` on `node`, superseding any pending one
    pub fn schedule(
        &mut self,
        node: &NodeKey,
        path: &FieldPath,
        parent: &CancellationToken,
    ) -> ScheduledCommit {
        let key = (node.clone(), path.clone());
        if let Some(previous) = self.pending.remove(&key) {
            previous.token.cancel();
            debug!(node = %node, field = %path, seq = previous.seq, "Superseded pending commit");
        }

        self.next_seq += 1;
        let token = parent.child_token();
        self.pending.insert(
            key,
            PendingCommit {
                seq: self.next_seq,
                token: token.clone(),
            },
        );

        let gate = Arc::clone(self.gates.entry(node.clone()).or_default());

        ScheduledCommit {
            request: CommitRequest {
                node: node.clone(),
                path: path.clone(),
                seq: self.next_seq,
            },
            token,
            debounce: self.debounce,
            gate,
        }
    }

    /// Keep a handle to a spawned commit task
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|h| !h.is_finished());
        self.tasks.push(handle);
    }

    pub fn take_tasks(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.tasks)
    }

    /// Whether `request` is still the newest one for its field
    pub fn is_current(&self, request: &CommitRequest) -> bool {
        self.pending
            .get(&(request.node.clone(), request.path.clone()))
            .is_some_and(|p| p.seq == request.seq)
    }

    /// Forget a request once its task is done
    pub fn finish(&mut self, request: &CommitRequest) {
        if self.is_current(request) {
            self.pending
                .remove(&(request.node.clone(), request.path.clone()));
        }
    }

    /// Cancel every pending commit for `node`. Returns how many were cancelled.
    pub fn cancel_node(&mut self, node: &NodeKey) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(n, _), pending| {
            if n == node {
                pending.token.cancel();
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    /// Cancel everything and drop the gates
    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.token.cancel();
        }
        self.gates.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True while a commit holds the element's write gate
    pub fn is_in_flight(&self, node: &NodeKey) -> bool {
        self.gates
            .get(node)
            .is_some_and(|gate| gate.try_lock().is_err())
    }
}

impl ScheduledCommit {
    /// Wait out the debounce interval, then for the element's write gate.
    ///
    /// Returns `None` if the request is cancelled at any point before it
    /// owns the gate.
    pub async fn wait_for_turn(&self) -> Option<GatePermit> {
        tokio::select! {
            _ = self.token.cancelled() => return None,
            _ = tokio::time::sleep(self.debounce) => {}
        }

        let permit = tokio::select! {
            _ = self.token.cancelled() => return None,
            permit = Arc::clone(&self.gate).lock_owned() => permit,
        };

        if self.token.is_cancelled() {
            return None;
        }
        Some(permit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn node(key: &str) -> NodeKey {
        NodeKey::new(key)
    }

    #[test]
    fn test_schedule_assigns_increasing_sequence() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let root = CancellationToken::new();

        let a = scheduler.schedule(&node("a"), &FieldPath::Name, &root);
        let b = scheduler.schedule(&node("a"), &FieldPath::Id, &root);

        assert!(b.request.seq > a.request.seq);
        assert_eq!(scheduler.pending_count(), 2);
    }

    #[test]
    fn test_reschedule_supersedes() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let root = CancellationToken::new();

        let first = scheduler.schedule(&node("a"), &FieldPath::Name, &root);
        let second = scheduler.schedule(&node("a"), &FieldPath::Name, &root);

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert!(!scheduler.is_current(&first.request));
        assert!(scheduler.is_current(&second.request));
        assert_eq!(scheduler.pending_count(), 1);

        // a superseded request finishing must not drop its successor
        scheduler.finish(&first.request);
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.finish(&second.request);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_cancel_node_only_touches_that_node() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let root = CancellationToken::new();

        let a1 = scheduler.schedule(&node("a"), &FieldPath::Name, &root);
        let a2 = scheduler.schedule(&node("a"), &FieldPath::Id, &root);
        let b = scheduler.schedule(&node("b"), &FieldPath::Name, &root);

        assert_eq!(scheduler.cancel_node(&node("a")), 2);
        assert!(a1.token.is_cancelled());
        assert!(a2.token.is_cancelled());
        assert!(!b.token.is_cancelled());
    }

    #[test]
    fn test_parent_cancellation_reaches_requests() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let selection = CancellationToken::new();

        let commit = scheduler.schedule(&node("a"), &FieldPath::Name, &selection);
        selection.cancel();
        assert!(commit.token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_turn_after_debounce() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let root = CancellationToken::new();
        let commit = scheduler.schedule(&node("a"), &FieldPath::Name, &root);

        let start = tokio::time::Instant::now();
        let permit = commit.wait_for_turn().await;

        assert!(permit.is_some());
        assert!(start.elapsed() >= DEBOUNCE);
        assert!(start.elapsed() < DEBOUNCE * 2);
        assert!(scheduler.is_in_flight(&node("a")));

        drop(permit);
        assert!(!scheduler.is_in_flight(&node("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_takes_gate() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let root = CancellationToken::new();
        let commit = scheduler.schedule(&node("a"), &FieldPath::Name, &root);

        let token = commit.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        assert!(commit.wait_for_turn().await.is_none());
        assert!(!scheduler.is_in_flight(&node("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_serializes_same_node() {
        let mut scheduler = CommitScheduler::new(DEBOUNCE);
        let root = CancellationToken::new();
        let first = scheduler.schedule(&node("a"), &FieldPath::Name, &root);
        let second = scheduler.schedule(&node("a"), &FieldPath::Id, &root);
        let other = scheduler.schedule(&node("b"), &FieldPath::Id, &root);

        let held = first.wait_for_turn().await.unwrap();

        // same element waits; a different element does not
        let blocked = tokio::time::timeout(Duration::from_secs(5), second.wait_for_turn()).await;
        assert!(blocked.is_err());
        assert!(other.wait_for_turn().await.is_some());

        drop(held);
        assert!(second.wait_for_turn().await.is_some());
    }
}
