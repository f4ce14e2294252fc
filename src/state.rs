//! Shared per-run visitation state.
//!
//! One [`RunState`] exists per run and is cloned into every spawned resolve
//! task. All bookkeeping sits behind a single mutex so that the
//! check-and-mark transitions (`try_schedule`, `begin`) are atomic under
//! concurrent resolution of independent branches.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of attempting to begin execution of a node.
#[derive(Debug)]
pub enum BeginOutcome {
    /// The node already finished in this run; its memoized output.
    Cached(String),
    /// The node is currently executing on another task. With launches
    /// guarded by `try_schedule` this only occurs on a re-entrant call
    /// chain, so callers treat it as a dependency cycle.
    Cycle,
    /// The caller owns this node's execution and must later `finish` or
    /// `abandon` it.
    Started,
}

#[derive(Default)]
struct RunStateInner {
    scheduled: FxHashSet<String>,
    executing: FxHashSet<String>,
    executed: FxHashSet<String>,
    outputs: FxHashMap<String, String>,
    done: FxHashMap<String, watch::Sender<bool>>,
}

impl RunStateInner {
    fn done_sender(&mut self, node_id: &str) -> &watch::Sender<bool> {
        let executed = self.executed.contains(node_id);
        self.done
            .entry(node_id.to_string())
            .or_insert_with(|| watch::channel(executed).0)
    }
}

/// Cheaply cloneable handle to the run's visitation sets and output map.
#[derive(Clone, Default)]
pub struct RunState {
    inner: Arc<Mutex<RunStateInner>>,
}

impl RunState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to spawn a resolve task for `node_id`. Returns false
    /// if the node was already claimed, so each node is launched at most
    /// once per run.
    pub fn try_schedule(&self, node_id: &str) -> bool {
        self.inner.lock().scheduled.insert(node_id.to_string())
    }

    /// Transition a node into the executing set, or report why it cannot.
    pub fn begin(&self, node_id: &str) -> BeginOutcome {
        let mut inner = self.inner.lock();
        if let Some(output) = inner.outputs.get(node_id) {
            return BeginOutcome::Cached(output.clone());
        }
        if inner.executed.contains(node_id) || !inner.executing.insert(node_id.to_string()) {
            return BeginOutcome::Cycle;
        }
        inner.scheduled.insert(node_id.to_string());
        BeginOutcome::Started
    }

    /// Roll back a `Started` claim without recording an output. Used when
    /// execution cannot proceed (unknown type, missing node).
    pub fn abandon(&self, node_id: &str) {
        self.inner.lock().executing.remove(node_id);
    }

    /// Record a node's output and wake every task waiting on its completion.
    pub fn finish(&self, node_id: &str, output: String) {
        let mut inner = self.inner.lock();
        inner.executing.remove(node_id);
        inner.executed.insert(node_id.to_string());
        inner.outputs.insert(node_id.to_string(), output);
        inner.done_sender(node_id).send_replace(true);
    }

    /// Receiver that observes `true` once `node_id` has finished. Safe to
    /// obtain before the node starts; the initial value reflects whether it
    /// already completed.
    #[must_use]
    pub fn completion(&self, node_id: &str) -> watch::Receiver<bool> {
        self.inner.lock().done_sender(node_id).subscribe()
    }

    #[must_use]
    pub fn output(&self, node_id: &str) -> Option<String> {
        self.inner.lock().outputs.get(node_id).cloned()
    }

    #[must_use]
    pub fn is_executed(&self, node_id: &str) -> bool {
        self.inner.lock().executed.contains(node_id)
    }

    /// Snapshot of every recorded output.
    #[must_use]
    pub fn results(&self) -> FxHashMap<String, String> {
        self.inner.lock().outputs.clone()
    }
}

impl std::fmt::Debug for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RunState")
            .field("scheduled", &inner.scheduled.len())
            .field("executing", &inner.executing.len())
            .field("executed", &inner.executed.len())
            .finish()
    }
}
