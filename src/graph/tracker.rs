//! Per-buffer access tracking and dependency inference.

use super::node::{EdgeKind, TaskNode};
use crate::buffer::AccessMode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static BUFFER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        BufferId(BUFFER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Default)]
struct TrackerState {
    last_writer: Option<Arc<TaskNode>>,
    // readers registered since last_writer
    readers: Vec<Arc<TaskNode>>,
}

/// Remembers which tasks touch a buffer so later submissions can be
/// ordered after them.
pub(crate) struct AccessTracker {
    id: BufferId,
    state: Mutex<TrackerState>,
}

impl AccessTracker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: BufferId::next(),
            state: Mutex::new(TrackerState::default()),
        })
    }

    pub(crate) fn id(&self) -> BufferId {
        self.id
    }
}

/// An access a submission makes to one buffer.
#[derive(Clone)]
pub(crate) struct Requirement {
    pub(crate) tracker: Arc<AccessTracker>,
    pub(crate) mode: AccessMode,
}

/// Folds requirements on the same buffer into one, merging their modes, and
/// sorts them by buffer id.
pub(crate) fn normalize(mut requirements: Vec<Requirement>) -> Vec<Requirement> {
    requirements.sort_by_key(|r| r.tracker.id());

    let mut merged: Vec<Requirement> = Vec::with_capacity(requirements.len());
    for req in requirements {
        match merged.last_mut() {
            Some(last) if last.tracker.id() == req.tracker.id() => {
                last.mode = last.mode.merge(req.mode);
            }
            _ => merged.push(req),
        }
    }
    merged
}

/// Registers `node` against every requirement and adds the inferred edges.
///
/// All trackers are locked together in buffer-id order, so two concurrent
/// submissions touching the same buffers observe one consistent order.
/// Returns the edges that were added.
pub(crate) fn register(node: &Arc<TaskNode>, requirements: &[Requirement]) -> Vec<EdgeKind> {
    let requirements = normalize(requirements.to_vec());
    let mut guards: Vec<_> = requirements
        .iter()
        .map(|r| (r.tracker.state.lock(), r.mode))
        .collect();

    let mut added = Vec::new();

    for (state, mode) in guards.iter_mut() {
        if let Some(writer) = &state.last_writer {
            let kind = if mode.writes() {
                EdgeKind::WriteAfterWrite
            } else {
                EdgeKind::ReadAfterWrite
            };
            if node.add_dependency(writer, kind) {
                added.push(kind);
            }
        }

        if mode.writes() {
            for reader in &state.readers {
                if node.add_dependency(reader, EdgeKind::WriteAfterRead) {
                    added.push(EdgeKind::WriteAfterRead);
                }
            }
            state.last_writer = Some(Arc::clone(node));
            state.readers.clear();
        } else {
            state.readers.retain(|r| !r.is_finished());
            state.readers.push(Arc::clone(node));
        }
    }

    added
}
