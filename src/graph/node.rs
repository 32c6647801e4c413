//! Task nodes and the edges between them.

use super::Backend;
use crate::error::{Error, Result};
use crate::launch::Launch;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Why one task must run after another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Reads a buffer an earlier task writes.
    ReadAfterWrite,
    /// Writes a buffer an earlier task writes.
    WriteAfterWrite,
    /// Writes a buffer an earlier task reads.
    WriteAfterRead,
    /// Requested with `Handler::depends_on`.
    Explicit,
    /// Submission order on an in-order queue.
    InOrder,
}

/// An incoming edge of a task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub task: TaskId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting on unresolved predecessors.
    Pending,
    /// Dispatched to the backend, or held by the host.
    Running,
    Complete,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Failed)
    }
}

pub(crate) enum Work {
    Kernel(Launch),
    /// Completed by the host when its accessor goes away.
    Host,
}

struct NodeState {
    status: TaskStatus,
    // unresolved predecessors, plus one until the node is armed
    pending: usize,
    dependents: Vec<Arc<TaskNode>>,
    dependencies: Vec<Dependency>,
    upstream_failure: Option<TaskId>,
    error: Option<Error>,
    work: Option<Work>,
}

/// A node of the task graph.
///
/// Nodes form a DAG through `dependents`; edges only ever point from an
/// earlier submission to a later one.
pub(crate) struct TaskNode {
    id: TaskId,
    label: &'static str,
    submitted_at: Instant,
    backend: Option<Weak<dyn Backend>>,
    state: Mutex<NodeState>,
    changed: Condvar,
}

impl TaskNode {
    pub(crate) fn new(
        label: &'static str,
        work: Work,
        backend: Option<Weak<dyn Backend>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: TaskId::next(),
            label,
            submitted_at: Instant::now(),
            backend,
            state: Mutex::new(NodeState {
                status: TaskStatus::Pending,
                pending: 1,
                dependents: Vec::new(),
                dependencies: Vec::new(),
                upstream_failure: None,
                error: None,
                work: Some(work),
            }),
            changed: Condvar::new(),
        })
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    fn backend(&self) -> Option<Arc<dyn Backend>> {
        self.backend.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn status(&self) -> TaskStatus {
        self.state.lock().status
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.status() == TaskStatus::Failed
    }

    pub(crate) fn dependencies(&self) -> Vec<Dependency> {
        self.state.lock().dependencies.clone()
    }

    /// Adds the edge `pred -> self` unless `pred` already completed or is
    /// already a predecessor. A predecessor that already failed is recorded
    /// and fails this node when it is armed. Must be called before
    /// [`arm`](Self::arm).
    pub(crate) fn add_dependency(self: &Arc<Self>, pred: &Arc<TaskNode>, kind: EdgeKind) -> bool {
        if pred.id == self.id {
            return false;
        }

        let mut state = self.state.lock();
        debug_assert_eq!(state.status, TaskStatus::Pending);

        if state.dependencies.iter().any(|d| d.task == pred.id) {
            return false;
        }

        // lock order is always new node -> predecessor
        let mut pred_state = pred.state.lock();
        match pred_state.status {
            TaskStatus::Complete => return false,
            TaskStatus::Failed => {
                if state.upstream_failure.is_none() {
                    let root = pred_state
                        .error
                        .as_ref()
                        .and_then(Error::failed_task)
                        .unwrap_or(pred.id);
                    state.upstream_failure = Some(root);
                }
            }
            TaskStatus::Pending | TaskStatus::Running => {
                pred_state.dependents.push(Arc::clone(self));
                state.pending += 1;
            }
        }
        drop(pred_state);

        state.dependencies.push(Dependency {
            task: pred.id,
            kind,
        });

        log::debug!("edge {} -> {} ({:?})", pred.id, self.id, kind);
        true
    }

    /// Drops the registration hold; the node starts once its predecessors
    /// have finished.
    pub(crate) fn arm(self: &Arc<Self>) {
        if let Some(result) = self.release(None) {
            self.complete(result);
        }
    }

    /// Resolves one predecessor. Once none are left the node is failed or
    /// started; returns the node's result when it finished without running.
    /// Never completes the node itself, so releasing stays flat however long
    /// the chain behind it is.
    fn release(self: &Arc<Self>, failed: Option<TaskId>) -> Option<Result<()>> {
        let (work, upstream) = {
            let mut state = self.state.lock();
            state.pending -= 1;
            if state.upstream_failure.is_none() {
                state.upstream_failure = failed;
            }
            if state.pending > 0 {
                return None;
            }
            let upstream = state.upstream_failure;
            if upstream.is_none() {
                state.status = TaskStatus::Running;
            }
            (state.work.take(), upstream)
        };

        if let Some(failed) = upstream {
            return Some(Err(Error::DependencyFailed {
                task: self.id,
                failed,
            }));
        }

        self.changed.notify_all();

        match work {
            Some(Work::Kernel(launch)) => match self.backend() {
                Some(backend) => {
                    log::trace!("dispatching {} ({})", self.id, self.label);
                    backend.launch(Arc::clone(self), launch)
                }
                None => Some(Err(Error::executor(format!(
                    "{} has no backend to run on",
                    self.id
                )))),
            },
            // host nodes stay running until the host releases them
            Some(Work::Host) | None => None,
        }
    }

    /// Marks the node finished and releases its dependents. Later calls are
    /// ignored.
    ///
    /// Dependents that finish on release (failed upstream, empty launches)
    /// are handled on a worklist here rather than by recursion.
    pub(crate) fn complete(self: &Arc<Self>, result: Result<()>) {
        let mut worklist = vec![(Arc::clone(self), result)];

        while let Some((node, result)) = worklist.pop() {
            let Some((dependents, failed)) = node.finish(result) else {
                continue;
            };
            for dependent in dependents {
                if let Some(result) = dependent.release(failed) {
                    worklist.push((dependent, result));
                }
            }
        }
    }

    /// Records the result; returns the dependents to release and the root
    /// failure, or `None` if the node had already finished.
    fn finish(&self, result: Result<()>) -> Option<(Vec<Arc<TaskNode>>, Option<TaskId>)> {
        let finished = {
            let mut state = self.state.lock();
            if state.status.is_finished() {
                return None;
            }

            let failed = match result {
                Ok(()) => {
                    state.status = TaskStatus::Complete;
                    None
                }
                Err(err) => {
                    // blame the task the failure started at
                    let root = err.failed_task().unwrap_or(self.id);
                    state.status = TaskStatus::Failed;
                    state.error = Some(err);
                    Some(root)
                }
            };

            // recorded before any waiter can observe the new status
            if let Some(backend) = self.backend() {
                backend.finished(self, failed.is_some());
            }

            (std::mem::take(&mut state.dependents), failed)
        };

        self.changed.notify_all();
        Some(finished)
    }

    /// Blocks until the node has finished.
    pub(crate) fn wait(&self) -> Result<()> {
        let mut state = self.state.lock();
        while !state.status.is_finished() {
            self.changed.wait(&mut state);
        }
        match &state.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Blocks until the node has left `Pending`.
    pub(crate) fn wait_started(&self) {
        let mut state = self.state.lock();
        while state.status == TaskStatus::Pending {
            self.changed.wait(&mut state);
        }
    }

    pub(crate) fn error(&self) -> Option<Error> {
        self.state.lock().error.clone()
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("status", &self.status())
            .finish()
    }
}
