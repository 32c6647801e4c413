use crate::error::{Error, Result};
use crate::graph::{Dependency, TaskId, TaskNode, TaskStatus};
use std::sync::Arc;

/// Handle to a submitted command group.
///
/// Waiting on an event also waits, transitively, for everything the task
/// depends on.
#[derive(Clone)]
pub struct Event {
    node: Arc<TaskNode>,
}

impl Event {
    pub(crate) fn new(node: Arc<TaskNode>) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> Arc<TaskNode> {
        Arc::clone(&self.node)
    }

    pub fn id(&self) -> TaskId {
        self.node.id()
    }

    /// Blocks until the task has finished; returns its failure, if any.
    pub fn wait(&self) -> Result<()> {
        self.node.wait()
    }

    pub fn status(&self) -> TaskStatus {
        self.node.status()
    }

    pub fn is_complete(&self) -> bool {
        self.node.is_finished()
    }

    /// The edges this task was given at submission.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.node.dependencies()
    }

    pub fn error(&self) -> Option<Error> {
        self.node.error()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.node.id())
            .field("label", &self.node.label())
            .field("status", &self.node.status())
            .finish()
    }
}
