//! Task graph built from declared buffer accesses.
//!
//! Every submission becomes a [`TaskNode`]. When it is registered, each
//! buffer it touches contributes edges from the unresolved tasks that
//! touched that buffer before it:
//!
//! | new access | earlier unresolved task | edge                 |
//! |-----------:|-------------------------|----------------------|
//! | read       | last writer             | `ReadAfterWrite`     |
//! | write      | last writer             | `WriteAfterWrite`    |
//! | write      | readers since the write | `WriteAfterRead`     |
//!
//! Readers never order each other, so tasks that only share read access, or
//! that touch disjoint buffers, may run concurrently. A node is dispatched to
//! its [`Backend`] when its last predecessor finishes; a failed predecessor
//! fails all of its transitive dependents without running them.

pub mod node;
pub mod tracker;

pub use node::{Dependency, EdgeKind, TaskId, TaskStatus};
pub use tracker::BufferId;

pub(crate) use node::{TaskNode, Work};
pub(crate) use tracker::{register, AccessTracker, Requirement};

use crate::error::Result;
use crate::launch::Launch;
use std::sync::Arc;

/// Where ready kernel nodes go to run.
pub(crate) trait Backend: Send + Sync {
    /// Starts `launch`. Returns the result right away when there was nothing
    /// to run; otherwise the backend must eventually call
    /// [`TaskNode::complete`] on `node`.
    fn launch(&self, node: Arc<TaskNode>, launch: Launch) -> Option<Result<()>>;

    /// Called once per node when it finishes.
    fn finished(&self, node: &TaskNode, failed: bool);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_node_without_predecessors_starts_on_arm() {
        let node = TaskNode::new("host", Work::Host, None);
        assert_eq!(node.status(), TaskStatus::Pending);

        node.arm();
        assert_eq!(node.status(), TaskStatus::Running);

        node.complete(Ok(()));
        assert_eq!(node.status(), TaskStatus::Complete);
        assert!(node.wait().is_ok());
    }

    #[test]
    fn test_dependent_waits_for_predecessor() {
        let first = TaskNode::new("first", Work::Host, None);
        first.arm();

        let second = TaskNode::new("second", Work::Host, None);
        assert!(second.add_dependency(&first, EdgeKind::Explicit));
        second.arm();
        assert_eq!(second.status(), TaskStatus::Pending);

        first.complete(Ok(()));
        assert_eq!(second.status(), TaskStatus::Running);
    }

    #[test]
    fn test_duplicate_edge_is_ignored() {
        let first = TaskNode::new("first", Work::Host, None);
        let second = TaskNode::new("second", Work::Host, None);

        assert!(second.add_dependency(&first, EdgeKind::ReadAfterWrite));
        assert!(!second.add_dependency(&first, EdgeKind::Explicit));
        assert_eq!(second.dependencies().len(), 1);
    }

    #[test]
    fn test_failure_propagates_transitively() {
        let a = TaskNode::new("a", Work::Host, None);
        let b = TaskNode::new("b", Work::Host, None);
        let c = TaskNode::new("c", Work::Host, None);
        b.add_dependency(&a, EdgeKind::ReadAfterWrite);
        c.add_dependency(&b, EdgeKind::ReadAfterWrite);
        a.arm();
        b.arm();
        c.arm();

        a.complete(Err(Error::executor("device lost")));

        assert_eq!(b.status(), TaskStatus::Failed);
        assert_eq!(
            c.wait(),
            Err(Error::DependencyFailed {
                task: c.id(),
                failed: a.id(),
            })
        );
    }

    #[test]
    fn test_failure_down_a_deep_chain_does_not_recurse() {
        let head = TaskNode::new("head", Work::Host, None);
        head.arm();

        let mut nodes = Vec::with_capacity(100_000);
        let mut prev = Arc::clone(&head);
        for _ in 0..100_000 {
            let node = TaskNode::new("link", Work::Host, None);
            node.add_dependency(&prev, EdgeKind::WriteAfterWrite);
            node.arm();
            nodes.push(Arc::clone(&node));
            prev = node;
        }

        head.complete(Err(Error::executor("device lost")));

        assert_eq!(
            prev.wait(),
            Err(Error::DependencyFailed {
                task: prev.id(),
                failed: head.id(),
            })
        );
        assert!(nodes.iter().all(|n| n.is_failed()));
    }

    #[test]
    fn test_edge_to_failed_predecessor_fails_on_arm() {
        let a = TaskNode::new("a", Work::Host, None);
        a.arm();
        a.complete(Err(Error::executor("device lost")));

        let b = TaskNode::new("b", Work::Host, None);
        assert!(b.add_dependency(&a, EdgeKind::Explicit));
        b.arm();

        assert_eq!(
            b.wait(),
            Err(Error::DependencyFailed {
                task: b.id(),
                failed: a.id(),
            })
        );
    }

    #[test]
    fn test_edge_to_completed_predecessor_is_skipped() {
        let a = TaskNode::new("a", Work::Host, None);
        a.arm();
        a.complete(Ok(()));

        let b = TaskNode::new("b", Work::Host, None);
        assert!(!b.add_dependency(&a, EdgeKind::ReadAfterWrite));
        assert!(b.dependencies().is_empty());
    }

    #[test]
    fn test_complete_is_idempotent() {
        let node = TaskNode::new("host", Work::Host, None);
        node.arm();
        node.complete(Err(Error::executor("first")));
        node.complete(Ok(()));
        assert!(node.is_failed());
    }
}
