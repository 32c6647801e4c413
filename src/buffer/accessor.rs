//! Access modes and the accessors kernels and the host use to reach buffer
//! contents.

use crate::error::Result;
use crate::graph::{AccessTracker, BufferId, Requirement, TaskNode, Work};
use crate::util::element::{Cells, Element};
use std::marker::PhantomData;
use std::sync::Arc;

/// How a task uses a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(&self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn writes(&self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }

    /// The narrowest mode covering both `self` and `other`.
    pub fn merge(self, other: AccessMode) -> AccessMode {
        if self == other {
            self
        } else {
            AccessMode::ReadWrite
        }
    }
}

/// Type-level access mode of an [`Accessor`] or [`HostAccessor`].
pub trait AccessModeMarker: Send + Sync + 'static {
    const MODE: AccessMode;
}

/// Modes that allow loading elements.
pub trait Readable: AccessModeMarker {}

/// Modes that allow storing elements.
pub trait Writable: AccessModeMarker {}

/// Read-only access.
#[derive(Debug, Clone, Copy)]
pub struct Read;

/// Write-only access.
#[derive(Debug, Clone, Copy)]
pub struct Write;

/// Read and write access.
#[derive(Debug, Clone, Copy)]
pub struct ReadWrite;

impl AccessModeMarker for Read {
    const MODE: AccessMode = AccessMode::Read;
}

impl AccessModeMarker for Write {
    const MODE: AccessMode = AccessMode::Write;
}

impl AccessModeMarker for ReadWrite {
    const MODE: AccessMode = AccessMode::ReadWrite;
}

impl Readable for Read {}
impl Readable for ReadWrite {}
impl Writable for Write {}
impl Writable for ReadWrite {}

/// Grant to use one buffer inside one kernel.
///
/// Created through [`Buffer::access`](super::Buffer::access) while building a
/// command group; moved into the kernel closure. Indexing past the end of the
/// buffer panics, which fails the task.
pub struct Accessor<T: Element, M: AccessModeMarker> {
    storage: Arc<Cells<T>>,
    buffer: BufferId,
    _mode: PhantomData<M>,
}

impl<T: Element, M: AccessModeMarker> Accessor<T, M> {
    pub(crate) fn new(storage: Arc<Cells<T>>, buffer: BufferId) -> Self {
        Self {
            storage,
            buffer,
            _mode: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }

    pub fn mode(&self) -> AccessMode {
        M::MODE
    }

    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }
}

impl<T: Element, M: Readable> Accessor<T, M> {
    #[inline]
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.storage.get(index)
    }
}

impl<T: Element, M: Writable> Accessor<T, M> {
    #[inline]
    #[track_caller]
    pub fn set(&self, index: usize, value: T) {
        self.storage.set(index, value);
    }
}

impl<T: Element, M: Readable + Writable> Accessor<T, M> {
    /// Replaces element `index` with `f` applied to it.
    #[inline]
    #[track_caller]
    pub fn update<F>(&self, index: usize, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let value = self.storage.get(index);
        self.storage.set(index, f(value));
    }
}

impl<T: Element, M: AccessModeMarker> Clone for Accessor<T, M> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            buffer: self.buffer,
            _mode: PhantomData,
        }
    }
}

impl<T: Element, M: AccessModeMarker> std::fmt::Debug for Accessor<T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("buffer", &self.buffer)
            .field("mode", &M::MODE)
            .field("len", &self.len())
            .finish()
    }
}

/// Host-side view of a buffer.
///
/// Holding one orders later conflicting submissions after it; they start
/// once it is dropped.
pub struct HostAccessor<'b, T: Element, M: AccessModeMarker> {
    storage: &'b Cells<T>,
    node: Arc<TaskNode>,
    _mode: PhantomData<M>,
}

impl<'b, T: Element, M: AccessModeMarker> HostAccessor<'b, T, M> {
    /// Registers a host node on `tracker` and blocks until every earlier
    /// conflicting task has finished.
    pub(crate) fn acquire(storage: &'b Cells<T>, tracker: &Arc<AccessTracker>) -> Result<Self> {
        let node = acquire_host_node(tracker, M::MODE);
        if let Some(err) = node.error() {
            return Err(err);
        }

        Ok(Self {
            storage,
            node,
            _mode: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }
}

impl<'b, T: Element, M: Readable> HostAccessor<'b, T, M> {
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.storage.get(index)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.storage.to_vec()
    }
}

impl<'b, T: Element, M: Writable> HostAccessor<'b, T, M> {
    #[track_caller]
    pub fn set(&self, index: usize, value: T) {
        self.storage.set(index, value);
    }

    /// Overwrites the buffer from `src`; extra elements on either side are
    /// left untouched.
    pub fn copy_from_slice(&self, src: &[T]) {
        self.storage.copy_from(src);
    }
}

impl<'b, T: Element, M: AccessModeMarker> Drop for HostAccessor<'b, T, M> {
    fn drop(&mut self) {
        self.node.complete(Ok(()));
    }
}

impl<'b, T: Element, M: AccessModeMarker> std::fmt::Debug for HostAccessor<'b, T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostAccessor")
            .field("node", &self.node.id())
            .field("mode", &M::MODE)
            .field("len", &self.len())
            .finish()
    }
}

/// Registers a host node and blocks until it leaves `Pending`. The caller
/// must complete the node.
pub(crate) fn acquire_host_node(tracker: &Arc<AccessTracker>, mode: AccessMode) -> Arc<TaskNode> {
    let node = TaskNode::new("host", Work::Host, None);
    crate::graph::register(
        &node,
        &[Requirement {
            tracker: Arc::clone(tracker),
            mode,
        }],
    );
    node.arm();
    node.wait_started();
    node
}
