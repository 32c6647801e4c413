//! Deferred buffers.
//!
//! A [`Buffer`] wraps a host region and mediates every access to it. Kernels
//! reach the contents through [`Accessor`]s declared on a command group; the
//! host through [`HostAccessor`]s. When the buffer goes away (drop or
//! [`Buffer::release`]) it waits for every outstanding task on it and copies
//! the final contents back into the wrapped slice.

pub mod accessor;

pub use accessor::{
    AccessMode, AccessModeMarker, Accessor, HostAccessor, Read, ReadWrite, Readable, Writable,
    Write,
};

use crate::error::Result;
use crate::graph::{AccessTracker, BufferId, Requirement};
use crate::handler::Handler;
use crate::util::element::{Cells, Element};
use std::sync::Arc;

/// A host region wrapped for use by kernels.
///
/// A buffer built with [`from_slice`](Buffer::from_slice) mutably borrows the
/// slice for its whole lifetime, so the host cannot touch the region until
/// the buffer has synchronized it back.
pub struct Buffer<'a, T: Element> {
    storage: Arc<Cells<T>>,
    tracker: Arc<AccessTracker>,
    host: Option<&'a mut [T]>,
    released: bool,
}

impl<'a, T: Element> Buffer<'a, T> {
    /// Wraps `host`; its contents are written back when the buffer is
    /// released.
    pub fn from_slice(host: &'a mut [T]) -> Self {
        let buffer = Self {
            storage: Arc::new(Cells::from_slice(host)),
            tracker: AccessTracker::new(),
            host: Some(host),
            released: false,
        };
        log::debug!("wrapped {} host elements in {:?}", buffer.len(), buffer.id());
        buffer
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }

    pub fn id(&self) -> BufferId {
        self.tracker.id()
    }

    /// Requests access in mode `M` for the command group being built.
    pub fn access<M: AccessModeMarker>(&self, handler: &mut Handler) -> Accessor<T, M> {
        handler.require(Requirement {
            tracker: Arc::clone(&self.tracker),
            mode: M::MODE,
        });
        Accessor::new(Arc::clone(&self.storage), self.id())
    }

    pub fn read(&self, handler: &mut Handler) -> Accessor<T, Read> {
        self.access(handler)
    }

    pub fn write(&self, handler: &mut Handler) -> Accessor<T, Write> {
        self.access(handler)
    }

    pub fn read_write(&self, handler: &mut Handler) -> Accessor<T, ReadWrite> {
        self.access(handler)
    }

    /// Blocks until earlier writers finish and returns a read-only host view.
    pub fn host_read(&self) -> Result<HostAccessor<'_, T, Read>> {
        HostAccessor::acquire(&self.storage, &self.tracker)
    }

    /// Blocks until every earlier task on the buffer finishes and returns a
    /// read-write host view.
    pub fn host_access(&self) -> Result<HostAccessor<'_, T, ReadWrite>> {
        HostAccessor::acquire(&self.storage, &self.tracker)
    }

    /// Waits for all outstanding tasks on the buffer and writes the contents
    /// back to the wrapped slice. Returns the first task failure, if any; the
    /// write-back happens either way.
    pub fn release(mut self) -> Result<()> {
        self.synchronize()
    }

    fn synchronize(&mut self) -> Result<()> {
        self.released = true;

        let node = accessor::acquire_host_node(&self.tracker, AccessMode::ReadWrite);
        let result = match node.error() {
            Some(err) => Err(err),
            None => Ok(()),
        };

        if let Some(host) = self.host.as_deref_mut() {
            self.storage.copy_to(host);
            log::debug!("wrote {} elements back from {:?}", host.len(), self.tracker.id());
        }

        node.complete(Ok(()));
        result
    }
}

impl<T: Element> Buffer<'static, T> {
    /// Takes ownership of `data`; read it back with
    /// [`into_vec`](Buffer::into_vec) or a host accessor.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            storage: Arc::new(Cells::from_slice(&data)),
            tracker: AccessTracker::new(),
            host: None,
            released: false,
        }
    }

    /// A buffer of `len` default-valued elements.
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self {
            storage: Arc::new(Cells::filled(len, T::default())),
            tracker: AccessTracker::new(),
            host: None,
            released: false,
        }
    }
}

impl<'a, T: Element> Buffer<'a, T> {
    /// Waits for all outstanding tasks and returns the final contents.
    pub fn into_vec(mut self) -> Result<Vec<T>> {
        self.synchronize()?;
        Ok(self.storage.to_vec())
    }
}

impl<'a, T: Element> Drop for Buffer<'a, T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.synchronize() {
            log::error!("{:?} released after failed task: {}", self.tracker.id(), err);
        }
    }
}

impl<'a, T: Element> std::fmt::Debug for Buffer<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id())
            .field("len", &self.len())
            .field("host_backed", &self.host.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_without_access() {
        let mut data = vec![3i32, 1, 4, 1, 5];
        let original = data.clone();
        {
            let buf = Buffer::from_slice(&mut data);
            assert_eq!(buf.len(), 5);
        }
        assert_eq!(data, original);
    }

    #[test]
    fn test_host_accessor_writes_reach_slice() {
        let mut data = vec![0u32; 4];
        {
            let buf = Buffer::from_slice(&mut data);
            let host = buf.host_access().unwrap();
            host.set(2, 7);
            assert_eq!(host.get(2), 7);
        }
        assert_eq!(data, vec![0, 0, 7, 0]);
    }

    #[test]
    fn test_two_host_readers_coexist() {
        let buf = Buffer::new(vec![1.5f32, 2.5]);
        let a = buf.host_read().unwrap();
        let b = buf.host_read().unwrap();
        assert_eq!(a.to_vec(), b.to_vec());
    }

    #[test]
    fn test_into_vec_and_with_len() {
        let buf: Buffer<'static, u8> = Buffer::with_len(3);
        assert_eq!(buf.into_vec().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_release_reports_ok() {
        let mut data = [1i64, 2];
        let buf = Buffer::from_slice(&mut data);
        assert!(buf.release().is_ok());
        assert_eq!(data, [1, 2]);
    }
}
