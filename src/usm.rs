//! Unified shared memory.
//!
//! A [`SharedAllocation`] is visible to both host and kernels without
//! accessors. Nothing tracks its use: kernels capture a clone of the handle
//! and the host must wait on the relevant events before reading results.

use crate::util::element::{Cells, Element};
use std::sync::Arc;

/// Memory shared between host and device, obtained from
/// [`Queue::malloc_shared`](crate::Queue::malloc_shared).
///
/// Cloning yields another handle to the same memory.
pub struct SharedAllocation<T: Element> {
    cells: Arc<Cells<T>>,
}

impl<T: Element> SharedAllocation<T> {
    pub(crate) fn zeroed(len: usize) -> Self
    where
        T: Default,
    {
        Self {
            cells: Arc::new(Cells::filled(len, T::default())),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.len() == 0
    }

    /// Size of the allocation in bytes.
    pub fn size_bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<T>()
    }

    #[inline]
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.cells.get(index)
    }

    #[inline]
    #[track_caller]
    pub fn set(&self, index: usize, value: T) {
        self.cells.set(index, value);
    }

    #[inline]
    #[track_caller]
    pub fn update<F>(&self, index: usize, f: F)
    where
        F: FnOnce(T) -> T,
    {
        self.cells.set(index, f(self.cells.get(index)));
    }

    pub fn copy_from_slice(&self, src: &[T]) {
        self.cells.copy_from(src);
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.cells.to_vec()
    }

    /// Handles that still point at this memory, this one included.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.cells)
    }
}

impl<T: Element> Clone for SharedAllocation<T> {
    fn clone(&self) -> Self {
        Self {
            cells: Arc::clone(&self.cells),
        }
    }
}

impl<T: Element> std::fmt::Debug for SharedAllocation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedAllocation")
            .field("len", &self.len())
            .field("handles", &self.handle_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_and_shared() {
        let alloc: SharedAllocation<i32> = SharedAllocation::zeroed(4);
        assert_eq!(alloc.to_vec(), vec![0; 4]);
        assert_eq!(alloc.size_bytes(), 16);

        let other = alloc.clone();
        other.set(1, 5);
        assert_eq!(alloc.get(1), 5);
        assert_eq!(alloc.handle_count(), 2);
    }

    #[test]
    fn test_update_and_copy() {
        let alloc: SharedAllocation<f32> = SharedAllocation::zeroed(3);
        alloc.copy_from_slice(&[1.0, 2.0, 3.0]);
        alloc.update(2, |x| x * 2.0);
        assert_eq!(alloc.to_vec(), vec![1.0, 2.0, 6.0]);
    }
}
