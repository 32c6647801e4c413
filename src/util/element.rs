//! Element types that can live in device-side storage.
//!
//! Storage is a slice of atomic cells so that work items running on
//! different workers may touch distinct elements concurrently. Loads and
//! stores are relaxed; ordering between tasks comes from node completion.

use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicU16, AtomicU32,
    AtomicU64, AtomicU8, AtomicUsize, Ordering,
};

/// A plain scalar usable as a buffer or shared-allocation element.
pub trait Element: Copy + Send + Sync + 'static {
    /// Atomic cell holding one element.
    type Cell: Send + Sync;

    fn new_cell(value: Self) -> Self::Cell;

    fn load(cell: &Self::Cell) -> Self;

    fn store(cell: &Self::Cell, value: Self);
}

macro_rules! impl_element_int {
    ($($ty:ty => $atomic:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                type Cell = $atomic;

                #[inline]
                fn new_cell(value: Self) -> Self::Cell {
                    <$atomic>::new(value)
                }

                #[inline]
                fn load(cell: &Self::Cell) -> Self {
                    cell.load(Ordering::Relaxed)
                }

                #[inline]
                fn store(cell: &Self::Cell, value: Self) {
                    cell.store(value, Ordering::Relaxed);
                }
            }
        )*
    };
}

impl_element_int! {
    i8 => AtomicI8,
    i16 => AtomicI16,
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
    bool => AtomicBool,
}

// floats are stored by their bit pattern
macro_rules! impl_element_float {
    ($($ty:ty => $atomic:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                type Cell = $atomic;

                #[inline]
                fn new_cell(value: Self) -> Self::Cell {
                    <$atomic>::new(value.to_bits())
                }

                #[inline]
                fn load(cell: &Self::Cell) -> Self {
                    <$ty>::from_bits(cell.load(Ordering::Relaxed))
                }

                #[inline]
                fn store(cell: &Self::Cell, value: Self) {
                    cell.store(value.to_bits(), Ordering::Relaxed);
                }
            }
        )*
    };
}

impl_element_float! {
    f32 => AtomicU32,
    f64 => AtomicU64,
}

/// Fixed-length run of element cells shared by buffers and USM allocations.
pub(crate) struct Cells<T: Element> {
    cells: Box<[T::Cell]>,
}

impl<T: Element> Cells<T> {
    pub(crate) fn from_slice(values: &[T]) -> Self {
        Self {
            cells: values.iter().map(|&v| T::new_cell(v)).collect(),
        }
    }

    pub(crate) fn filled(len: usize, value: T) -> Self {
        Self {
            cells: (0..len).map(|_| T::new_cell(value)).collect(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    #[track_caller]
    pub(crate) fn get(&self, index: usize) -> T {
        T::load(self.cell(index))
    }

    #[inline]
    #[track_caller]
    pub(crate) fn set(&self, index: usize, value: T) {
        T::store(self.cell(index), value);
    }

    pub(crate) fn copy_to(&self, dst: &mut [T]) {
        for (d, cell) in dst.iter_mut().zip(self.cells.iter()) {
            *d = T::load(cell);
        }
    }

    pub(crate) fn copy_from(&self, src: &[T]) {
        for (cell, &s) in self.cells.iter().zip(src.iter()) {
            T::store(cell, s);
        }
    }

    pub(crate) fn to_vec(&self) -> Vec<T> {
        self.cells.iter().map(T::load).collect()
    }

    #[inline]
    #[track_caller]
    fn cell(&self, index: usize) -> &T::Cell {
        match self.cells.get(index) {
            Some(cell) => cell,
            None => panic!(
                "index out of bounds: the len is {} but the index is {}",
                self.cells.len(),
                index
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_cells() {
        let cells = Cells::from_slice(&[1i32, 2, 3]);
        assert_eq!(cells.len(), 3);
        cells.set(1, 20);
        assert_eq!(cells.to_vec(), vec![1, 20, 3]);
    }

    #[test]
    fn test_float_cells_keep_bits() {
        let cells = Cells::filled(2, -0.0f64);
        assert!(cells.get(0).is_sign_negative());
        cells.set(1, 3.14);
        assert_eq!(cells.get(1), 3.14);
    }

    #[test]
    fn test_copy_to_and_from() {
        let cells = Cells::filled(4, 0u8);
        cells.copy_from(&[9, 8, 7, 6]);
        let mut out = [0u8; 4];
        cells.copy_to(&mut out);
        assert_eq!(out, [9, 8, 7, 6]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_out_of_bounds_panics() {
        let cells = Cells::filled(1, false);
        cells.get(1);
    }
}
