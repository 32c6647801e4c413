//! Index spaces for kernel launches.
//!
//! All launches are one-dimensional: a flat [`Range`] of work items, or an
//! [`NdRange`] that partitions the global range into equally sized
//! work-groups.

use crate::error::{Error, Result};

/// A flat index space of `len` work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    len: usize,
}

impl Range {
    pub const fn new(len: usize) -> Self {
        Self { len }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl From<usize> for Range {
    fn from(len: usize) -> Self {
        Range::new(len)
    }
}

/// A global index space split into work-groups of `local` items.
///
/// Construction fails when the group size is zero or does not evenly divide
/// the global size; the device limit is checked at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NdRange {
    global: usize,
    local: usize,
}

impl NdRange {
    pub fn new(global: usize, local: usize) -> Result<Self> {
        if local == 0 {
            return Err(Error::nd_range(global, local, "work-group size must be > 0"));
        }
        if global % local != 0 {
            return Err(Error::nd_range(
                global,
                local,
                "work-group size must evenly divide the global size",
            ));
        }
        Ok(Self { global, local })
    }

    pub fn global(&self) -> usize {
        self.global
    }

    pub fn local(&self) -> usize {
        self.local
    }

    pub fn groups(&self) -> usize {
        self.global / self.local
    }

    pub(crate) fn check_device_limit(&self, max_work_group_size: usize) -> Result<()> {
        if self.local > max_work_group_size {
            return Err(Error::nd_range(
                self.global,
                self.local,
                format!("work-group size exceeds device limit {}", max_work_group_size),
            ));
        }
        Ok(())
    }
}

/// A work item of a flat launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    id: usize,
    range: usize,
}

impl Item {
    pub(crate) fn new(id: usize, range: usize) -> Self {
        Self { id, range }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn range(&self) -> usize {
        self.range
    }
}

/// A work item of a grouped launch, aware of its group and local position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdItem {
    group: usize,
    local_id: usize,
    nd_range: NdRange,
}

impl NdItem {
    pub(crate) fn new(group: usize, local_id: usize, nd_range: NdRange) -> Self {
        Self {
            group,
            local_id,
            nd_range,
        }
    }

    pub fn global_id(&self) -> usize {
        self.group * self.nd_range.local + self.local_id
    }

    pub fn local_id(&self) -> usize {
        self.local_id
    }

    pub fn group_id(&self) -> usize {
        self.group
    }

    pub fn global_range(&self) -> usize {
        self.nd_range.global
    }

    pub fn local_range(&self) -> usize {
        self.nd_range.local
    }

    pub fn group_range(&self) -> usize {
        self.nd_range.groups()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nd_range_divisible() {
        let nd = NdRange::new(256, 64).unwrap();
        assert_eq!(nd.groups(), 4);
        assert!(nd.check_device_limit(1024).is_ok());
    }

    #[test]
    fn test_nd_range_not_divisible() {
        let err = NdRange::new(100, 64).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidNdRange {
                global: 100,
                local: 64,
                ..
            }
        ));
    }

    #[test]
    fn test_nd_range_zero_group() {
        assert!(NdRange::new(16, 0).is_err());
    }

    #[test]
    fn test_nd_range_device_limit() {
        let nd = NdRange::new(2048, 2048).unwrap();
        assert!(nd.check_device_limit(1024).is_err());
    }

    #[test]
    fn test_nd_item_positions() {
        let nd = NdRange::new(12, 4).unwrap();
        let item = NdItem::new(2, 1, nd);
        assert_eq!(item.global_id(), 9);
        assert_eq!(item.local_id(), 1);
        assert_eq!(item.group_id(), 2);
        assert_eq!(item.group_range(), 3);
        assert_eq!(item.global_range(), 12);
        assert_eq!(item.local_range(), 4);
    }
}
