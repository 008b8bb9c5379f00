use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::SourceLocation;

/// Bookkeeping for one outstanding allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocationRecord {
    /// User-visible address.
    pub address: usize,
    /// Size requested by the caller, guard regions excluded.
    pub size: usize,
    pub alignment: usize,
    /// Call site, when the block was allocated through the tracked path.
    pub source: Option<SourceLocation>,
}

/// Per-allocation bookkeeping attached to an arena.
pub trait TrackingPolicy: Default {
    type Records<'a>: Iterator<Item = &'a AllocationRecord>
    where
        Self: 'a;

    /// `false` for policies that record nothing; arenas then skip live-set validation.
    const ENABLED: bool;

    fn on_allocation(&mut self, record: AllocationRecord);

    /// Returns `true` if `address` is currently live. Only meaningful when [`Self::ENABLED`].
    fn is_live(&self, address: usize) -> bool;

    /// Forgets `address`, returning its record.
    fn on_deallocation(&mut self, address: usize) -> Option<AllocationRecord>;

    fn on_clear(&mut self);

    /// Live records in insertion order. Each call starts a fresh pass.
    fn records(&self) -> Self::Records<'_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTracking;

impl TrackingPolicy for NoTracking {
    type Records<'a> = std::iter::Empty<&'a AllocationRecord>;

    const ENABLED: bool = false;

    #[inline(always)]
    fn on_allocation(&mut self, _record: AllocationRecord) {}

    #[inline(always)]
    fn is_live(&self, _address: usize) -> bool {
        true
    }

    #[inline(always)]
    fn on_deallocation(&mut self, _address: usize) -> Option<AllocationRecord> {
        None
    }

    #[inline(always)]
    fn on_clear(&mut self) {}

    #[inline(always)]
    fn records(&self) -> Self::Records<'_> {
        std::iter::empty()
    }

    #[inline(always)]
    fn len(&self) -> usize {
        0
    }
}

/// Table of live allocations keyed by user address.
///
/// Removal preserves the insertion order of the remaining records, so leak
/// reports list blocks in the order they were allocated.
#[derive(Debug, Default)]
pub struct AllocationTable {
    live: IndexMap<usize, AllocationRecord, FxBuildHasher>,
}

impl AllocationTable {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            live: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    #[must_use]
    pub fn get(&self, address: usize) -> Option<&AllocationRecord> {
        self.live.get(&address)
    }
}

impl TrackingPolicy for AllocationTable {
    type Records<'a> = indexmap::map::Values<'a, usize, AllocationRecord>;

    const ENABLED: bool = true;

    #[inline]
    fn on_allocation(&mut self, record: AllocationRecord) {
        let previous = self.live.insert(record.address, record);
        debug_assert!(
            previous.is_none(),
            "Address {:#x} handed out twice",
            record.address
        );
    }

    #[inline]
    fn is_live(&self, address: usize) -> bool {
        self.live.contains_key(&address)
    }

    #[inline]
    fn on_deallocation(&mut self, address: usize) -> Option<AllocationRecord> {
        self.live.shift_remove(&address)
    }

    #[inline]
    fn on_clear(&mut self) {
        self.live.clear();
    }

    #[inline]
    fn records(&self) -> Self::Records<'_> {
        self.live.values()
    }

    #[inline]
    fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: usize, size: usize, line: u32) -> AllocationRecord {
        AllocationRecord {
            address,
            size,
            alignment: 8,
            source: Some(SourceLocation::new("world/chunk.rs", line)),
        }
    }

    #[test]
    fn test_table_insertion_order_survives_removal() {
        let mut table = AllocationTable::default();
        table.on_allocation(record(0x100, 16, 1));
        table.on_allocation(record(0x200, 32, 2));
        table.on_allocation(record(0x300, 64, 3));

        assert_eq!(table.on_deallocation(0x200).map(|r| r.size), Some(32));

        let addresses: Vec<_> = table.records().map(|r| r.address).collect();
        assert_eq!(addresses, vec![0x100, 0x300]);

        // Restartable.
        assert_eq!(table.records().count(), 2);
    }

    #[test]
    fn test_table_unknown_address() {
        let mut table = AllocationTable::with_capacity(4);
        table.on_allocation(record(0x100, 16, 1));

        assert!(table.is_live(0x100));
        assert!(!table.is_live(0x108));
        assert_eq!(table.on_deallocation(0x108), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_clear() {
        let mut table = AllocationTable::default();
        table.on_allocation(record(0x100, 16, 1));
        table.on_clear();

        assert!(table.is_empty());
        assert_eq!(table.get(0x100), None);
    }

    #[test]
    fn test_no_tracking_records_nothing() {
        let mut tracking = NoTracking;
        tracking.on_allocation(record(0x100, 16, 1));

        assert_eq!(tracking.len(), 0);
        assert_eq!(tracking.records().count(), 0);
    }
}
