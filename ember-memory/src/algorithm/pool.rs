use std::{mem::size_of, ptr::NonNull};

use crate::{
    AllocError, BackingRegion,
    utils::{align_up, validate_request},
};

use super::AllocationAlgorithm;

/// Slot geometry of a [`PoolAlgorithm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Largest block a slot can hold.
    pub slot_size: usize,
    /// Alignment of every slot, and the largest alignment a request may ask for.
    pub slot_alignment: usize,
}

impl PoolConfig {
    #[must_use]
    pub const fn new(slot_size: usize, slot_alignment: usize) -> Self {
        Self {
            slot_size,
            slot_alignment,
        }
    }

    /// Slots sized and aligned for values of type `T`.
    #[must_use]
    pub const fn for_type<T>() -> Self {
        Self::new(size_of::<T>(), std::mem::align_of::<T>())
    }

    /// Alignment actually used; slots must be able to hold a free list link.
    #[inline(always)]
    const fn effective_alignment(&self) -> usize {
        let ptr_align = std::mem::align_of::<*mut u8>();

        if self.slot_alignment < ptr_align {
            ptr_align
        } else {
            self.slot_alignment
        }
    }

    /// Slot stride actually used.
    #[inline(always)]
    const fn effective_size(&self) -> usize {
        let min_size = size_of::<*mut u8>();
        let size = if self.slot_size < min_size {
            min_size
        } else {
            self.slot_size
        };

        align_up(size, self.effective_alignment())
    }
}

/// Fixed-size slot allocator.
///
/// The region is partitioned into equally sized slots starting at the first
/// slot-aligned address. Free slots form an intrusive singly linked list; slots
/// that were never handed out are taken from a bump index, so construction and
/// [`clear`](AllocationAlgorithm::clear) do not have to touch the region.
pub struct PoolAlgorithm<'a> {
    region: BackingRegion<'a>,
    free_blocks: *mut u8,
    next: usize,
    capacity: usize,
    first_slot: usize,
    slot_size: usize,
    slot_alignment: usize,
    /// Size requested for each slot, 0 while the slot is free.
    sizes: Box<[usize]>,
    live: usize,
}

// SAFETY: the algorithm exclusively owns access to its region.
unsafe impl Send for PoolAlgorithm<'_> {}

impl<'a> PoolAlgorithm<'a> {
    /// Partitions `region` into slots described by `config`.
    ///
    /// # Panics
    /// - If the slot alignment is not a power of two.
    /// - If the slot size is 0.
    /// - If the region cannot hold a single slot.
    #[must_use]
    pub fn new(region: BackingRegion<'a>, config: PoolConfig) -> Self {
        assert!(
            config.slot_alignment.is_power_of_two(),
            "Slot alignment must be a power of two"
        );
        assert!(config.slot_size > 0, "Slot size must be greater than 0");

        let slot_alignment = config.effective_alignment();
        let slot_size = config.effective_size();

        let first_slot = align_up(region.base_addr(), slot_alignment);
        let usable = region.end_addr().saturating_sub(first_slot);
        let capacity = usable / slot_size;

        assert!(capacity > 0, "Region too small for a single slot");

        Self {
            region,
            free_blocks: std::ptr::null_mut(),
            next: 0,
            capacity,
            first_slot,
            slot_size,
            slot_alignment,
            sizes: vec![0; capacity].into_boxed_slice(),
            live: 0,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn slot_size(&self) -> usize {
        self.slot_size
    }

    #[inline(always)]
    #[must_use]
    pub const fn slot_alignment(&self) -> usize {
        self.slot_alignment
    }

    /// Total number of slots.
    #[inline(always)]
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    #[must_use]
    pub const fn free_slots(&self) -> usize {
        self.capacity - self.live
    }

    /// Maps an address to its slot index, if it is the start of a slot that was ever handed out.
    #[inline(always)]
    fn slot_index(&self, address: usize) -> Option<usize> {
        let offset = address.checked_sub(self.first_slot)?;

        if offset % self.slot_size != 0 {
            return None;
        }

        let index = offset / self.slot_size;
        (index < self.next).then_some(index)
    }

    #[inline(always)]
    fn ptr_to_index(&self, ptr: *mut u8) -> usize {
        (ptr as usize - self.first_slot) / self.slot_size
    }

    #[inline(always)]
    fn index_to_ptr(&self, index: usize) -> NonNull<u8> {
        self.region.ptr_at(self.first_slot + index * self.slot_size)
    }
}

unsafe impl AllocationAlgorithm for PoolAlgorithm<'_> {
    const NAME: &'static str = "pool";

    fn allocate(
        &mut self,
        size: usize,
        alignment: usize,
        offset: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        validate_request(size, alignment)?;

        if size > self.slot_size {
            return Err(AllocError::RequestTooLarge {
                requested: size,
                limit: self.slot_size,
            });
        }

        if alignment > self.slot_alignment || offset % alignment != 0 {
            return Err(AllocError::InvalidAlignment { alignment });
        }

        let ptr = if !self.free_blocks.is_null() {
            let ptr = self.free_blocks;
            self.free_blocks = unsafe { *(ptr as *mut *mut u8) };

            // SAFETY: links only ever point at slots of this region.
            unsafe { NonNull::new_unchecked(ptr) }
        } else if self.next < self.capacity {
            let index = self.next;
            self.next += 1;
            self.index_to_ptr(index)
        } else {
            return Err(AllocError::Exhaustion {
                requested: size,
                available: 0,
            });
        };

        let index = self.ptr_to_index(ptr.as_ptr());

        debug_assert!(
            index < self.capacity,
            "Slot index out of bounds index: {} capacity: {}",
            index,
            self.capacity
        );
        debug_assert_eq!(self.sizes[index], 0, "Slot handed out twice");

        self.sizes[index] = size;
        self.live += 1;

        Ok(ptr)
    }

    fn validate_deallocation(&self, ptr: NonNull<u8>) -> Result<usize, AllocError> {
        let address = ptr.as_ptr() as usize;

        if !self.region.contains(address) {
            return Err(AllocError::NotOwned { address });
        }

        let Some(index) = self.slot_index(address) else {
            return Err(AllocError::NotLive { address });
        };

        match self.sizes[index] {
            0 => Err(AllocError::DoubleFree { address }),
            size => Ok(size),
        }
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>) {
        let index = self.ptr_to_index(ptr.as_ptr());
        debug_assert!(index < self.capacity, "Slot index out of bounds");

        self.sizes[index] = 0;
        self.live -= 1;

        unsafe {
            *(ptr.as_ptr() as *mut *mut u8) = self.free_blocks;
        }
        self.free_blocks = ptr.as_ptr();
    }

    fn clear(&mut self) {
        self.sizes[..self.next].fill(0);
        self.free_blocks = std::ptr::null_mut();
        self.next = 0;
        self.live = 0;
    }

    #[inline(always)]
    fn can_deallocate(&self) -> bool {
        true
    }

    #[inline(always)]
    fn owns(&self, address: usize) -> bool {
        self.region.contains(address)
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.region.size()
    }

    #[inline(always)]
    fn free_space(&self) -> usize {
        self.free_slots() * self.slot_size
    }
}
