use std::{
    mem::{align_of, size_of},
    ptr::{self, NonNull},
};

use crate::{
    AllocError, BackingRegion,
    utils::{align_up, align_with_offset, checked_align_up, validate_request},
};

use super::AllocationAlgorithm;

/// How a [`FreeListAlgorithm`] picks among the free blocks that can hold a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitPolicy {
    /// Lowest-addressed block that fits. Predictable latency.
    #[default]
    FirstFit,
    /// Smallest block that fits, lowest address on ties. Less fragmentation, always scans the whole list.
    BestFit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FreeListConfig {
    pub fit: FitPolicy,
}

impl FreeListConfig {
    #[must_use]
    pub const fn new(fit: FitPolicy) -> Self {
        Self { fit }
    }
}

/// In-band header of a free block. Free blocks always start on a `BLOCK_ALIGN` boundary.
#[repr(C)]
struct FreeBlock {
    size: usize,
    prev: *mut FreeBlock,
    next: *mut FreeBlock,
}

/// Written directly in front of every live block, not necessarily aligned.
#[derive(Clone, Copy)]
#[repr(C)]
struct AllocHeader {
    /// Bytes taken from the free list, starting at `ptr - padding`.
    block_size: usize,
    padding: usize,
    requested: usize,
}

const BLOCK_ALIGN: usize = align_of::<FreeBlock>();
const MIN_BLOCK: usize = size_of::<FreeBlock>();
const HEADER_SIZE: usize = size_of::<AllocHeader>();

/// Variable-size allocator over an address-ordered, doubly linked list of free blocks.
///
/// Oversized blocks are split, keeping the remainder free as long as it can hold a
/// free block header. Released blocks are merged with adjacent free neighbours.
pub struct FreeListAlgorithm<'a> {
    region: BackingRegion<'a>,
    head: *mut FreeBlock,
    /// First and one-past-last usable address, both `BLOCK_ALIGN` aligned.
    start: usize,
    end: usize,
    /// Bytes reserved by live blocks, headers and padding included.
    reserved: usize,
    fit: FitPolicy,
}

// SAFETY: the algorithm exclusively owns access to its region.
unsafe impl Send for FreeListAlgorithm<'_> {}

impl<'a> FreeListAlgorithm<'a> {
    /// Per-block bookkeeping placed in front of each allocation.
    pub const HEADER_SIZE: usize = HEADER_SIZE;

    #[must_use]
    pub fn new(region: BackingRegion<'a>, config: FreeListConfig) -> Self {
        let start = align_up(region.base_addr(), BLOCK_ALIGN).min(region.end_addr());
        let end = region.end_addr() & !(BLOCK_ALIGN - 1);
        let end = end.max(start);

        let mut algorithm = Self {
            region,
            head: ptr::null_mut(),
            start,
            end,
            reserved: 0,
            fit: config.fit,
        };

        algorithm.reset();
        algorithm
    }

    #[inline(always)]
    #[must_use]
    pub const fn fit_policy(&self) -> FitPolicy {
        self.fit
    }

    /// Number of disjoint free blocks, a measure of fragmentation.
    #[must_use]
    pub fn free_block_count(&self) -> usize {
        self.free_blocks().count()
    }

    /// Size of the largest free block, headers included.
    #[must_use]
    pub fn largest_free_block(&self) -> usize {
        self.free_blocks().map(|(_, size)| size).max().unwrap_or(0)
    }

    fn reset(&mut self) {
        self.reserved = 0;

        if self.end - self.start < MIN_BLOCK {
            self.head = ptr::null_mut();
            return;
        }

        let block = self.block_at(self.start);
        unsafe {
            block.write(FreeBlock {
                size: self.end - self.start,
                prev: ptr::null_mut(),
                next: ptr::null_mut(),
            });
        }
        self.head = block;
    }

    #[inline(always)]
    fn block_at(&self, address: usize) -> *mut FreeBlock {
        debug_assert_eq!(address % BLOCK_ALIGN, 0, "Misaligned free block");
        self.region.ptr_at(address).cast::<FreeBlock>().as_ptr()
    }

    /// `(address, size)` of every free block, in address order.
    fn free_blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mut current = self.head;
        std::iter::from_fn(move || {
            if current.is_null() {
                return None;
            }
            let block = current;
            unsafe {
                current = (*block).next;
                Some((block as usize, (*block).size))
            }
        })
    }

    /// Offset of the user block inside a free block and the bytes it would consume.
    #[inline(always)]
    fn fit_in(
        block: usize,
        block_size: usize,
        size: usize,
        alignment: usize,
        offset: usize,
    ) -> Option<(usize, usize)> {
        let ptr = align_with_offset(block + HEADER_SIZE, alignment, offset)?;
        let padding = ptr - block;
        let needed = checked_align_up(padding.checked_add(size)?, BLOCK_ALIGN)?;

        (needed <= block_size).then_some((padding, needed))
    }

    fn find_block(
        &self,
        size: usize,
        alignment: usize,
        offset: usize,
    ) -> Option<(*mut FreeBlock, usize, usize)> {
        let mut best: Option<(*mut FreeBlock, usize, usize, usize)> = None;
        let mut current = self.head;

        while !current.is_null() {
            let (block_size, next) = unsafe { ((*current).size, (*current).next) };

            if let Some((padding, needed)) =
                Self::fit_in(current as usize, block_size, size, alignment, offset)
            {
                match self.fit {
                    FitPolicy::FirstFit => return Some((current, padding, needed)),
                    FitPolicy::BestFit => {
                        if block_size == needed {
                            return Some((current, padding, needed));
                        }
                        if best.is_none_or(|(_, best_size, _, _)| block_size < best_size) {
                            best = Some((current, block_size, padding, needed));
                        }
                    }
                }
            }

            current = next;
        }

        best.map(|(block, _, padding, needed)| (block, padding, needed))
    }

    /// Links `block` between `prev` and `next`.
    unsafe fn link(&mut self, block: *mut FreeBlock, prev: *mut FreeBlock, next: *mut FreeBlock) {
        unsafe {
            (*block).prev = prev;
            (*block).next = next;

            if prev.is_null() {
                self.head = block;
            } else {
                (*prev).next = block;
            }

            if !next.is_null() {
                (*next).prev = block;
            }
        }
    }

    unsafe fn unlink(&mut self, block: *mut FreeBlock) {
        unsafe {
            let prev = (*block).prev;
            let next = (*block).next;

            if prev.is_null() {
                self.head = next;
            } else {
                (*prev).next = next;
            }

            if !next.is_null() {
                (*next).prev = prev;
            }
        }
    }

    #[inline(always)]
    fn read_header(&self, address: usize) -> AllocHeader {
        let ptr = self.region.ptr_at(address - HEADER_SIZE);
        unsafe { ptr.cast::<AllocHeader>().as_ptr().read_unaligned() }
    }

    fn header_is_plausible(&self, address: usize, header: &AllocHeader) -> bool {
        let Some(block_start) = address.checked_sub(header.padding) else {
            return false;
        };

        header.padding >= HEADER_SIZE
            && header.requested > 0
            && block_start >= self.start
            && block_start % BLOCK_ALIGN == 0
            && header.block_size >= MIN_BLOCK
            && header.block_size % BLOCK_ALIGN == 0
            && header.padding.saturating_add(header.requested) <= header.block_size
            && block_start.saturating_add(header.block_size) <= self.end
    }
}

unsafe impl AllocationAlgorithm for FreeListAlgorithm<'_> {
    const NAME: &'static str = "free-list";

    fn allocate(
        &mut self,
        size: usize,
        alignment: usize,
        offset: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        validate_request(size, alignment)?;

        let Some((block, padding, needed)) = self.find_block(size, alignment, offset) else {
            return Err(AllocError::Exhaustion {
                requested: size,
                available: self.free_space(),
            });
        };

        let block_address = block as usize;
        let block_size = unsafe { (*block).size };
        let remainder = block_size - needed;

        let taken = if remainder >= MIN_BLOCK {
            let rest = self.block_at(block_address + needed);
            unsafe {
                let (prev, next) = ((*block).prev, (*block).next);
                rest.write(FreeBlock {
                    size: remainder,
                    prev: ptr::null_mut(),
                    next: ptr::null_mut(),
                });
                self.link(rest, prev, next);
            }
            needed
        } else {
            unsafe { self.unlink(block) };
            block_size
        };

        let address = block_address + padding;
        let header = AllocHeader {
            block_size: taken,
            padding,
            requested: size,
        };

        let header_ptr = self.region.ptr_at(address - HEADER_SIZE);
        unsafe { header_ptr.cast::<AllocHeader>().as_ptr().write_unaligned(header) };

        self.reserved += taken;

        Ok(self.region.ptr_at(address))
    }

    fn validate_deallocation(&self, ptr: NonNull<u8>) -> Result<usize, AllocError> {
        let address = ptr.as_ptr() as usize;

        if !self.region.contains(address) {
            return Err(AllocError::NotOwned { address });
        }

        if address < self.start + HEADER_SIZE || address >= self.end {
            return Err(AllocError::NotLive { address });
        }

        let header = self.read_header(address);
        if !self.header_is_plausible(address, &header) {
            return Err(AllocError::NotLive { address });
        }

        let block_start = address - header.padding;
        let block_end = block_start + header.block_size;

        let overlaps_free = self
            .free_blocks()
            .take_while(|&(free, _)| free < block_end)
            .any(|(free, size)| block_start < free + size);

        if overlaps_free {
            return Err(AllocError::DoubleFree { address });
        }

        Ok(header.requested)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>) {
        let address = ptr.as_ptr() as usize;
        let header = self.read_header(address);

        let block_start = address - header.padding;
        let mut block_size = header.block_size;

        self.reserved -= block_size;

        // Find the free neighbours surrounding the released block.
        let mut prev: *mut FreeBlock = ptr::null_mut();
        let mut next = self.head;
        while !next.is_null() && (next as usize) < block_start {
            prev = next;
            next = unsafe { (*next).next };
        }

        // Merge with the following block.
        if !next.is_null() && block_start + block_size == next as usize {
            unsafe {
                block_size += (*next).size;
                let after = (*next).next;
                self.unlink(next);
                next = after;
            }
        }

        // Merge into the preceding block, or insert a new one.
        if !prev.is_null() && prev as usize + unsafe { (*prev).size } == block_start {
            unsafe {
                (*prev).size += block_size;
                (*prev).next = next;
                if !next.is_null() {
                    (*next).prev = prev;
                }
            }
        } else {
            let block = self.block_at(block_start);
            unsafe {
                block.write(FreeBlock {
                    size: block_size,
                    prev: ptr::null_mut(),
                    next: ptr::null_mut(),
                });
                self.link(block, prev, next);
            }
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.reset();
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
        self.end - self.start - self.reserved
    }
}
