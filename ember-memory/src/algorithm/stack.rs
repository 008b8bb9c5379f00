use std::{mem::size_of, ptr::NonNull};

use crate::{
    AllocError, BackingRegion,
    utils::{align_with_offset, validate_request},
};

use super::AllocationAlgorithm;

/// Written directly in front of every block, not necessarily aligned.
#[derive(Clone, Copy)]
#[repr(C)]
struct StackHeader {
    /// Cursor before the block was carved, restored on release.
    marker: usize,
    /// Address of the block below this one, 0 for the bottom of the stack.
    previous_top: usize,
    size: usize,
}

const HEADER_SIZE: usize = size_of::<StackHeader>();

/// Linear allocator that can release its most recent block.
///
/// Releases must happen in strict reverse order of allocation; anything else is
/// rejected with [`AllocError::OutOfOrder`].
pub struct StackAlgorithm<'a> {
    region: BackingRegion<'a>,
    cursor: usize,
    top: usize,
}

// SAFETY: the algorithm exclusively owns access to its region.
unsafe impl Send for StackAlgorithm<'_> {}

impl<'a> StackAlgorithm<'a> {
    /// Per-block bookkeeping placed in front of each allocation.
    pub const HEADER_SIZE: usize = HEADER_SIZE;

    #[must_use]
    pub fn new(region: BackingRegion<'a>) -> Self {
        Self {
            region,
            cursor: 0,
            top: 0,
        }
    }

    /// Address of the block that has to be released next, if any.
    #[inline(always)]
    #[must_use]
    pub fn top(&self) -> Option<usize> {
        (self.top != 0).then_some(self.top)
    }

    #[inline(always)]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline(always)]
    fn read_header(&self, address: usize) -> StackHeader {
        debug_assert!(self.region.contains_range(address - HEADER_SIZE, HEADER_SIZE));

        let ptr = self.region.ptr_at(address - HEADER_SIZE);
        unsafe { ptr.cast::<StackHeader>().as_ptr().read_unaligned() }
    }

    /// Walks the chain of live blocks below the top looking for `address`.
    fn is_buried(&self, address: usize) -> bool {
        let mut current = self.top;
        while current != 0 {
            if current == address {
                return true;
            }
            current = self.read_header(current).previous_top;
        }
        false
    }
}

unsafe impl AllocationAlgorithm for StackAlgorithm<'_> {
    const NAME: &'static str = "stack";

    fn allocate(
        &mut self,
        size: usize,
        alignment: usize,
        offset: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        validate_request(size, alignment)?;

        let current = self.region.base_addr() + self.cursor;
        let exhausted = AllocError::Exhaustion {
            requested: size,
            available: self.free_space(),
        };

        let start = align_with_offset(current + HEADER_SIZE, alignment, offset)
            .ok_or(exhausted.clone())?;
        let end = start.checked_add(size).ok_or(exhausted.clone())?;

        if end > self.region.end_addr() {
            return Err(exhausted);
        }

        let header = StackHeader {
            marker: self.cursor,
            previous_top: self.top,
            size,
        };

        let header_ptr = self.region.ptr_at(start - HEADER_SIZE);
        unsafe { header_ptr.cast::<StackHeader>().as_ptr().write_unaligned(header) };

        self.top = start;
        self.cursor = end - self.region.base_addr();

        Ok(self.region.ptr_at(start))
    }

    fn validate_deallocation(&self, ptr: NonNull<u8>) -> Result<usize, AllocError> {
        let address = ptr.as_ptr() as usize;

        if !self.region.contains(address) {
            return Err(AllocError::NotOwned { address });
        }

        if address == self.top && self.top != 0 {
            return Ok(self.read_header(address).size);
        }

        if self.is_buried(address) {
            Err(AllocError::OutOfOrder {
                address,
                top: self.top,
            })
        } else {
            Err(AllocError::NotLive { address })
        }
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>) {
        let address = ptr.as_ptr() as usize;
        debug_assert_eq!(address, self.top, "Out of order stack deallocation");

        let header = self.read_header(address);
        self.cursor = header.marker;
        self.top = header.previous_top;
    }

    #[inline]
    fn clear(&mut self) {
        self.cursor = 0;
        self.top = 0;
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
        self.region.size() - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapRegion;

    #[test]
    fn test_stack_lifo() {
        let mut heap = HeapRegion::new(256);
        let mut stack = StackAlgorithm::new(heap.region());

        let a = stack.allocate(16, 8, 0).unwrap();
        let cursor_after_a = stack.cursor();
        let b = stack.allocate(32, 16, 0).unwrap();

        assert_eq!(b.as_ptr() as usize % 16, 0);
        assert_eq!(stack.top(), Some(b.as_ptr() as usize));

        assert_eq!(stack.validate_deallocation(b), Ok(32));
        unsafe { stack.deallocate(b) };
        assert_eq!(stack.cursor(), cursor_after_a);

        assert_eq!(stack.validate_deallocation(a), Ok(16));
        unsafe { stack.deallocate(a) };
        assert_eq!(stack.cursor(), 0);
        assert_eq!(stack.top(), None);
    }

    #[test]
    fn test_stack_out_of_order() {
        let mut heap = HeapRegion::new(256);
        let mut stack = StackAlgorithm::new(heap.region());

        let a = stack.allocate(16, 8, 0).unwrap();
        let b = stack.allocate(16, 8, 0).unwrap();

        assert_eq!(
            stack.validate_deallocation(a),
            Err(AllocError::OutOfOrder {
                address: a.as_ptr() as usize,
                top: b.as_ptr() as usize,
            })
        );
        // Nothing moved.
        assert_eq!(stack.top(), Some(b.as_ptr() as usize));
    }

    #[test]
    fn test_stack_release_of_freed_block() {
        let mut heap = HeapRegion::new(256);
        let mut stack = StackAlgorithm::new(heap.region());

        let a = stack.allocate(16, 8, 0).unwrap();
        unsafe { stack.deallocate(a) };

        assert_eq!(
            stack.validate_deallocation(a),
            Err(AllocError::NotLive {
                address: a.as_ptr() as usize
            })
        );
    }

    #[test]
    fn test_stack_exhaustion_accounts_for_header() {
        let mut heap = HeapRegion::new(64);
        let mut stack = StackAlgorithm::new(heap.region());

        assert!(stack.allocate(64, 1, 0).is_err());
        assert!(stack.allocate(64 - HEADER_SIZE, 1, 0).is_ok());
        assert_eq!(stack.free_space(), 0);
    }

    #[test]
    fn test_stack_clear() {
        let mut heap = HeapRegion::new(128);
        let mut stack = StackAlgorithm::new(heap.region());

        let _ = stack.allocate(16, 8, 0).unwrap();
        let _ = stack.allocate(16, 8, 0).unwrap();
        stack.clear();

        assert_eq!(stack.top(), None);
        assert_eq!(stack.free_space(), 128);
    }
}
