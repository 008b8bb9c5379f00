//! Module `region`
//!
//! A [`BackingRegion`] is the contiguous range of raw bytes an arena carves its
//! blocks from. The region is provided by the embedding application (a stack
//! buffer, a heap block, a reserved virtual memory range) and is only borrowed by
//! the arena. [`HeapRegion`] is a convenience provider that owns a zeroed heap block.

use std::{alloc::Layout, marker::PhantomData, ptr::NonNull};

/// Borrowed view of a contiguous memory range `[base, base + size)`.
#[derive(Debug)]
pub struct BackingRegion<'a> {
    base: NonNull<u8>,
    size: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> BackingRegion<'a> {
    /// Borrows a byte slice as a backing region.
    #[must_use]
    pub fn from_slice(memory: &'a mut [u8]) -> Self {
        let size = memory.len();
        // Slices never have a null data pointer, even when empty.
        let base = NonNull::from(memory).cast::<u8>();

        Self {
            base,
            size,
            _marker: PhantomData,
        }
    }

    /// Wraps a raw memory range.
    ///
    /// # Safety
    /// - `base` must be valid for reads and writes of `size` bytes for `'a`.
    /// - Nothing else may access the range while the region (or an arena built on it) is alive.
    #[must_use]
    pub const unsafe fn from_raw_parts(base: NonNull<u8>, size: usize) -> Self {
        Self {
            base,
            size,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[inline(always)]
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    #[inline(always)]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// One past the last address of the region.
    #[inline(always)]
    #[must_use]
    pub fn end_addr(&self) -> usize {
        self.base_addr() + self.size
    }

    /// Returns `true` if `address` lies in `[base, base + size)`.
    #[inline(always)]
    #[must_use]
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base_addr() && address < self.end_addr()
    }

    /// Returns `true` if the whole range `[address, address + len)` lies inside the region.
    #[inline(always)]
    #[must_use]
    pub fn contains_range(&self, address: usize, len: usize) -> bool {
        address >= self.base_addr()
            && address
                .checked_add(len)
                .is_some_and(|end| end <= self.end_addr())
    }

    /// Converts an address inside the region to a pointer carrying the region's provenance.
    #[inline(always)]
    pub(crate) fn ptr_at(&self, address: usize) -> NonNull<u8> {
        debug_assert!(
            self.contains_range(address, 0),
            "Address {:#x} outside of region [{:#x}, {:#x})",
            address,
            self.base_addr(),
            self.end_addr()
        );

        // SAFETY: the offset keeps the pointer inside (or one past) the region.
        unsafe { self.base.add(address - self.base_addr()) }
    }
}

/// An owned, zero-initialized heap block usable as a backing region.
pub struct HeapRegion {
    memory: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the block is uniquely owned, access goes through `&mut self`.
unsafe impl Send for HeapRegion {}
// SAFETY: `&HeapRegion` exposes no way to touch the bytes.
unsafe impl Sync for HeapRegion {}

impl HeapRegion {
    /// Default alignment of the block, enough for any scalar type.
    pub const DEFAULT_ALIGN: usize = 16;

    /// Allocates `size` zeroed bytes aligned to [`Self::DEFAULT_ALIGN`].
    ///
    /// # Panics
    /// - If `size` is zero.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self::with_alignment(size, Self::DEFAULT_ALIGN)
    }

    /// Allocates `size` zeroed bytes aligned to `align`.
    ///
    /// # Panics
    /// - If `size` is zero, or `align` is not a power of two.
    #[must_use]
    pub fn with_alignment(size: usize, align: usize) -> Self {
        assert!(size > 0, "Region size must be greater than 0");

        let layout = Layout::from_size_align(size, align).expect("Invalid region layout");

        let memory = unsafe {
            let ptr = std::alloc::alloc_zeroed(layout);

            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }

            NonNull::new_unchecked(ptr)
        };

        Self { memory, layout }
    }

    #[inline(always)]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    /// Lends the whole block as a backing region.
    #[must_use]
    pub fn region(&mut self) -> BackingRegion<'_> {
        // SAFETY: the block is live and exclusively borrowed for the returned lifetime.
        unsafe { BackingRegion::from_raw_parts(self.memory, self.layout.size()) }
    }

    /// Lends the block as a byte slice, e.g. to inspect memory after the arena is gone.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.memory.as_ptr(), self.layout.size()) }
    }
}

impl Drop for HeapRegion {
    fn drop(&mut self) {
        unsafe {
            std::alloc::dealloc(self.memory.as_ptr(), self.layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_slice() {
        let mut buffer = [0u8; 64];
        let base = buffer.as_ptr() as usize;
        let region = BackingRegion::from_slice(&mut buffer);

        assert_eq!(region.size(), 64);
        assert_eq!(region.base_addr(), base);
        assert_eq!(region.end_addr(), base + 64);
        assert!(region.contains(base));
        assert!(region.contains(base + 63));
        assert!(!region.contains(base + 64));
        assert!(region.contains_range(base + 60, 4));
        assert!(!region.contains_range(base + 60, 5));
    }

    #[test]
    fn test_heap_region_alignment() {
        let mut heap = HeapRegion::with_alignment(256, 64);
        let region = heap.region();

        assert_eq!(region.size(), 256);
        assert_eq!(region.base_addr() % 64, 0);
    }

    #[test]
    fn test_heap_region_zeroed() {
        let heap = HeapRegion::new(128);
        assert!(heap.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "Region size must be greater than 0")]
    fn test_heap_region_zero_size() {
        let _ = HeapRegion::new(0);
    }
}
