//! Module `allocator`
//!
//! The [`Allocator`] trait is the contract every subsystem programs against when
//! it needs raw memory. Arenas implement it; callers receive an `&impl Allocator`
//! (or `&dyn Allocator`) through their constructors instead of reaching for a
//! process-wide heap.

use std::ptr::NonNull;

use crate::{AllocError, SourceLocation};

/// Raw memory provider.
///
/// Every successful [`allocate`](Allocator::allocate) returns an address that is a
/// multiple of `alignment` and whose `size` bytes do not overlap any other live
/// block of the same allocator.
pub trait Allocator {
    /// Allocates `size` bytes aligned to `alignment` (a power of two).
    ///
    /// # Errors
    /// - [`AllocError::ZeroSize`] or [`AllocError::InvalidAlignment`] for malformed requests.
    /// - [`AllocError::Exhaustion`] when the region has no room left; the caller may retry later.
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError>;

    /// Same as [`allocate`](Allocator::allocate), attributing the block to `source`.
    ///
    /// Allocators without tracking ignore the attribution.
    ///
    /// # Errors
    /// See [`allocate`](Allocator::allocate).
    #[inline]
    fn allocate_tracked(
        &self,
        size: usize,
        alignment: usize,
        source: SourceLocation,
    ) -> Result<NonNull<u8>, AllocError> {
        let _ = source;
        self.allocate(size, alignment)
    }

    /// Releases a block previously returned by this allocator.
    ///
    /// # Errors
    /// - [`AllocError::Unsupported`] if the algorithm cannot release individual blocks.
    /// - A misuse or corruption error when a policy detects a bad release. The
    ///   allocator state is left untouched in that case.
    ///
    /// # Safety
    /// Unless the allocator tracks its allocations, `ptr` must be a live block of this
    /// allocator. No references into the block may be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> Result<(), AllocError>;

    /// Releases every live block at once.
    ///
    /// Values boxed in the allocator keep borrowing it through `&self`, so clearing
    /// cannot be safe here. Owners of an [`Arena`](crate::Arena) can use the safe
    /// [`Arena::reset`](crate::Arena::reset) instead.
    ///
    /// ```compile_fail,E0133
    /// use ember_memory::{Allocator, Arena, ArenaBox, HeapRegion, StackAlgorithm};
    ///
    /// let mut heap = HeapRegion::new(256);
    /// let arena = Arena::new("frame", StackAlgorithm::new(heap.region()));
    /// let boxed = ArenaBox::new_in(1u64, &arena).unwrap();
    ///
    /// arena.clear();
    /// assert_eq!(*boxed, 1);
    /// ```
    ///
    /// # Safety
    /// No block handed out before the call may be used afterwards, and no
    /// [`ArenaBox`](crate::ArenaBox) of this allocator may be alive.
    unsafe fn clear(&self);

    /// Returns `true` if individual [`deallocate`](Allocator::deallocate) calls release memory.
    fn can_deallocate(&self) -> bool;

    /// Bytes currently handed out, as requested by the callers.
    fn total_used_memory(&self) -> usize;

    /// Number of live blocks.
    fn total_num_allocations(&self) -> usize;

    /// Diagnostic label.
    fn name(&self) -> &str;
}

impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(size, alignment)
    }

    #[inline]
    fn allocate_tracked(
        &self,
        size: usize,
        alignment: usize,
        source: SourceLocation,
    ) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate_tracked(size, alignment, source)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        unsafe { (**self).deallocate(ptr) }
    }

    #[inline]
    unsafe fn clear(&self) {
        unsafe { (**self).clear() };
    }

    #[inline]
    fn can_deallocate(&self) -> bool {
        (**self).can_deallocate()
    }

    #[inline]
    fn total_used_memory(&self) -> usize {
        (**self).total_used_memory()
    }

    #[inline]
    fn total_num_allocations(&self) -> usize {
        (**self).total_num_allocations()
    }

    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }
}
