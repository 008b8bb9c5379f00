//! Module `algorithm`
//!
//! Allocation strategies that carve blocks out of a [`BackingRegion`](crate::BackingRegion).
//! An algorithm knows nothing about locking, guard regions, tracking or tagging;
//! the [`Arena`](crate::Arena) layers those on top.
//!
//! Algorithms receive the *effective* size of a block (user size plus guard
//! regions) and an `offset`: the returned pointer `p` satisfies
//! `(p + offset) % alignment == 0`, so the user address that follows a front
//! guard of `offset` bytes is the one that ends up aligned.

mod free_list;
mod linear;
mod pool;
mod stack;

use std::ptr::NonNull;

use crate::AllocError;

pub use free_list::{FitPolicy, FreeListAlgorithm, FreeListConfig};
pub use linear::LinearAlgorithm;
pub use pool::{PoolAlgorithm, PoolConfig};
pub use stack::StackAlgorithm;

/// A strategy for carving blocks out of a backing region.
///
/// # Safety
/// Implementations must only return pointers into their backing region, must never
/// hand out overlapping live blocks, and `validate_deallocation` must return the exact
/// `size` the block was allocated with.
pub unsafe trait AllocationAlgorithm {
    /// Short, static name used in diagnostics.
    const NAME: &'static str;

    /// Carves `size` bytes such that `(ptr + offset)` is a multiple of `alignment`.
    ///
    /// # Errors
    /// [`AllocError::Exhaustion`] when no suitable free range exists, or an
    /// algorithm specific rejection of the request shape.
    fn allocate(
        &mut self,
        size: usize,
        alignment: usize,
        offset: usize,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Checks that `ptr` may be released right now and returns the size it was allocated with.
    ///
    /// Never modifies the algorithm state.
    ///
    /// # Errors
    /// Whatever misuse the algorithm can detect cheaply: foreign pointers, blocks
    /// that are already free, out of order releases.
    fn validate_deallocation(&self, ptr: NonNull<u8>) -> Result<usize, AllocError>;

    /// Returns a block to the free structures.
    ///
    /// # Safety
    /// `ptr` must have passed [`validate_deallocation`](Self::validate_deallocation)
    /// with no state change in between.
    unsafe fn deallocate(&mut self, ptr: NonNull<u8>);

    /// Forgets every live block.
    fn clear(&mut self);

    /// Returns `true` if [`deallocate`](Self::deallocate) is meaningful.
    fn can_deallocate(&self) -> bool;

    /// Returns `true` if `address` lies inside the backing region.
    fn owns(&self, address: usize) -> bool;

    /// Size of the backing region in bytes.
    fn capacity(&self) -> usize;

    /// Bytes not currently reserved by live blocks or their bookkeeping.
    fn free_space(&self) -> usize;
}
