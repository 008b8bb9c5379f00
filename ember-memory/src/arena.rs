//! Module `arena`
//!
//! [`Arena`] binds one [`AllocationAlgorithm`] with a thread policy, a bounds
//! checking policy, a tracking policy and a tagging policy. All five are type
//! parameters, fixed at construction. Every call runs through the same pipeline:
//!
//! ```text
//! allocate:   lock ─► algorithm (FRONT + size + BACK) ─► guards ─► tag ─► track
//! deallocate: lock ─► live-set check ─► algorithm check ─► guards ─► untrack ─► tag ─► algorithm
//! ```
//!
//! # Examples
//!
//! ```rust
//! use ember_memory::{
//!     Allocator, DebugArena, FreeListAlgorithm, FreeListConfig, HeapRegion, ember_alloc,
//! };
//!
//! let mut heap = HeapRegion::new(4096);
//! let arena = DebugArena::compose(
//!     "tools",
//!     FreeListAlgorithm::new(heap.region(), FreeListConfig::default()),
//! );
//!
//! let ptr = ember_alloc!(arena, 128, 16).unwrap();
//! assert_eq!(arena.total_used_memory(), 128);
//!
//! unsafe { arena.deallocate(ptr).unwrap() };
//! assert!(arena.report().is_leak_free());
//! ```

use std::{cell::UnsafeCell, ptr::NonNull};

#[cfg(feature = "memory_stats")]
use crate::ArenaStats;
use crate::{
    AllocError, AllocationAlgorithm, Allocator, MemoryReport, SourceLocation,
    policy::{
        AllocationRecord, AllocationTable, BoundsCheckingPolicy, GuardRegionCheck, MutexLock,
        NoBoundsCheck, NoGuard, NoTagging, NoTracking, SentinelFill, SerializedAccess,
        TaggingPolicy, ThreadPolicy, TrackingPolicy,
    },
    utils::validate_request,
};

/// Arena with every policy disabled.
pub type SimpleArena<A> = Arena<A>;
/// Arena that can be shared between threads, nothing else.
pub type ThreadSafeArena<A> = Arena<A, MutexLock>;
/// Arena with every debugging aid enabled.
pub type DebugArena<A> = Arena<A, MutexLock, GuardRegionCheck, AllocationTable, SentinelFill>;

/// An allocation algorithm composed with its policies.
///
/// Dropping an arena does not release outstanding blocks; a non-empty live set at
/// that point is reported as a leak.
pub struct Arena<A, G = NoGuard, B = NoBoundsCheck, M = NoTracking, T = NoTagging>
where
    A: AllocationAlgorithm,
    G: ThreadPolicy,
    B: BoundsCheckingPolicy,
    M: TrackingPolicy,
    T: TaggingPolicy,
{
    name: String,
    guard: G,
    state: UnsafeCell<ArenaState<A, B, M, T>>,
}

// SAFETY: all access to `state` happens inside `guard.lock()`, which provides
// mutual exclusion for `SerializedAccess` policies.
unsafe impl<A, G, B, M, T> Sync for Arena<A, G, B, M, T>
where
    A: AllocationAlgorithm + Send,
    G: SerializedAccess,
    B: BoundsCheckingPolicy + Send,
    M: TrackingPolicy + Send,
    T: TaggingPolicy + Send,
{
}

struct ArenaState<A, B, M, T> {
    algorithm: A,
    bounds: B,
    tracking: M,
    tagging: T,
    used: usize,
    count: usize,
    #[cfg(feature = "memory_stats")]
    stats: ArenaStats,
}

impl<A> Arena<A>
where
    A: AllocationAlgorithm,
{
    /// Creates an arena with every policy disabled.
    #[must_use]
    pub fn new(name: impl Into<String>, algorithm: A) -> Self {
        Self::compose(name, algorithm)
    }
}

impl<A, G, B, M, T> Arena<A, G, B, M, T>
where
    A: AllocationAlgorithm,
    G: ThreadPolicy,
    B: BoundsCheckingPolicy,
    M: TrackingPolicy,
    T: TaggingPolicy,
{
    /// Creates an arena whose policies are default-constructed from the type parameters.
    #[must_use]
    pub fn compose(name: impl Into<String>, algorithm: A) -> Self {
        Self::with_policies(
            name,
            algorithm,
            G::default(),
            B::default(),
            M::default(),
            T::default(),
        )
    }

    /// Creates an arena from explicitly constructed policies.
    #[must_use]
    pub fn with_policies(
        name: impl Into<String>,
        algorithm: A,
        guard: G,
        bounds: B,
        tracking: M,
        tagging: T,
    ) -> Self {
        #[cfg(feature = "memory_stats")]
        let stats = ArenaStats::new(algorithm.capacity());

        Self {
            name: name.into(),
            guard,
            state: UnsafeCell::new(ArenaState {
                algorithm,
                bounds,
                tracking,
                tagging,
                used: 0,
                count: 0,
                #[cfg(feature = "memory_stats")]
                stats,
            }),
        }
    }

    #[inline(always)]
    fn with_state<R>(&self, f: impl FnOnce(&mut ArenaState<A, B, M, T>) -> R) -> R {
        let _lock = self.guard.lock();
        // SAFETY: the lock serializes access, or the arena is `!Sync`. Every `f` passed
        // here is crate code that neither calls back into the arena nor leaks the borrow.
        let state = unsafe { &mut *self.state.get() };
        f(state)
    }

    /// Size of the backing region.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.with_state(|state| state.algorithm.capacity())
    }

    /// Bytes the algorithm could still hand out, ignoring fragmentation.
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.with_state(|state| state.algorithm.free_space())
    }

    /// Runs `f` on the wrapped algorithm.
    ///
    /// Takes `&mut self` so that `f` cannot reach back into the arena:
    ///
    /// ```compile_fail,E0502
    /// use ember_memory::{Allocator, Arena, HeapRegion, LinearAlgorithm};
    ///
    /// let mut heap = HeapRegion::new(256);
    /// let mut arena = Arena::new("frame", LinearAlgorithm::new(heap.region()));
    ///
    /// arena.inspect(|linear| {
    ///     let _ = arena.allocate(64, 8);
    ///     linear.cursor()
    /// });
    /// ```
    pub fn inspect<R>(&mut self, f: impl FnOnce(&A) -> R) -> R {
        f(&self.state.get_mut().algorithm)
    }

    /// Releases every live block, like [`Allocator::clear`].
    ///
    /// Safe because boxed values and other borrows of the arena cannot outlive the
    /// exclusive borrow taken here:
    ///
    /// ```compile_fail,E0502
    /// use ember_memory::{Arena, ArenaBox, HeapRegion, StackAlgorithm};
    ///
    /// let mut heap = HeapRegion::new(256);
    /// let mut arena = Arena::new("frame", StackAlgorithm::new(heap.region()));
    /// let boxed = ArenaBox::new_in(1u64, &arena).unwrap();
    ///
    /// arena.reset();
    /// assert_eq!(*boxed, 1);
    /// ```
    pub fn reset(&mut self) {
        let released = self.state.get_mut().count;
        self.state.get_mut().clear();

        log::debug!("[{}] reset {} live allocations", self.name, released);
    }

    /// Copy of the live allocation records, in allocation order.
    ///
    /// Always empty when the arena has no tracking policy.
    #[must_use]
    pub fn live_allocations(&self) -> Vec<AllocationRecord> {
        self.with_state(|state| state.tracking.records().copied().collect())
    }

    /// Snapshot of the counters and the live set.
    #[must_use]
    pub fn report(&self) -> MemoryReport {
        #[cfg(feature = "tracy")]
        let _span = tracy_client::span!("Arena::report");

        self.with_state(|state| {
            MemoryReport::collect(
                &self.name,
                state.used,
                state.count,
                M::ENABLED,
                state.tracking.records(),
            )
        })
    }

    /// Verifies the guard regions of every tracked live block.
    ///
    /// This is the only overrun check available to arenas that never release single
    /// blocks. A no-op unless both bounds checking and tracking are enabled.
    ///
    /// # Errors
    /// [`AllocError::Corruption`] for the first damaged block, in allocation order.
    pub fn verify_guards(&self) -> Result<(), AllocError> {
        if B::FRONT + B::BACK == 0 || !M::ENABLED {
            return Ok(());
        }

        let result = self.with_state(|state| {
            for record in state.tracking.records() {
                let raw = (record.address - B::FRONT) as *const u8;

                // SAFETY: tracked blocks are live, so their reservation is still ours.
                if let Some((side, offset)) = unsafe { state.bounds.check(raw, record.size) } {
                    return Err(AllocError::Corruption {
                        address: record.address,
                        side,
                        offset,
                    });
                }
            }
            Ok(())
        });

        if let Err(err) = &result {
            log::error!("[{}] {}", self.name, err);
        }

        result
    }

    /// Copy of the lifetime counters.
    #[cfg(feature = "memory_stats")]
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        self.with_state(|state| state.stats)
    }

    fn allocate_inner(
        &self,
        size: usize,
        alignment: usize,
        source: Option<SourceLocation>,
    ) -> Result<NonNull<u8>, AllocError> {
        #[cfg(feature = "tracy")]
        let _span = tracy_client::span!("Arena::allocate");

        validate_request(size, alignment)?;

        let result = self.with_state(|state| state.allocate(size, alignment, source));

        match &result {
            Ok(ptr) => log::trace!(
                "[{}] allocated {} bytes (align {}) at {:p}",
                self.name,
                size,
                alignment,
                ptr.as_ptr()
            ),
            Err(err) => log::debug!("[{}] allocation failed: {}", self.name, err),
        }

        result
    }
}

impl<A, B, M, T> ArenaState<A, B, M, T>
where
    A: AllocationAlgorithm,
    B: BoundsCheckingPolicy,
    M: TrackingPolicy,
    T: TaggingPolicy,
{
    const GUARD_OVERHEAD: usize = B::FRONT + B::BACK;

    fn allocate(
        &mut self,
        size: usize,
        alignment: usize,
        source: Option<SourceLocation>,
    ) -> Result<NonNull<u8>, AllocError> {
        let effective = size
            .checked_add(Self::GUARD_OVERHEAD)
            .ok_or(AllocError::Exhaustion {
                requested: size,
                available: self.algorithm.free_space(),
            })?;

        let raw = match self.algorithm.allocate(effective, alignment, B::FRONT) {
            Ok(raw) => raw,
            Err(err) => {
                #[cfg(feature = "memory_stats")]
                {
                    self.stats.failed_allocations += 1;
                }
                return Err(err);
            }
        };

        // SAFETY: the algorithm reserved `effective` bytes starting at `raw`.
        let user = unsafe {
            let user = raw.add(B::FRONT);
            self.bounds.guard_front(raw.as_ptr());
            self.tagging.tag_allocation(user.as_ptr(), size);
            self.bounds.guard_back(user.as_ptr().add(size));
            user
        };

        self.tracking.on_allocation(AllocationRecord {
            address: user.as_ptr() as usize,
            size,
            alignment,
            source,
        });

        self.used += size;
        self.count += 1;

        #[cfg(feature = "memory_stats")]
        self.stats.on_allocation(self.used, self.count);

        Ok(user)
    }

    fn deallocate(&mut self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        let result = self.release(ptr);

        #[cfg(feature = "memory_stats")]
        match &result {
            Ok(()) => self.stats.total_deallocations += 1,
            Err(AllocError::Corruption { .. }) => self.stats.corruptions += 1,
            Err(_) => self.stats.rejected_deallocations += 1,
        }

        result
    }

    fn release(&mut self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        let address = ptr.as_ptr() as usize;

        if !self.algorithm.can_deallocate() {
            return Err(AllocError::Unsupported { algorithm: A::NAME });
        }

        if !self.algorithm.owns(address) {
            return Err(AllocError::NotOwned { address });
        }

        if M::ENABLED && !self.tracking.is_live(address) {
            return Err(AllocError::NotLive { address });
        }

        let Some(raw_address) = address.checked_sub(B::FRONT) else {
            return Err(AllocError::NotOwned { address });
        };
        if !self.algorithm.owns(raw_address) {
            return Err(AllocError::NotLive { address });
        }

        // SAFETY: `raw_address` lies inside the region, same provenance as `ptr`.
        let raw = unsafe { NonNull::new_unchecked(ptr.as_ptr().sub(B::FRONT)) };

        let effective = self
            .algorithm
            .validate_deallocation(raw)
            .map_err(|err| rebase(err, B::FRONT))?;

        let Some(size) = effective.checked_sub(Self::GUARD_OVERHEAD) else {
            return Err(AllocError::NotLive { address });
        };

        // SAFETY: the algorithm vouched for `effective` bytes at `raw`.
        if let Some((side, offset)) = unsafe { self.bounds.check(raw.as_ptr(), size) } {
            return Err(AllocError::Corruption {
                address,
                side,
                offset,
            });
        }

        self.tracking.on_deallocation(address);

        unsafe {
            self.tagging.tag_deallocation(raw.as_ptr(), effective);
            self.algorithm.deallocate(raw);
        }

        self.used -= size;
        self.count -= 1;

        Ok(())
    }

    fn clear(&mut self) {
        self.algorithm.clear();
        self.tracking.on_clear();
        self.used = 0;
        self.count = 0;

        #[cfg(feature = "memory_stats")]
        {
            self.stats.clears += 1;
        }
    }
}

/// Translates addresses reported by the algorithm (reservation starts) to user addresses.
fn rebase(err: AllocError, front: usize) -> AllocError {
    match err {
        AllocError::NotOwned { address } => AllocError::NotOwned {
            address: address + front,
        },
        AllocError::NotLive { address } => AllocError::NotLive {
            address: address + front,
        },
        AllocError::DoubleFree { address } => AllocError::DoubleFree {
            address: address + front,
        },
        AllocError::OutOfOrder { address, top } => AllocError::OutOfOrder {
            address: address + front,
            top: if top == 0 { 0 } else { top + front },
        },
        other => other,
    }
}

impl<A, G, B, M, T> Allocator for Arena<A, G, B, M, T>
where
    A: AllocationAlgorithm,
    G: ThreadPolicy,
    B: BoundsCheckingPolicy,
    M: TrackingPolicy,
    T: TaggingPolicy,
{
    #[inline]
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        self.allocate_inner(size, alignment, None)
    }

    #[inline]
    fn allocate_tracked(
        &self,
        size: usize,
        alignment: usize,
        source: SourceLocation,
    ) -> Result<NonNull<u8>, AllocError> {
        self.allocate_inner(size, alignment, M::ENABLED.then_some(source))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        #[cfg(feature = "tracy")]
        let _span = tracy_client::span!("Arena::deallocate");

        let result = self.with_state(|state| state.deallocate(ptr));

        match &result {
            Ok(()) => log::trace!("[{}] released {:p}", self.name, ptr.as_ptr()),
            Err(AllocError::Unsupported { .. }) => {}
            Err(err @ AllocError::Corruption { .. }) => log::error!("[{}] {}", self.name, err),
            Err(err) => log::warn!("[{}] rejected release: {}", self.name, err),
        }

        result
    }

    unsafe fn clear(&self) {
        #[cfg(feature = "tracy")]
        let _span = tracy_client::span!("Arena::clear");

        let released = self.with_state(|state| {
            let released = state.count;
            state.clear();
            released
        });

        log::debug!("[{}] cleared {} live allocations", self.name, released);
    }

    #[inline]
    fn can_deallocate(&self) -> bool {
        self.with_state(|state| state.algorithm.can_deallocate())
    }

    #[inline]
    fn total_used_memory(&self) -> usize {
        self.with_state(|state| state.used)
    }

    #[inline]
    fn total_num_allocations(&self) -> usize {
        self.with_state(|state| state.count)
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

impl<A, G, B, M, T> Drop for Arena<A, G, B, M, T>
where
    A: AllocationAlgorithm,
    G: ThreadPolicy,
    B: BoundsCheckingPolicy,
    M: TrackingPolicy,
    T: TaggingPolicy,
{
    fn drop(&mut self) {
        let state = self.state.get_mut();

        if state.count > 0 {
            log::warn!(
                "arena '{}' dropped with {} live allocations ({} bytes)",
                self.name,
                state.count,
                state.used
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FreeListAlgorithm, FreeListConfig, GuardSide, HeapRegion, LinearAlgorithm, PoolAlgorithm,
        PoolConfig, StackAlgorithm,
        policy::{ALLOCATED_PATTERN, FREED_PATTERN, GUARD_PATTERN},
    };

    type CheckedArena<A> = Arena<A, NoGuard, GuardRegionCheck, AllocationTable, SentinelFill>;

    #[test]
    fn test_counters_follow_live_set() {
        let mut heap = HeapRegion::new(1024);
        let arena = Arena::new(
            "counters",
            FreeListAlgorithm::new(heap.region(), FreeListConfig::default()),
        );

        let a = arena.allocate(10, 8).unwrap();
        let b = arena.allocate(20, 4).unwrap();
        assert_eq!(arena.total_used_memory(), 30);
        assert_eq!(arena.total_num_allocations(), 2);

        unsafe { arena.deallocate(a).unwrap() };
        assert_eq!(arena.total_used_memory(), 20);
        assert_eq!(arena.total_num_allocations(), 1);

        unsafe { arena.deallocate(b).unwrap() };
        assert_eq!(arena.total_used_memory(), 0);
        assert_eq!(arena.total_num_allocations(), 0);
    }

    #[test]
    fn test_rejects_malformed_requests() {
        let mut heap = HeapRegion::new(256);
        let arena = Arena::new("malformed", LinearAlgorithm::new(heap.region()));

        assert_eq!(arena.allocate(0, 8), Err(AllocError::ZeroSize));
        assert_eq!(
            arena.allocate(8, 3),
            Err(AllocError::InvalidAlignment { alignment: 3 })
        );
        assert_eq!(arena.total_num_allocations(), 0);
    }

    #[test]
    fn test_linear_arena_cannot_deallocate() {
        let mut heap = HeapRegion::new(256);
        let mut arena = Arena::new("frame", LinearAlgorithm::new(heap.region()));

        let p = arena.allocate(16, 8).unwrap();
        assert!(!arena.can_deallocate());
        assert_eq!(
            unsafe { arena.deallocate(p) },
            Err(AllocError::Unsupported { algorithm: "linear" })
        );
        assert_eq!(arena.total_used_memory(), 16);

        arena.reset();
        assert_eq!(arena.total_used_memory(), 0);
        assert_eq!(arena.total_num_allocations(), 0);
    }

    #[test]
    fn test_guard_regions_surround_user_block() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose(
            "guards",
            FreeListAlgorithm::new(heap.region(), FreeListConfig::default()),
        );

        let p = arena.allocate(8, 8).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(p.as_ptr().sub(16), 16 + 8 + 16) };

        assert!(bytes[..16].iter().all(|&b| b == GUARD_PATTERN));
        assert!(bytes[16..24].iter().all(|&b| b == ALLOCATED_PATTERN));
        assert!(bytes[24..].iter().all(|&b| b == GUARD_PATTERN));
        assert_eq!(p.as_ptr() as usize % 8, 0);
    }

    #[test]
    fn test_overrun_is_reported_and_block_kept() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose(
            "overrun",
            FreeListAlgorithm::new(heap.region(), FreeListConfig::default()),
        );

        let p = arena.allocate(8, 8).unwrap();
        unsafe { p.as_ptr().add(8).write(0) };

        assert_eq!(
            unsafe { arena.deallocate(p) },
            Err(AllocError::Corruption {
                address: p.as_ptr() as usize,
                side: GuardSide::Back,
                offset: 0,
            })
        );
        assert_eq!(arena.total_num_allocations(), 1);
        assert_eq!(arena.live_allocations().len(), 1);
    }

    #[test]
    fn test_underrun_is_reported() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose("underrun", StackAlgorithm::new(heap.region()));

        let p = arena.allocate(8, 8).unwrap();
        unsafe { p.as_ptr().sub(1).write(0) };

        assert_eq!(
            unsafe { arena.deallocate(p) },
            Err(AllocError::Corruption {
                address: p.as_ptr() as usize,
                side: GuardSide::Front,
                offset: 15,
            })
        );
    }

    #[test]
    fn test_freed_block_is_tagged() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose("tagging", StackAlgorithm::new(heap.region()));

        let p = arena.allocate(32, 8).unwrap();
        unsafe { arena.deallocate(p).unwrap() };

        let bytes = unsafe { std::slice::from_raw_parts(p.as_ptr(), 32) };
        assert!(bytes.iter().all(|&b| b == FREED_PATTERN));
    }

    #[test]
    fn test_tracking_rejects_unknown_and_double_release() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose(
            "tracking",
            PoolAlgorithm::new(heap.region(), PoolConfig::new(64, 16)),
        );

        let p = arena.allocate(16, 8).unwrap();
        let interior = unsafe { p.add(4) };

        assert_eq!(
            unsafe { arena.deallocate(interior) },
            Err(AllocError::NotLive {
                address: interior.as_ptr() as usize
            })
        );

        unsafe { arena.deallocate(p).unwrap() };
        assert_eq!(
            unsafe { arena.deallocate(p) },
            Err(AllocError::NotLive {
                address: p.as_ptr() as usize
            })
        );

        let mut outside = [0u8; 8];
        let foreign = NonNull::new(outside.as_mut_ptr()).unwrap();
        assert_eq!(
            unsafe { arena.deallocate(foreign) },
            Err(AllocError::NotOwned {
                address: foreign.as_ptr() as usize
            })
        );
    }

    #[test]
    fn test_out_of_order_stack_release_reports_user_addresses() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose("stack", StackAlgorithm::new(heap.region()));

        let a = arena.allocate(8, 8).unwrap();
        let b = arena.allocate(8, 8).unwrap();

        assert_eq!(
            unsafe { arena.deallocate(a) },
            Err(AllocError::OutOfOrder {
                address: a.as_ptr() as usize,
                top: b.as_ptr() as usize,
            })
        );

        unsafe {
            arena.deallocate(b).unwrap();
            arena.deallocate(a).unwrap();
        }
        assert_eq!(arena.total_num_allocations(), 0);
    }

    #[test]
    fn test_pool_double_free_without_tracking() {
        let mut heap = HeapRegion::new(256);
        let arena = Arena::new(
            "pool",
            PoolAlgorithm::new(heap.region(), PoolConfig::new(32, 8)),
        );

        let p = arena.allocate(32, 8).unwrap();
        unsafe { arena.deallocate(p).unwrap() };

        assert_eq!(
            unsafe { arena.deallocate(p) },
            Err(AllocError::DoubleFree {
                address: p.as_ptr() as usize
            })
        );
        assert_eq!(arena.total_num_allocations(), 0);
    }

    #[test]
    fn test_untracked_path_records_no_source() {
        let mut heap = HeapRegion::new(512);
        let arena = CheckedArena::compose("sources", LinearAlgorithm::new(heap.region()));

        let _ = arena.allocate(8, 8).unwrap();
        let _ = arena
            .allocate_tracked(8, 8, SourceLocation::new("ai/planner.rs", 7))
            .unwrap();

        let records = arena.live_allocations();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, None);
        assert_eq!(
            records[1].source,
            Some(SourceLocation::new("ai/planner.rs", 7))
        );
    }

    #[test]
    fn test_clear_resets_tracking() {
        let mut heap = HeapRegion::new(512);
        let mut arena = CheckedArena::compose("clear", StackAlgorithm::new(heap.region()));

        let _ = arena.allocate(8, 8).unwrap();
        let _ = arena.allocate(8, 8).unwrap();
        unsafe { arena.clear() };
        arena.reset();

        assert_eq!(arena.total_num_allocations(), 0);
        assert!(arena.live_allocations().is_empty());
        assert!(arena.report().is_leak_free());
        assert!(arena.allocate(256, 8).is_ok());
    }

    #[test]
    fn test_guard_overhead_counts_against_slot_size() {
        let mut heap = HeapRegion::new(4 * 48);
        let arena = CheckedArena::compose(
            "pool-guards",
            PoolAlgorithm::new(heap.region(), PoolConfig::new(48, 16)),
        );

        let p = arena.allocate(16, 16).unwrap();
        assert_eq!(p.as_ptr() as usize % 16, 0);

        assert!(matches!(
            arena.allocate(17, 8),
            Err(AllocError::RequestTooLarge { limit: 48, .. })
        ));
        assert_eq!(arena.total_num_allocations(), 1);
    }

    #[test]
    fn test_reset_requires_boxes_to_be_gone() {
        let mut heap = HeapRegion::new(256);
        let mut arena = Arena::new("reset", StackAlgorithm::new(heap.region()));

        let first = {
            let boxed = crate::ArenaBox::new_in(1u64, &arena).unwrap();
            crate::ArenaBox::as_ptr(&boxed).cast::<u8>()
        };
        arena.reset();

        let mut a = crate::ArenaBox::new_in(2u64, &arena).unwrap();
        let b = crate::ArenaBox::new_in(3u64, &arena).unwrap();
        *a = 99;

        assert_eq!(crate::ArenaBox::as_ptr(&a).cast::<u8>(), first);
        assert_ne!(crate::ArenaBox::as_ptr(&a), crate::ArenaBox::as_ptr(&b));
        assert_eq!(*b, 3);
    }

    #[test]
    fn test_inspect_sees_algorithm_state() {
        let mut heap = HeapRegion::new(256);
        let mut arena = Arena::new("inspect", LinearAlgorithm::new(heap.region()));

        assert_eq!(arena.inspect(|linear| linear.cursor()), 0);
        let _ = arena.allocate(64, 8).unwrap();
        assert_eq!(arena.inspect(|linear| linear.cursor()), 64);
    }

    #[cfg(feature = "memory_stats")]
    #[test]
    fn test_stats() {
        let mut heap = HeapRegion::new(256);
        let arena = Arena::new(
            "stats",
            PoolAlgorithm::new(heap.region(), PoolConfig::new(64, 8)),
        );

        let a = arena.allocate(64, 8).unwrap();
        let b = arena.allocate(32, 8).unwrap();
        unsafe { arena.deallocate(a).unwrap() };
        let _ = unsafe { arena.deallocate(a) };
        let _ = arena.allocate(65, 8);
        unsafe { arena.deallocate(b).unwrap() };

        let stats = arena.stats();
        assert_eq!(stats.capacity, 256);
        assert_eq!(stats.total_allocations, 2);
        assert_eq!(stats.total_deallocations, 2);
        assert_eq!(stats.rejected_deallocations, 1);
        assert_eq!(stats.failed_allocations, 1);
        assert_eq!(stats.peak_used_memory, 96);
        assert_eq!(stats.peak_num_allocations, 2);
    }
}
