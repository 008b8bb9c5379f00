//! # Ember Memory
//!
//! Region based memory arenas for the Ember engine runtime.
//!
//! Subsystems receive an [`Allocator`] instead of reaching for the global heap.
//! Each arena owns (or borrows) one contiguous [`BackingRegion`] and carves it with
//! one of four algorithms:
//!
//! - [`LinearAlgorithm`]: bump pointer, bulk reset only.
//! - [`StackAlgorithm`]: LIFO release.
//! - [`PoolAlgorithm`]: fixed size slots, O(1) both ways.
//! - [`FreeListAlgorithm`]: general purpose, first or best fit with coalescing.
//!
//! Locking, guard regions, allocation tracking and memory tagging are orthogonal
//! [`policy`] types plugged into [`Arena`] at compile time. Disabled policies cost
//! nothing.
//!
//! ## Features
//!
//! - `memory_stats`: lifetime counters ([`ArenaStats`]).
//! - `serde`: `Serialize` for reports and configuration.
//! - `tracy`: profiling spans via `tracy-client`.
//!
//! ## Example
//!
//! ```rust
//! use ember_memory::{Allocator, ArenaBox, HeapRegion, PoolAlgorithm, PoolConfig, ThreadSafeArena};
//!
//! #[derive(Debug, PartialEq)]
//! struct Particle {
//!     position: [f32; 3],
//!     ttl: u32,
//! }
//!
//! let mut heap = HeapRegion::new(64 * 1024);
//! let particles = ThreadSafeArena::compose(
//!     "particles",
//!     PoolAlgorithm::new(heap.region(), PoolConfig::for_type::<Particle>()),
//! );
//!
//! let spark = ArenaBox::new_in(Particle { position: [0.0; 3], ttl: 30 }, &particles).unwrap();
//! assert_eq!(spark.ttl, 30);
//! assert_eq!(particles.total_num_allocations(), 1);
//!
//! drop(spark);
//! assert!(particles.report().is_leak_free());
//! ```

#[macro_use]
mod location;

pub mod algorithm;
pub mod policy;

mod allocator;
mod arena;
mod error;
mod region;
mod report;
mod scoped;
#[cfg(feature = "memory_stats")]
mod stats;
mod utils;

pub use algorithm::{
    AllocationAlgorithm, FitPolicy, FreeListAlgorithm, FreeListConfig, LinearAlgorithm,
    PoolAlgorithm, PoolConfig, StackAlgorithm,
};
pub use allocator::Allocator;
pub use arena::{Arena, DebugArena, SimpleArena, ThreadSafeArena};
pub use error::{AllocError, GuardSide};
pub use location::SourceLocation;
pub use policy::{
    AllocationRecord, AllocationTable, BoundsCheckingPolicy, GuardRegionCheck, MutexLock,
    NoBoundsCheck, NoGuard, NoTagging, NoTracking, SentinelFill, SerializedAccess, TaggingPolicy,
    ThreadPolicy, TrackingPolicy,
};
pub use region::{BackingRegion, HeapRegion};
pub use report::{AllocationReport, MemoryReport, log_leaks};
pub use scoped::ArenaBox;
#[cfg(feature = "memory_stats")]
pub use stats::ArenaStats;
