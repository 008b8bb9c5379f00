//! Module `policy`
//!
//! Cross-cutting behaviours an [`Arena`](crate::Arena) can be composed with.
//! Every policy comes in a "no-op" flavour that compiles down to nothing, so a
//! release arena pays only for the algorithm it wraps.
//!
//! | Concern         | Off               | On                   |
//! |-----------------|-------------------|----------------------|
//! | Thread safety   | [`NoGuard`]       | [`MutexLock`]        |
//! | Bounds checking | [`NoBoundsCheck`] | [`GuardRegionCheck`] |
//! | Tracking        | [`NoTracking`]    | [`AllocationTable`]  |
//! | Tagging         | [`NoTagging`]     | [`SentinelFill`]     |

mod bounds;
mod tagging;
mod thread;
mod tracking;

pub use bounds::{BoundsCheckingPolicy, GUARD_PATTERN, GuardRegionCheck, NoBoundsCheck};
pub use tagging::{ALLOCATED_PATTERN, FREED_PATTERN, NoTagging, SentinelFill, TaggingPolicy};
pub use thread::{MutexLock, NoGuard, SerializedAccess, ThreadPolicy};
pub use tracking::{AllocationRecord, AllocationTable, NoTracking, TrackingPolicy};
