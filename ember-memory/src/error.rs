//! Module `error`
//!
//! Every arena operation reports failure through [`AllocError`]. Nothing in the
//! allocation path unwinds: exhaustion and misuse are ordinary return values so
//! that the arenas stay usable from code that cannot tolerate panics.

use std::fmt;

use thiserror::Error;

/// Which guard region of a block failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GuardSide {
    /// The guard bytes written directly before the user block.
    Front,
    /// The guard bytes written directly after the user block.
    Back,
}

impl fmt::Display for GuardSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => f.write_str("front"),
            Self::Back => f.write_str("back"),
        }
    }
}

/// Errors returned by allocators and arenas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The backing region (or the pool's slot list) has no room for the request.
    #[error("out of memory: requested {requested} bytes, {available} bytes free")]
    Exhaustion {
        /// Effective number of bytes the algorithm was asked for.
        requested: usize,
        /// Free bytes left in the region, regardless of fragmentation.
        available: usize,
    },

    /// The alignment is not a power of two, or the algorithm cannot honour it.
    #[error("invalid alignment {alignment}")]
    InvalidAlignment {
        /// The rejected alignment.
        alignment: usize,
    },

    /// Zero-sized requests are rejected by every allocator.
    #[error("zero-sized allocation")]
    ZeroSize,

    /// The request can never be served by this algorithm (e.g. larger than a pool slot).
    #[error("request of {requested} bytes exceeds the {limit} byte limit of this allocator")]
    RequestTooLarge {
        /// Effective number of bytes the algorithm was asked for.
        requested: usize,
        /// Largest block the algorithm can hand out.
        limit: usize,
    },

    /// The operation is not meaningful for this algorithm (deallocating from a linear allocator).
    #[error("operation not supported by the {algorithm} algorithm")]
    Unsupported {
        /// Name of the algorithm that rejected the call.
        algorithm: &'static str,
    },

    /// The address does not lie inside the backing region.
    #[error("address {address:#x} is not owned by this allocator")]
    NotOwned {
        /// The rejected address.
        address: usize,
    },

    /// The address lies inside the region but is not a live block.
    #[error("address {address:#x} is not a live allocation")]
    NotLive {
        /// The rejected address.
        address: usize,
    },

    /// The block has already been returned to the allocator.
    #[error("double free of address {address:#x}")]
    DoubleFree {
        /// The rejected address.
        address: usize,
    },

    /// A stack allocator was asked to release anything but its most recent block.
    #[error("out of order stack deallocation of {address:#x}, top of stack is {top:#x}")]
    OutOfOrder {
        /// The rejected address.
        address: usize,
        /// The address that must be released first (0 when the stack is empty).
        top: usize,
    },

    /// A guard region surrounding the block was overwritten.
    #[error("{side} guard of block {address:#x} corrupted at byte {offset}")]
    Corruption {
        /// User-visible address of the corrupted block.
        address: usize,
        /// Which guard region was damaged.
        side: GuardSide,
        /// Index of the first damaged byte inside the guard region.
        offset: usize,
    },
}

impl AllocError {
    /// Returns `true` for errors caused by the state of the region rather than by the caller.
    #[must_use]
    pub const fn is_exhaustion(&self) -> bool {
        matches!(self, Self::Exhaustion { .. })
    }

    /// Returns `true` for errors that indicate the caller broke the allocator contract.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::NotOwned { .. }
                | Self::NotLive { .. }
                | Self::DoubleFree { .. }
                | Self::OutOfOrder { .. }
        )
    }

    /// Returns `true` if a guard region check failed.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}
