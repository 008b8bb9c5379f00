use std::{fmt, panic::Location};

/// Call site attribution attached to a tracked allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller, propagated through `#[track_caller]` functions.
    #[must_use]
    #[track_caller]
    #[inline]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    #[inline]
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Allocates from an [`Allocator`](crate::Allocator) and records the call site.
///
/// ```rust
/// use ember_memory::{Allocator, Arena, HeapRegion, LinearAlgorithm, ember_alloc};
///
/// let mut heap = HeapRegion::new(256);
/// let arena = Arena::new("frame", LinearAlgorithm::new(heap.region()));
///
/// let ptr = ember_alloc!(arena, 32, 8).unwrap();
/// assert_eq!(ptr.as_ptr() as usize % 8, 0);
/// ```
#[macro_export]
macro_rules! ember_alloc {
    ($allocator:expr, $size:expr, $align:expr) => {
        $crate::Allocator::allocate_tracked(
            &$allocator,
            $size,
            $align,
            $crate::SourceLocation::new(file!(), line!()),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_location() {
        let location = SourceLocation::caller();
        assert_eq!(location.file, file!());
        assert_eq!(location.line, line!() - 2);
    }

    #[test]
    fn test_display() {
        let location = SourceLocation::new("render/mesh.rs", 42);
        assert_eq!(location.to_string(), "render/mesh.rs:42");
    }
}
