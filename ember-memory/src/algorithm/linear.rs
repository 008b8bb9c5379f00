use std::ptr::NonNull;

use crate::{
    AllocError, BackingRegion,
    utils::{align_with_offset, validate_request},
};

use super::AllocationAlgorithm;

/// Bump allocator: a single cursor that only moves forward until [`clear`](AllocationAlgorithm::clear).
///
/// Suited for per-frame or per-scope transient memory.
pub struct LinearAlgorithm<'a> {
    region: BackingRegion<'a>,
    cursor: usize,
}

// SAFETY: the algorithm exclusively owns access to its region.
unsafe impl Send for LinearAlgorithm<'_> {}

impl<'a> LinearAlgorithm<'a> {
    #[must_use]
    pub fn new(region: BackingRegion<'a>) -> Self {
        Self { region, cursor: 0 }
    }

    /// Bytes between the region start and the cursor.
    #[inline(always)]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }
}

unsafe impl AllocationAlgorithm for LinearAlgorithm<'_> {
    const NAME: &'static str = "linear";

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

        let start = align_with_offset(current, alignment, offset).ok_or(exhausted.clone())?;
        let end = start.checked_add(size).ok_or(exhausted.clone())?;

        if end > self.region.end_addr() {
            return Err(exhausted);
        }

        self.cursor = end - self.region.base_addr();

        Ok(self.region.ptr_at(start))
    }

    fn validate_deallocation(&self, _ptr: NonNull<u8>) -> Result<usize, AllocError> {
        Err(AllocError::Unsupported { algorithm: Self::NAME })
    }

    unsafe fn deallocate(&mut self, _ptr: NonNull<u8>) {}

    #[inline]
    fn clear(&mut self) {
        self.cursor = 0;
    }

    #[inline(always)]
    fn can_deallocate(&self) -> bool {
        false
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
    fn test_linear_basic() {
        let mut heap = HeapRegion::new(128);
        let mut linear = LinearAlgorithm::new(heap.region());
        let base = heap_base(&linear);

        let a = linear.allocate(10, 1, 0).unwrap();
        let b = linear.allocate(8, 8, 0).unwrap();

        assert_eq!(a.as_ptr() as usize, base);
        assert_eq!(b.as_ptr() as usize, base + 16);
        assert_eq!(linear.cursor(), 24);
        assert_eq!(linear.free_space(), 104);
    }

    #[test]
    fn test_linear_offset_alignment() {
        let mut heap = HeapRegion::new(128);
        let mut linear = LinearAlgorithm::new(heap.region());

        let _ = linear.allocate(3, 1, 0).unwrap();
        let p = linear.allocate(32, 16, 4).unwrap();

        assert_eq!((p.as_ptr() as usize + 4) % 16, 0);
    }

    #[test]
    fn test_linear_exhaustion() {
        let mut heap = HeapRegion::new(64);
        let mut linear = LinearAlgorithm::new(heap.region());

        assert!(linear.allocate(64, 1, 0).is_ok());
        assert_eq!(
            linear.allocate(1, 1, 0),
            Err(AllocError::Exhaustion {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_linear_deallocate_unsupported() {
        let mut heap = HeapRegion::new(64);
        let mut linear = LinearAlgorithm::new(heap.region());

        let p = linear.allocate(8, 8, 0).unwrap();
        assert!(!linear.can_deallocate());
        assert_eq!(
            linear.validate_deallocation(p),
            Err(AllocError::Unsupported { algorithm: "linear" })
        );
    }

    #[test]
    fn test_linear_clear_is_idempotent() {
        let mut heap = HeapRegion::new(64);
        let mut linear = LinearAlgorithm::new(heap.region());

        let first = linear.allocate(48, 8, 0).unwrap();
        linear.clear();
        linear.clear();

        assert_eq!(linear.cursor(), 0);
        let again = linear.allocate(48, 8, 0).unwrap();
        assert_eq!(first, again);
    }

    fn heap_base(linear: &LinearAlgorithm<'_>) -> usize {
        linear.region.base_addr()
    }
}
