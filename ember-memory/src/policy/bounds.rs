use crate::GuardSide;

/// Byte pattern written into guard regions.
pub const GUARD_PATTERN: u8 = 0xFD;

/// Guard regions written around every block.
///
/// The arena asks the algorithm for `FRONT + size + BACK` bytes, places the user
/// block `FRONT` bytes into that reservation and verifies both guards on release.
pub trait BoundsCheckingPolicy: Default {
    const FRONT: usize;
    const BACK: usize;

    /// Fills the front guard that starts at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `FRONT` bytes.
    unsafe fn guard_front(&self, ptr: *mut u8);

    /// Fills the back guard that starts at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `BACK` bytes.
    unsafe fn guard_back(&self, ptr: *mut u8);

    /// Index of the first altered byte of the front guard starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `FRONT` bytes.
    unsafe fn check_front(&self, ptr: *const u8) -> Option<usize>;

    /// Index of the first altered byte of the back guard starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `BACK` bytes.
    unsafe fn check_back(&self, ptr: *const u8) -> Option<usize>;

    /// Verifies both guards of a block whose reservation starts at `ptr` and holds
    /// `size` user bytes. Returns the damaged side and byte index.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `FRONT + size + BACK` bytes.
    #[inline(always)]
    unsafe fn check(&self, ptr: *const u8, size: usize) -> Option<(GuardSide, usize)> {
        unsafe {
            if let Some(offset) = self.check_front(ptr) {
                return Some((GuardSide::Front, offset));
            }
            self.check_back(ptr.add(Self::FRONT + size))
                .map(|offset| (GuardSide::Back, offset))
        }
    }
}

/// No guard regions, no overhead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBoundsCheck;

impl BoundsCheckingPolicy for NoBoundsCheck {
    const FRONT: usize = 0;
    const BACK: usize = 0;

    #[inline(always)]
    unsafe fn guard_front(&self, _ptr: *mut u8) {}

    #[inline(always)]
    unsafe fn guard_back(&self, _ptr: *mut u8) {}

    #[inline(always)]
    unsafe fn check_front(&self, _ptr: *const u8) -> Option<usize> {
        None
    }

    #[inline(always)]
    unsafe fn check_back(&self, _ptr: *const u8) -> Option<usize> {
        None
    }
}

/// `N` bytes of [`GUARD_PATTERN`] before and after every block.
///
/// `N` doubles as the offset of the user block inside its reservation. Linear, stack
/// and free-list arenas align the user block past any `N`. A pool aligns whole slots,
/// so under [`PoolAlgorithm`](crate::PoolAlgorithm) `N` must be a multiple of the
/// requested alignment or the request fails with `InvalidAlignment`. The default of
/// 16 covers every scalar and SIMD type up to 128 bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardRegionCheck<const N: usize = 16>;

impl<const N: usize> GuardRegionCheck<N> {
    #[inline(always)]
    unsafe fn scan(ptr: *const u8) -> Option<usize> {
        let guard = unsafe { std::slice::from_raw_parts(ptr, N) };
        guard.iter().position(|&byte| byte != GUARD_PATTERN)
    }
}

impl<const N: usize> BoundsCheckingPolicy for GuardRegionCheck<N> {
    const FRONT: usize = N;
    const BACK: usize = N;

    #[inline(always)]
    unsafe fn guard_front(&self, ptr: *mut u8) {
        unsafe { ptr.write_bytes(GUARD_PATTERN, N) };
    }

    #[inline(always)]
    unsafe fn guard_back(&self, ptr: *mut u8) {
        unsafe { ptr.write_bytes(GUARD_PATTERN, N) };
    }

    #[inline(always)]
    unsafe fn check_front(&self, ptr: *const u8) -> Option<usize> {
        unsafe { Self::scan(ptr) }
    }

    #[inline(always)]
    unsafe fn check_back(&self, ptr: *const u8) -> Option<usize> {
        unsafe { Self::scan(ptr) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_region_roundtrip() {
        let policy = GuardRegionCheck::<4>;
        let mut block = [0u8; 4 + 8 + 4];

        unsafe {
            policy.guard_front(block.as_mut_ptr());
            policy.guard_back(block.as_mut_ptr().add(12));
            assert_eq!(policy.check(block.as_ptr(), 8), None);
        }

        assert_eq!(&block[..4], &[GUARD_PATTERN; 4]);
        assert_eq!(&block[4..12], &[0; 8]);
        assert_eq!(&block[12..], &[GUARD_PATTERN; 4]);
    }

    #[test]
    fn test_guard_region_detects_overrun() {
        let policy = GuardRegionCheck::<4>;
        let mut block = [0u8; 4 + 8 + 4];

        unsafe {
            policy.guard_front(block.as_mut_ptr());
            policy.guard_back(block.as_mut_ptr().add(12));
        }

        // One byte past the end of the user block.
        block[12] = 0;
        assert_eq!(
            unsafe { policy.check(block.as_ptr(), 8) },
            Some((GuardSide::Back, 0))
        );

        block[12] = GUARD_PATTERN;
        block[2] = 0x42;
        assert_eq!(
            unsafe { policy.check(block.as_ptr(), 8) },
            Some((GuardSide::Front, 2))
        );
    }

    #[test]
    fn test_no_bounds_check_is_free() {
        assert_eq!(NoBoundsCheck::FRONT + NoBoundsCheck::BACK, 0);
        assert_eq!(unsafe { NoBoundsCheck.check(std::ptr::null(), 0) }, None);
    }
}
