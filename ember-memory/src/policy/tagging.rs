/// Written over a block right after it is allocated.
pub const ALLOCATED_PATTERN: u8 = 0xCD;
/// Written over a block right before it returns to the algorithm.
pub const FREED_PATTERN: u8 = 0xDD;

/// Fills blocks with recognizable bytes to expose reads of uninitialized or freed memory.
pub trait TaggingPolicy: Default {
    /// # Safety
    /// `ptr` must be valid for writes of `size` bytes.
    unsafe fn tag_allocation(&self, ptr: *mut u8, size: usize);

    /// # Safety
    /// `ptr` must be valid for writes of `size` bytes.
    unsafe fn tag_deallocation(&self, ptr: *mut u8, size: usize);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoTagging;

impl TaggingPolicy for NoTagging {
    #[inline(always)]
    unsafe fn tag_allocation(&self, _ptr: *mut u8, _size: usize) {}

    #[inline(always)]
    unsafe fn tag_deallocation(&self, _ptr: *mut u8, _size: usize) {}
}

/// Fills with [`ALLOCATED_PATTERN`] on allocation and [`FREED_PATTERN`] on release.
#[derive(Debug, Default, Clone, Copy)]
pub struct SentinelFill;

impl TaggingPolicy for SentinelFill {
    #[inline(always)]
    unsafe fn tag_allocation(&self, ptr: *mut u8, size: usize) {
        unsafe { ptr.write_bytes(ALLOCATED_PATTERN, size) };
    }

    #[inline(always)]
    unsafe fn tag_deallocation(&self, ptr: *mut u8, size: usize) {
        unsafe { ptr.write_bytes(FREED_PATTERN, size) };
    }
}
