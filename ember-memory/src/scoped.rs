//! Module `scoped`
//!
//! [`ArenaBox`] owns a single value placed in memory obtained from an
//! [`Allocator`]. The value is dropped and its block released when the box goes
//! out of scope, so early returns and panics cannot leak it.

use std::{
    fmt,
    mem::{ManuallyDrop, align_of, size_of},
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

use crate::{AllocError, Allocator, SourceLocation};

/// A value living in an arena, released on drop.
///
/// For allocators that cannot release single blocks (linear arenas) only the value's
/// destructor runs on drop; the bytes come back with the next `reset`.
pub struct ArenaBox<'a, T, Al: Allocator + ?Sized> {
    ptr: NonNull<T>,
    allocator: &'a Al,
}

impl<'a, T, Al: Allocator + ?Sized> ArenaBox<'a, T, Al> {
    /// Moves `value` into a fresh block of `allocator`, attributed to the caller.
    ///
    /// # Errors
    /// Propagates the allocator's error; `value` is dropped in that case.
    #[track_caller]
    pub fn new_in(value: T, allocator: &'a Al) -> Result<Self, AllocError> {
        let source = SourceLocation::caller();
        let raw = allocator.allocate_tracked(size_of::<T>().max(1), align_of::<T>(), source)?;
        let ptr = raw.cast::<T>();

        // SAFETY: fresh block, sized and aligned for `T`.
        unsafe { ptr.as_ptr().write(value) };

        Ok(Self { ptr, allocator })
    }

    /// Moves the value out and releases its block.
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);

        // SAFETY: the block holds an initialized `T` that nobody else reads again.
        let value = unsafe { this.ptr.as_ptr().read() };
        release(this.allocator, this.ptr.cast());

        value
    }

    /// Address of the value inside the arena.
    #[must_use]
    pub fn as_ptr(this: &Self) -> NonNull<T> {
        this.ptr
    }
}

fn release<Al: Allocator + ?Sized>(allocator: &Al, ptr: NonNull<u8>) {
    if !allocator.can_deallocate() {
        return;
    }

    // SAFETY: `ptr` came from `allocator` and is released exactly once.
    if let Err(err) = unsafe { allocator.deallocate(ptr) } {
        log::error!(
            "[{}] failed to release boxed value at {:p}: {}",
            allocator.name(),
            ptr.as_ptr(),
            err
        );
    }
}

impl<T, Al: Allocator + ?Sized> Deref for ArenaBox<'_, T, Al> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, Al: Allocator + ?Sized> DerefMut for ArenaBox<'_, T, Al> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: fmt::Debug, Al: Allocator + ?Sized> fmt::Debug for ArenaBox<'_, T, Al> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, Al: Allocator + ?Sized> Drop for ArenaBox<'_, T, Al> {
    fn drop(&mut self) {
        unsafe { self.ptr.as_ptr().drop_in_place() };
        release(self.allocator, self.ptr.cast());
    }
}
