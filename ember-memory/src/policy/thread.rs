use std::{cell::Cell, marker::PhantomData};

use parking_lot::Mutex;

/// Serializes access to an arena's internals.
///
/// # Safety
/// While a value returned by [`lock`](ThreadPolicy::lock) is alive, the arena assumes
/// it is the only code touching its state. Implementations must either provide real
/// mutual exclusion (and then also implement [`SerializedAccess`]) or be `!Sync`.
pub unsafe trait ThreadPolicy: Default {
    type Lock<'a>
    where
        Self: 'a;

    /// Enters the critical section; it ends when the returned value is dropped.
    fn lock(&self) -> Self::Lock<'_>;
}

/// Marker for thread policies that provide mutual exclusion. Only arenas using
/// such a policy can be shared between threads.
///
/// # Safety
/// Two live [`ThreadPolicy::Lock`] values of the same policy instance must never coexist.
pub unsafe trait SerializedAccess: ThreadPolicy + Sync {}

/// No locking at all. Arenas using it are `!Sync`, so the compiler rejects sharing them.
#[derive(Debug, Default)]
pub struct NoGuard {
    _not_sync: PhantomData<Cell<()>>,
}

unsafe impl ThreadPolicy for NoGuard {
    type Lock<'a> = ();

    #[inline(always)]
    fn lock(&self) -> Self::Lock<'_> {}
}

/// One mutex per arena, held for the duration of every operation.
#[derive(Debug, Default)]
pub struct MutexLock {
    mutex: Mutex<()>,
}

unsafe impl ThreadPolicy for MutexLock {
    type Lock<'a> = parking_lot::MutexGuard<'a, ()>;

    #[inline(always)]
    fn lock(&self) -> Self::Lock<'_> {
        self.mutex.lock()
    }
}

unsafe impl SerializedAccess for MutexLock {}

impl MutexLock {
    /// Returns `true` if some thread is inside the critical section right now.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}
