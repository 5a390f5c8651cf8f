use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// A spin-based write-once cell.
///
/// Bring-up wires components together after their statics exist (the
/// scheduler learns about the disk, the fault path learns about the active
/// address space); this cell holds such a late binding. The first `set`
/// wins, readers observe the value with acquire ordering.
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

// Safety: the value is written once before READY is published; afterwards
// access is shared and read-only.
unsafe impl<T: Sync> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// `Some(&T)` once the cell has been set.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY is only published after the write completed.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Store `value`; fails with the rejected value if the cell is already
    /// set (or being set).
    pub fn set(&self, value: T) -> Result<(), T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        unsafe {
            (*self.value.get()).write(value);
        }
        // Publish the value before marking READY.
        self.state.store(READY, Ordering::Release);
        Ok(())
    }

    /// Initialize at most once and return the stored value.
    ///
    /// A concurrent caller that loses the race spins until the winner has
    /// published; the initializer must not panic.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(value) = self.get() {
            return value;
        }
        match self.set(init()) {
            Ok(()) => {}
            Err(_) => {
                // Lost the race; wait for the winner to publish.
                while self.state.load(Ordering::Acquire) != READY {
                    spin_loop();
                }
            }
        }
        // SAFETY: READY at this point either way.
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_set_wins() {
        let cell = SyncOnceCell::new();
        assert!(cell.get().is_none());
        assert!(cell.set(1).is_ok());
        assert_eq!(cell.set(2), Err(2));
        assert_eq!(cell.get(), Some(&1));
    }

    #[test]
    fn get_or_init_returns_existing() {
        let cell = SyncOnceCell::new();
        assert_eq!(*cell.get_or_init(|| 7), 7);
        assert_eq!(*cell.get_or_init(|| unreachable!()), 7);
    }
}
