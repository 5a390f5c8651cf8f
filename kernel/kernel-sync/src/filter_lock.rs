use core::hint::spin_loop;
use core::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

/// Largest thread id the port lock accepts.
pub const MAX_THREADS: usize = 1000;

/// The filter lock sized for the whole thread population, used for the
/// shared IDE port.
pub type PortLock = FilterLock<MAX_THREADS>;

/// Peterson's filter lock for up to `N` threads.
///
/// The classic generalization of Peterson's two-thread algorithm: `N − 1`
/// levels, where at each level at least one contender is filtered out by
/// being the most recent `victim`. A thread that has passed every level
/// holds the lock; release resets its level to idle (−1).
///
/// Guarantees mutual exclusion and bounded overtaking (at most `N − 1`
/// threads pass a waiter) — enough fairness for a teaching kernel's disk
/// port. Correct on a single CPU with cooperative or timer preemption;
/// the algorithm assumes sequentially consistent memory and is **not**
/// meant for SMP hardware.
///
/// Thread ids index the arrays directly and must be unique among
/// concurrent contenders and `< N`.
pub struct FilterLock<const N: usize> {
    /// Highest level each thread has entered; −1 when idle.
    level: [AtomicIsize; N],
    /// Most recent thread to enter each level. Only `N − 1` slots are
    /// meaningful; the array is sized `N` because const generics cannot
    /// subtract here.
    victim: [AtomicUsize; N],
}

impl<const N: usize> FilterLock<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: [const { AtomicIsize::new(-1) }; N],
            victim: [const { AtomicUsize::new(0) }; N],
        }
    }

    /// Acquire the lock as thread `tid`, spinning through the levels.
    ///
    /// The returned guard releases on drop. Panics if `tid >= N`.
    pub fn lock(&self, tid: usize) -> FilterLockGuard<'_, N> {
        assert!(tid < N, "thread id {tid} out of range for filter lock");
        for lvl in 0..N - 1 {
            self.level[tid].store(lvl as isize, Ordering::SeqCst);
            self.victim[lvl].store(tid, Ordering::SeqCst);
            // Wait while some other thread sits at this level or above and
            // we are still the level's victim. SeqCst gives the store-load
            // fence between the victim write and the level scan that the
            // algorithm requires.
            while self.victim[lvl].load(Ordering::SeqCst) == tid && self.contended(lvl, tid) {
                spin_loop();
            }
        }
        FilterLockGuard { lock: self, tid }
    }

    /// Whether any other thread has entered level `lvl` or higher.
    fn contended(&self, lvl: usize, tid: usize) -> bool {
        self.level
            .iter()
            .enumerate()
            .any(|(other, level)| other != tid && level.load(Ordering::SeqCst) >= lvl as isize)
    }

    fn unlock(&self, tid: usize) {
        self.level[tid].store(-1, Ordering::SeqCst);
    }
}

impl<const N: usize> Default for FilterLock<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the filter lock for one thread; dropping releases it.
pub struct FilterLockGuard<'a, const N: usize> {
    lock: &'a FilterLock<N>,
    tid: usize,
}

impl<const N: usize> FilterLockGuard<'_, N> {
    #[must_use]
    pub const fn thread(&self) -> usize {
        self.tid
    }
}

impl<const N: usize> Drop for FilterLockGuard<'_, N> {
    fn drop(&mut self) {
        self.lock.unlock(self.tid);
    }
}
