use crate::pool::ContiguousFramePool;
use alloc::vec::Vec;
use core::fmt;
use kernel_addresses::FrameNumber;
use log::trace;

/// Identifies a pool inside a [`PoolRegistry`].
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PoolHandle(usize);

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Owns every frame pool of the process, in registration order.
///
/// Frames are released by bare frame number — at release time nobody
/// remembers which pool an allocation came from — so some directory has to
/// map frame numbers back to pools. Components address "their" pool
/// through a [`PoolHandle`]; release walks the pools and dispatches to the
/// one whose range contains the frame.
pub struct PoolRegistry {
    pools: Vec<ContiguousFramePool>,
}

impl PoolRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self { pools: Vec::new() }
    }

    /// Take ownership of `pool` and return its handle.
    pub fn register(&mut self, pool: ContiguousFramePool) -> PoolHandle {
        let handle = PoolHandle(self.pools.len());
        trace!(
            "registered {handle:?}: frames [{}..{})",
            pool.base_frame(),
            pool.base_frame() + pool.n_frames()
        );
        self.pools.push(pool);
        handle
    }

    #[must_use]
    pub fn pool(&self, handle: PoolHandle) -> &ContiguousFramePool {
        &self.pools[handle.0]
    }

    pub fn pool_mut(&mut self, handle: PoolHandle) -> &mut ContiguousFramePool {
        &mut self.pools[handle.0]
    }

    /// Allocate a run of `n` frames from the pool behind `handle`.
    pub fn get_frames(&mut self, handle: PoolHandle, n: u32) -> Option<FrameNumber> {
        self.pool_mut(handle).get_frames(n)
    }

    /// Release the run starting at `first`, whichever pool owns it.
    ///
    /// Panics if no registered pool contains the frame.
    pub fn release_frames(&mut self, first: FrameNumber) {
        for pool in &mut self.pools {
            if pool.contains(first) {
                pool.release_frames(first);
                return;
            }
        }
        panic!("frame {first} belongs to no registered pool");
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
