//! # Contiguous physical-frame pools
//!
//! Allocation of **runs** of 4 KiB physical frames out of fixed pool
//! ranges, with release by first-frame number only.
//!
//! A single free/used bit per frame cannot express "this run belongs
//! together", so each frame carries two bits of state: `Free`, `Used`
//! (interior of a run) or `HeadOfSequence` (first frame of a run). The
//! head marker is what lets [`ContiguousFramePool::release_frames`] free
//! an entire allocation from nothing but its first frame number: free the
//! head, then sweep the `Used` frames behind it until the next `Free`,
//! head, or end of pool.
//!
//! The second half of the release contract is that callers do not know
//! which pool a frame came from. The [`PoolRegistry`] owns every pool in
//! construction order and dispatches a bare frame number to the one whose
//! range contains it; components hold copyable [`PoolHandle`]s instead of
//! pool references.
//!
//! The bitmap itself lives in a physical frame — the pool's own first
//! frame by default, or an external frame so a pool can manage memory the
//! CPU cannot reach yet. With two bits per frame, one 4 KiB bitmap frame
//! covers at most 16384 frames (64 MiB); larger pools fail loudly at
//! construction.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod bitmap;
mod pool;
mod registry;

pub use bitmap::FrameState;
pub use pool::{ContiguousFramePool, MAX_FRAMES_PER_POOL};
pub use registry::{PoolHandle, PoolRegistry};
