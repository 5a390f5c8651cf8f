//! # Kernel synchronization primitives
//!
//! A spin lock for queue-sized critical sections, a once cell for late
//! bring-up wiring, an interrupt guard for atomic sections on a single
//! CPU, and Peterson's filter lock for serializing the shared IDE port
//! across cooperating threads.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;

mod filter_lock;
mod spin_lock;
mod sync_once_cell;

pub use filter_lock::{FilterLock, FilterLockGuard, MAX_THREADS, PortLock};
pub use irq::IrqGuard;
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
