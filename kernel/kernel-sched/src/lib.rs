//! # Cooperative thread scheduling
//!
//! A single global FIFO ready queue on one CPU. Threads run until they
//! yield (or, with the round-robin variant, until the timer yields for
//! them); yielding picks the head of the ready queue and dispatches to it.
//!
//! Queue mutation happens with interrupts disabled so a timer tick cannot
//! tear an enqueue; the dispatch itself runs with interrupts back on.
//!
//! The scheduler also cooperates with the non-blocking disk: a thread
//! waiting for the device parks on the disk's own queue, and every yield
//! asks the attached [`BlockedIo`] source for at most one thread whose
//! I/O has completed, moving it back to the ready queue before selecting.
//! Parked threads therefore cost no CPU and resume in FIFO order.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod queue;
mod round_robin;
mod scheduler;
mod thread;

pub use queue::ThreadQueue;
pub use round_robin::RoundRobinScheduler;
pub use scheduler::{BlockedIo, Scheduler};
pub use thread::{Thread, ThreadId};
