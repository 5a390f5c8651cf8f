//! # Non-blocking IDE block device
//!
//! Block reads and writes on a primary-channel LBA28 IDE disk via
//! programmed I/O, shaped so that waiting for the device costs no CPU:
//! instead of spinning on the status register, the calling thread parks
//! on the disk's I/O-blocked queue and yields. The scheduler moves it
//! back to the ready queue once the device reports ready (see
//! `kernel-sched`'s `BlockedIo`), and the transfer finishes when the
//! thread runs again.
//!
//! Because several threads interleave on the one set of controller
//! ports, each port phase — command issue, data transfer — runs under a
//! Peterson filter lock keyed by thread id. Single CPU only, like the
//! lock itself.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod ata;
mod nonblocking;

pub use ata::{AtaStatus, BLOCK_SIZE, DataPhaseError, DiskOp, IdeController};
pub use nonblocking::NonBlockingDisk;
