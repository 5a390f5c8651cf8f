//! # Two-level paging with on-demand mapping
//!
//! Per-address-space page directories for a 32-bit x86 machine, with page
//! faults serviced by lazy frame allocation.
//!
//! ## x86 (32-bit) virtual address → physical address walk
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | directory | table | offset |
//! ```
//!
//! The CPU indexes the **page directory** (CR3 holds its physical base)
//! with the top ten bits, the selected **page table** with the next ten,
//! and the resulting 4 KiB frame with the offset. Both levels hold 1024
//! four-byte entries ([`PageTableEntry`]).
//!
//! ## The self-mapping
//!
//! Once paging is on, physical frames are no longer addressable as such —
//! including the page tables themselves. The classic x86 escape is to
//! point the **last directory slot at the directory**: translation through
//! slot 1023 then re-enters the directory, so
//!
//! - `0xFFFF_F000` always reaches the current page directory, and
//! - `(0x3FF << 22) | (pde << 12)` reaches the page table behind
//!   directory slot `pde`.
//!
//! [`AddressSpace::new`] installs this entry; fault service and page
//! release depend on it. The [`TableWindow`] trait captures "reach the
//! tables of the running address space" so the same fault logic drives the
//! real window ([`SelfMapWindow`]) and a simulated MMU in tests.
//!
//! ## Fault service
//!
//! A not-present fault inside a registered [`VmPool`] span allocates one
//! frame from the process pool: either as the missing leaf page, or as a
//! fresh page table (all entries not-present-but-writable) linked into the
//! directory — in which case the access re-faults once and takes the leaf
//! branch. Protection violations and addresses outside every pool are
//! unrecoverable and bubble up as errors for the ISR to die on.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod address_space;
mod entry;
mod fault;
mod table;
mod vm_pool;
mod window;

pub use address_space::{AddressSpace, PagingConfig, PagingError};
pub use entry::PageTableEntry;
pub use fault::{FaultError, FaultResolution, PageFaultCode};
pub use table::{ENTRIES_PER_TABLE, PageTableFrame};
pub use vm_pool::VmPool;
pub use window::{DIRECTORY_WINDOW, SELF_MAP_SLOT, SelfMapWindow, TableWindow, table_window};

use core::sync::atomic::{AtomicBool, Ordering};

static PAGING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Whether [`enable_paging`] has run.
#[must_use]
pub fn paging_enabled() -> bool {
    PAGING_ENABLED.load(Ordering::Acquire)
}

/// Turn on address translation by setting CR0.PG.
///
/// # Safety
/// CR3 must already hold a directory whose mappings cover every address
/// the kernel touches next (the identity-mapped shared region at least),
/// and the self-map entry must be installed. Ring 0 only.
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub unsafe fn enable_paging() {
    use kernel_registers::{Cr0, LoadRegister, StoreRegister};

    unsafe {
        let cr0 = Cr0::load().with_paging(true);
        cr0.store();
    }
    PAGING_ENABLED.store(true, Ordering::Release);
    log::info!("paging enabled");
}
