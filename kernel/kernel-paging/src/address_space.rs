use crate::entry::PageTableEntry;
use crate::fault::{FaultError, FaultResolution, PageFaultCode};
use crate::table::{ENTRIES_PER_TABLE, PageTableFrame};
use crate::window::{SELF_MAP_SLOT, TableWindow};
use alloc::vec::Vec;
use kernel_addresses::{FrameNumber, PAGE_SIZE, PhysMapper, VirtualAddress};
use kernel_frames::{PoolHandle, PoolRegistry};
use log::{info, trace};

/// Which frame pools serve paging, fixed at bring-up.
///
/// Directory and table frames for new address spaces come from the kernel
/// pool; lazily mapped pages and their tables come from the process pool.
#[derive(Copy, Clone, Debug)]
pub struct PagingConfig {
    pub kernel_pool: PoolHandle,
    pub process_pool: PoolHandle,
    /// Bytes identity-mapped at the bottom of every address space. Must
    /// fit the first page table (at most 4 MiB).
    pub shared_size: u32,
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum PagingError {
    #[error("out of physical frames while building an address space")]
    OutOfFrames,
}

/// A registered virtual-memory pool's span, kept for the fault-time
/// legitimacy walk.
#[derive(Copy, Clone, Debug)]
struct VmSpan {
    base: VirtualAddress,
    size: u32,
}

impl VmSpan {
    /// Deliberately coarse and inclusive at the top, matching
    /// [`crate::VmPool::is_legitimate`].
    fn contains(&self, address: VirtualAddress) -> bool {
        address >= self.base
            && (address.as_u32() as u64) <= self.base.as_u32() as u64 + self.size as u64
    }
}

/// One process's two-level page table.
pub struct AddressSpace {
    directory: FrameNumber,
    spans: Vec<VmSpan>,
}

impl AddressSpace {
    /// Build a fresh directory: the shared region identity-mapped through
    /// the first page table, slots 1..=1022 as lazy placeholders, and the
    /// self-map in slot 1023.
    ///
    /// Runs before (or outside) this address space is active, so the new
    /// frames are written through `mapper`, not through a window.
    pub fn new<M: PhysMapper>(
        mapper: &M,
        config: &PagingConfig,
        registry: &mut PoolRegistry,
    ) -> Result<Self, PagingError> {
        let directory_frame = registry
            .get_frames(config.kernel_pool, 1)
            .ok_or(PagingError::OutOfFrames)?;
        let table_frame = registry
            .get_frames(config.process_pool, 1)
            .ok_or(PagingError::OutOfFrames)?;

        let shared_pages = (config.shared_size / PAGE_SIZE) as usize;
        assert!(
            shared_pages <= ENTRIES_PER_TABLE,
            "shared region exceeds the first page table"
        );

        // Frame i backs page i in the shared region.
        let table: &mut PageTableFrame = unsafe { mapper.phys_to_mut(table_frame.base()) };
        for i in 0..shared_pages {
            table.set_entry(i, PageTableEntry::map(FrameNumber::new(i as u32)));
        }
        for i in shared_pages..ENTRIES_PER_TABLE {
            table.set_entry(i, PageTableEntry::placeholder());
        }

        let directory: &mut PageTableFrame = unsafe { mapper.phys_to_mut(directory_frame.base()) };
        directory.set_entry(0, PageTableEntry::map(table_frame));
        for i in 1..SELF_MAP_SLOT {
            directory.set_entry(i, PageTableEntry::placeholder());
        }
        directory.set_entry(SELF_MAP_SLOT, PageTableEntry::map(directory_frame));

        info!("address space built, directory at frame {directory_frame}");
        Ok(Self {
            directory: directory_frame,
            spans: Vec::new(),
        })
    }

    /// Physical frame of the page directory (what CR3 receives).
    #[must_use]
    pub const fn directory_frame(&self) -> FrameNumber {
        self.directory
    }

    /// Make this address space current: CR3 gets the **directory base**.
    ///
    /// # Safety
    /// The directory and every mapping reachable through it must be valid;
    /// ring 0 only. The caller keeps track of which space is active.
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    pub unsafe fn load(&self) {
        use kernel_registers::{Cr3, StoreRegister};

        unsafe {
            Cr3::from_directory_phys(self.directory.base()).store();
        }
        log::debug!("loaded directory frame {}", self.directory);
    }

    /// Record a virtual-memory pool's span for the fault legitimacy walk
    /// (tail append, construction order).
    pub(crate) fn register_span(&mut self, base: VirtualAddress, size: u32) {
        trace!("registered VM span [{base}, +{size:#x})");
        self.spans.push(VmSpan { base, size });
    }

    /// Service a page fault against this (current) address space.
    ///
    /// Decides between the two lazy-allocation branches, or refuses with
    /// the fatal [`FaultError`]s; see the crate docs for the protocol.
    pub fn handle_fault<W: TableWindow>(
        &self,
        window: &W,
        code: PageFaultCode,
        address: VirtualAddress,
        registry: &mut PoolRegistry,
        config: &PagingConfig,
    ) -> Result<FaultResolution, FaultError> {
        if code.protection_violation() {
            return Err(FaultError::ProtectionViolation(address));
        }
        if !self.spans.iter().any(|span| span.contains(address)) {
            return Err(FaultError::OutsideAllPools(address));
        }

        let pde = address.directory_index();
        let pte = address.table_index();

        // SAFETY: fault service is the only table writer while it runs
        // (interrupts are off inside the handler, single CPU).
        let directory = unsafe { window.directory() };

        if directory.entry(pde.as_usize()).present() {
            let frame = registry
                .get_frames(config.process_pool, 1)
                .ok_or(FaultError::OutOfFrames)?;
            let table = unsafe { window.table(pde) };
            table.set_entry(pte.as_usize(), PageTableEntry::map(frame));
            trace!("fault at {address}: mapped frame {frame} via {pde:?}/{pte:?}");
            Ok(FaultResolution::MappedPage)
        } else {
            let frame = registry
                .get_frames(config.process_pool, 1)
                .ok_or(FaultError::OutOfFrames)?;
            // Link first: the window (like the real self-map) reaches a
            // table only through a present directory slot.
            directory.set_entry(pde.as_usize(), PageTableEntry::map(frame));
            let table = unsafe { window.table(pde) };
            table.fill(PageTableEntry::placeholder());
            trace!("fault at {address}: new page table in frame {frame} for {pde:?}");
            Ok(FaultResolution::CreatedTable)
        }
    }

    /// Drop the mapping for the page containing `address` and release its
    /// frame back to whichever pool owns it.
    ///
    /// The virtual→physical lookup goes through the self-map window; only
    /// the frame release consults the global registry. Pages that were
    /// never touched (placeholder entries) have nothing to release.
    pub fn free_page<W: TableWindow>(
        &self,
        window: &W,
        address: VirtualAddress,
        registry: &mut PoolRegistry,
    ) {
        let pde = address.directory_index();
        let pte = address.table_index();

        // SAFETY: single table writer, as in handle_fault.
        let directory = unsafe { window.directory() };
        if !directory.entry(pde.as_usize()).present() {
            return;
        }
        let table = unsafe { window.table(pde) };
        let entry = table.entry(pte.as_usize());
        if !entry.present() {
            return;
        }

        registry.release_frames(entry.frame_number());
        table.set_entry(pte.as_usize(), PageTableEntry::placeholder());
        window.flush_tlb();
        trace!("freed page {}", address.page_base());
    }
}
