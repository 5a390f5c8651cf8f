//! Whole-machine scenarios: the real bring-up wiring against simulated
//! physical memory, from frame pools up to lazily mapped user regions.

use kernel::init;
use kernel_addresses::{DirectoryIndex, FrameNumber, PhysMapper, PhysicalAddress, VirtualAddress};
use kernel_frames::PoolRegistry;
use kernel_info::memory as layout;
use kernel_paging::{
    AddressSpace, PageFaultCode, PageTableFrame, SELF_MAP_SLOT, TableWindow, VmPool,
};

const FRAME_SIZE: u32 = 4096;

#[repr(align(4096))]
struct Frame4K([u8; FRAME_SIZE as usize]);

struct SimPhys {
    first_frame: u32,
    frames: Vec<Frame4K>,
}

impl SimPhys {
    /// Enough memory for the full kernel-info layout.
    fn machine() -> Self {
        let first = layout::KERNEL_POOL_BASE_FRAME;
        let last = layout::PROCESS_POOL_BASE_FRAME + layout::PROCESS_POOL_FRAMES;
        let mut frames = Vec::with_capacity((last - first) as usize);
        for _ in first..last {
            frames.push(Frame4K([0; FRAME_SIZE as usize]));
        }
        Self {
            first_frame: first,
            frames,
        }
    }

    fn byte_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        let index = (pa.frame().as_u32() - self.first_frame) as usize;
        let base = unsafe { self.frames.as_ptr().add(index) } as *mut u8;
        unsafe { base.add(pa.frame_offset() as usize) }
    }

    fn byte(&self, pa: PhysicalAddress) -> u8 {
        unsafe { *self.byte_ptr(pa) }
    }

    fn set_byte(&self, pa: PhysicalAddress, value: u8) {
        unsafe { *self.byte_ptr(pa) = value }
    }
}

impl PhysMapper for SimPhys {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        // Whole-frame views only; offsets are the byte accessors' job.
        debug_assert_eq!(pa.frame_offset(), 0);
        let index = (pa.frame().as_u32() - self.first_frame) as usize;
        let ptr = unsafe { self.frames.as_ptr().add(index) } as *mut T;
        unsafe { &mut *ptr }
    }
}

struct SimMmu<'a> {
    phys: &'a SimPhys,
    directory: FrameNumber,
}

impl TableWindow for SimMmu<'_> {
    unsafe fn directory<'b>(&self) -> &'b mut PageTableFrame {
        unsafe { self.phys.phys_to_mut(self.directory.base()) }
    }

    unsafe fn table<'b>(&self, index: DirectoryIndex) -> &'b mut PageTableFrame {
        let entry = unsafe { self.directory().entry(index.as_usize()) };
        assert!(entry.present());
        unsafe { self.phys.phys_to_mut(entry.frame_number().base()) }
    }

    fn flush_tlb(&self) {}
}

/// Translate like the MMU; `None` when the walk hits a non-present entry.
fn translate(mmu: &SimMmu<'_>, address: VirtualAddress) -> Option<PhysicalAddress> {
    let directory = unsafe { mmu.directory() };
    let pde = directory.entry(address.directory_index().as_usize());
    if !pde.present() {
        return None;
    }
    let table = unsafe { mmu.table(address.directory_index()) };
    let pte = table.entry(address.table_index().as_usize());
    if !pte.present() {
        return None;
    }
    Some(pte.frame_number().base() + address.page_offset())
}

/// Fault-and-retry access, as the CPU would drive it.
fn touch(
    space: &AddressSpace,
    mmu: &SimMmu<'_>,
    registry: &mut PoolRegistry,
    config: &kernel_paging::PagingConfig,
    address: VirtualAddress,
) -> u32 {
    let mut faults = 0;
    while translate(mmu, address).is_none() {
        faults += 1;
        assert!(faults <= 3, "access to {address} does not converge");
        space
            .handle_fault(mmu, PageFaultCode::new(), address, registry, config)
            .expect("fault service");
    }
    faults
}

#[test]
fn bring_up_accounts_for_every_reserved_frame() {
    let phys = SimPhys::machine();
    let mut registry = PoolRegistry::new();
    let config = init::init_frame_pools(&phys, &mut registry);

    // Kernel pool: its own bitmap frame plus the process pool's info frame.
    assert_eq!(
        registry.pool(config.kernel_pool).free_count(),
        layout::KERNEL_POOL_FRAMES - 2
    );
    assert_eq!(
        registry.pool(config.process_pool).free_count(),
        layout::PROCESS_POOL_FRAMES
    );

    let space = AddressSpace::new(&phys, &config, &mut registry).expect("address space");

    // One more kernel frame for the directory, one process frame for the
    // shared-region table.
    assert_eq!(
        registry.pool(config.kernel_pool).free_count(),
        layout::KERNEL_POOL_FRAMES - 3
    );
    assert_eq!(
        registry.pool(config.process_pool).free_count(),
        layout::PROCESS_POOL_FRAMES - 1
    );

    // The self-map is in place.
    let mmu = SimMmu {
        phys: &phys,
        directory: space.directory_frame(),
    };
    let directory = unsafe { mmu.directory() };
    assert_eq!(
        directory.entry(SELF_MAP_SLOT).frame_number(),
        space.directory_frame()
    );

    // The shared region is identity-mapped: virtual == physical below it.
    for probe in [0x0000_0000_u32, 0x0000_1000, layout::SHARED_SIZE - 0x1000] {
        assert_eq!(
            translate(&mmu, VirtualAddress::new(probe)),
            Some(PhysicalAddress::new(probe))
        );
    }
    assert_eq!(translate(&mmu, VirtualAddress::new(layout::SHARED_SIZE)), None);
}

#[test]
fn data_written_through_a_lazy_region_persists() {
    let phys = SimPhys::machine();
    let mut registry = PoolRegistry::new();
    let config = init::init_frame_pools(&phys, &mut registry);
    let mut space = AddressSpace::new(&phys, &config, &mut registry).expect("address space");

    let mut pool = VmPool::new(
        VirtualAddress::new(0x0080_0000),
        0x0040_0000,
        config.process_pool,
        &mut space,
    );

    let region = pool.allocate(0x3000).expect("allocate");
    let mmu = SimMmu {
        phys: &phys,
        directory: space.directory_frame(),
    };

    // First touch faults the table in, then the page; later pages in the
    // same region fault once each.
    assert_eq!(touch(&space, &mmu, &mut registry, &config, region), 2);
    assert_eq!(
        touch(&space, &mmu, &mut registry, &config, region + 0x1000),
        1
    );
    assert_eq!(
        touch(&space, &mmu, &mut registry, &config, region + 0x2000),
        1
    );

    // Store through the mapping, read back through a fresh translation.
    for (i, offset) in [0_u32, 0x1000, 0x2fff].iter().enumerate() {
        let pa = translate(&mmu, region + *offset).expect("mapped");
        phys.set_byte(pa, 0xa0 + i as u8);
    }
    for (i, offset) in [0_u32, 0x1000, 0x2fff].iter().enumerate() {
        let pa = translate(&mmu, region + *offset).expect("mapped");
        assert_eq!(phys.byte(pa), 0xa0 + i as u8);
    }

    // Release hands the three page frames back.
    let process_free = registry.pool(config.process_pool).free_count();
    pool.release(region, &space, &mmu, &mut registry);
    assert_eq!(
        registry.pool(config.process_pool).free_count(),
        process_free + 3
    );
    assert_eq!(translate(&mmu, region), None);
}

#[test]
fn global_runtime_services_faults() {
    let phys = SimPhys::machine();
    let paging = init::init_memory(&phys);

    let mut space = paging.space.lock();
    let mut pool = VmPool::new(
        VirtualAddress::new(0x0100_0000),
        0x0010_0000,
        paging.config.process_pool,
        &mut space,
    );
    let region = pool.allocate(0x1000).expect("allocate");

    let mmu = SimMmu {
        phys: &phys,
        directory: space.directory_frame(),
    };
    let mut registry = paging.registry.lock();
    assert_eq!(touch(&space, &mmu, &mut registry, &paging.config, region), 2);
    assert_eq!(touch(&space, &mmu, &mut registry, &paging.config, region), 0);
}
