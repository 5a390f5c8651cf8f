use crate::address_space::AddressSpace;
use crate::window::TableWindow;
use alloc::vec::Vec;
use kernel_addresses::{PAGE_SIZE, VirtualAddress, align_up};
use kernel_frames::{PoolHandle, PoolRegistry};
use log::{debug, trace};

/// An allocated stretch of a pool's virtual range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Region {
    base: VirtualAddress,
    length: u32,
}

/// A per-process virtual-memory pool: carves `[base, base + size)` into
/// bump-allocated regions, above paging.
///
/// Allocation is pure bookkeeping — no page table is touched. Backing
/// frames appear lazily when the region is first accessed and the page
/// fault finds the address inside this pool's span ([`VmPool::new`]
/// registers the span with the address space for exactly that check).
/// Releasing a region hands every backed page to
/// [`AddressSpace::free_page`].
///
/// Region 0 covers the pool's first page and is never handed out: the
/// original layout keeps the pool's own bookkeeping there, so user
/// regions start one page in.
pub struct VmPool {
    base: VirtualAddress,
    size: u32,
    available: u32,
    frame_pool: PoolHandle,
    regions: Vec<Region>,
}

impl VmPool {
    /// Create a pool over `[base, base + size)` backed by `frame_pool`,
    /// and register its span with `space`.
    pub fn new(
        base: VirtualAddress,
        size: u32,
        frame_pool: PoolHandle,
        space: &mut AddressSpace,
    ) -> Self {
        assert!(size >= PAGE_SIZE, "pool smaller than its bookkeeping page");
        space.register_span(base, size);

        let mut regions = Vec::new();
        regions.push(Region {
            base,
            length: PAGE_SIZE,
        });

        debug!("VM pool [{base}, +{size:#x}) ready");
        Self {
            base,
            size,
            available: size - PAGE_SIZE,
            frame_pool,
            regions,
        }
    }

    /// Reserve a region of `bytes`, rounded up to whole pages, directly
    /// after the last region. Returns the region's base, or `None` when
    /// the rounded request exceeds what is left.
    pub fn allocate(&mut self, bytes: u32) -> Option<VirtualAddress> {
        assert!(bytes > 0);
        let rounded = align_up(bytes, PAGE_SIZE);
        if rounded > self.available {
            debug!(
                "VM pool at {}: refused {bytes:#x} byte request, {:#x} available",
                self.base, self.available
            );
            return None;
        }

        let last = self.regions[self.regions.len() - 1];
        let base = last.base + last.length;
        self.regions.push(Region {
            base,
            length: rounded,
        });
        self.available -= rounded;
        trace!("allocated region [{base}, +{rounded:#x})");
        Some(base)
    }

    /// Release the region starting exactly at `start`: free every one of
    /// its pages, then compact the region table.
    ///
    /// Panics if `start` does not begin a region — releasing an address
    /// that was never handed out is a caller bug.
    pub fn release<W: TableWindow>(
        &mut self,
        start: VirtualAddress,
        space: &AddressSpace,
        window: &W,
        registry: &mut PoolRegistry,
    ) {
        let Some(index) = self.regions[1..]
            .iter()
            .position(|region| region.base == start)
            .map(|i| i + 1)
        else {
            panic!("release of {start} which begins no region in this pool");
        };

        let region = self.regions[index];
        let mut page = region.base;
        for _ in 0..region.length / PAGE_SIZE {
            space.free_page(window, page, registry);
            page += PAGE_SIZE;
        }

        self.available += region.length;
        self.regions.remove(index);
        trace!("released region [{start}, +{:#x})", region.length);
    }

    /// Whether `address` lies within this pool's overall span.
    ///
    /// Coarse on purpose: any in-span address is accepted during fault
    /// service, even between regions — an out-of-region but in-pool access
    /// silently gets a page. The upper bound is inclusive, matching the
    /// historical check.
    #[must_use]
    pub fn is_legitimate(&self, address: VirtualAddress) -> bool {
        address >= self.base
            && (address.as_u32() as u64) <= self.base.as_u32() as u64 + self.size as u64
    }

    /// Bytes still available for allocation.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.available
    }

    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// The frame pool that backs this virtual range.
    #[must_use]
    pub const fn frame_pool(&self) -> PoolHandle {
        self.frame_pool
    }
}
