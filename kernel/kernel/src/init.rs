//! Memory bring-up, in the order the machine needs it.

use crate::runtime::{self, PagingRuntime};
use kernel_addresses::{FrameNumber, PhysMapper};
use kernel_frames::{ContiguousFramePool, PoolRegistry};
use kernel_info::memory as layout;
use kernel_paging::{AddressSpace, PagingConfig};
use kernel_qemu::QemuLogger;
use log::{LevelFilter, info};

/// Route the `log` facade to the QEMU debug console. First thing at
/// bring-up, so the rest of it can narrate.
pub fn init_logging(level: LevelFilter) {
    QemuLogger::new(level).init().expect("logger installed twice");
}

/// Build the two frame pools and hand back the paging configuration.
///
/// The kernel pool keeps its bitmap in its own first frame; the process
/// pool sits above the identity-mapped region, so its bitmap borrows
/// frames from the kernel pool (the CPU must be able to reach it before
/// paging is up).
pub fn init_frame_pools<M: PhysMapper>(mapper: &M, registry: &mut PoolRegistry) -> PagingConfig {
    let kernel_pool = registry.register(ContiguousFramePool::new(
        mapper,
        FrameNumber::new(layout::KERNEL_POOL_BASE_FRAME),
        layout::KERNEL_POOL_FRAMES,
        None,
    ));

    let info_frames = ContiguousFramePool::needed_info_frames(layout::PROCESS_POOL_FRAMES);
    let info = registry
        .get_frames(kernel_pool, info_frames)
        .expect("kernel pool exhausted during bring-up");
    let process_pool = registry.register(ContiguousFramePool::new(
        mapper,
        FrameNumber::new(layout::PROCESS_POOL_BASE_FRAME),
        layout::PROCESS_POOL_FRAMES,
        Some(info),
    ));

    info!("frame pools up, process-pool bitmap at frame {info}");
    PagingConfig {
        kernel_pool,
        process_pool,
        shared_size: layout::SHARED_SIZE,
    }
}

/// Full memory bring-up: pools, first address space, paging runtime.
///
/// Returns the installed process-wide runtime; panics if called twice.
pub fn init_memory<M: PhysMapper>(mapper: &M) -> &'static PagingRuntime {
    let mut registry = PoolRegistry::new();
    let config = init_frame_pools(mapper, &mut registry);
    let space = AddressSpace::new(mapper, &config, &mut registry).expect("paging bring-up");
    runtime::install_paging(space, registry, config)
}

/// Point CR3 at the runtime's address space and turn translation on.
///
/// # Safety
/// Single-shot bring-up, ring 0, with the identity-mapped region covering
/// the currently executing code.
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub unsafe fn activate(paging: &PagingRuntime) {
    unsafe {
        paging.space.lock().load();
        kernel_paging::enable_paging();
    }
}
