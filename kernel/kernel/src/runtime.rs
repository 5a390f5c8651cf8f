//! Process-wide runtime state: the active paging setup and the scheduler.
//!
//! The subsystem crates take their collaborators as explicit parameters;
//! this module is where the machine's single instances actually live, so
//! interrupt handlers (which receive no parameters worth having) can find
//! them.

use kernel_addresses::VirtualAddress;
use kernel_frames::PoolRegistry;
use kernel_paging::{AddressSpace, PageFaultCode, PagingConfig, SelfMapWindow};
use kernel_sync::{SpinLock, SyncOnceCell};

/// Everything fault service needs, bundled once paging is initialized.
pub struct PagingRuntime {
    pub space: SpinLock<AddressSpace>,
    pub registry: SpinLock<PoolRegistry>,
    pub config: PagingConfig,
}

static PAGING: SyncOnceCell<PagingRuntime> = SyncOnceCell::new();

/// Install the paging runtime. Once; bring-up only.
pub fn install_paging(
    space: AddressSpace,
    registry: PoolRegistry,
    config: PagingConfig,
) -> &'static PagingRuntime {
    let runtime = PagingRuntime {
        space: SpinLock::new(space),
        registry: SpinLock::new(registry),
        config,
    };
    assert!(
        PAGING.set(runtime).is_ok(),
        "paging runtime installed twice"
    );
    PAGING.get().expect("installed above")
}

/// The installed paging runtime, if bring-up has run.
#[must_use]
pub fn paging() -> Option<&'static PagingRuntime> {
    PAGING.get()
}

/// Page-fault entry: resolve a lazy mapping or die.
///
/// Protection violations and stray addresses are kernel bugs — the error
/// kinds the design declares unrecoverable — so they halt right here.
pub fn handle_page_fault(code: PageFaultCode, address: VirtualAddress) {
    let Some(paging) = PAGING.get() else {
        panic!("page fault at {address} before paging was initialized");
    };

    // SAFETY: faults only fire with paging enabled, and bring-up installed
    // the self-map before that.
    let window = unsafe { SelfMapWindow::new() };
    let result = paging.space.lock().handle_fault(
        &window,
        code,
        address,
        &mut paging.registry.lock(),
        &paging.config,
    );
    if let Err(fault) = result {
        panic!("unrecoverable page fault: {fault}");
    }
}

/// The machine's scheduler: round-robin over the one ready queue, fed by
/// the timer gate.
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub fn round_robin()
-> &'static kernel_sched::RoundRobinScheduler<'static, kernel_ports::X86PortBus> {
    static SCHEDULER: SyncOnceCell<
        kernel_sched::RoundRobinScheduler<'static, kernel_ports::X86PortBus>,
    > = SyncOnceCell::new();
    // SAFETY: the kernel runs at ring 0 and the PIC command port is only
    // touched through this scheduler.
    SCHEDULER.get_or_init(|| kernel_sched::RoundRobinScheduler::new(unsafe {
        kernel_ports::X86PortBus::new()
    }))
}
