//! Interrupt-gate glue: thin naked entries that save state, call into the
//! runtime, and `iretd`. IDT installation itself lives with the board
//! bring-up code, not here.

use crate::runtime;
use core::arch::naked_asm;
use kernel_addresses::VirtualAddress;
use kernel_paging::PageFaultCode;

/// IDT vector of the page-fault exception.
pub const PAGE_FAULT_VECTOR: usize = 0x0e;

/// IDT vector the PIC delivers the timer tick on after the usual remap.
pub const TIMER_VECTOR: usize = 0x20;

/// Page-fault gate: grab CR2 and the pushed error code, service the
/// fault, retry the faulting instruction via `iretd`.
///
/// The CPU pushes the error code before entering; cdecl arguments go on
/// the stack right-to-left.
#[unsafe(naked)]
pub extern "C" fn page_fault_gate() {
    naked_asm!(
        "push eax",
        "push ecx",
        "push edx",
        "mov eax, cr2",         // faulting address
        "mov ecx, [esp + 12]",  // error code, under our three pushes
        "push eax",
        "push ecx",
        "call {service}",
        "add esp, 8",
        "pop edx",
        "pop ecx",
        "pop eax",
        "add esp, 4",           // drop the CPU-pushed error code
        "iretd",
        service = sym page_fault_service,
    )
}

extern "C" fn page_fault_service(code: u32, address: u32) {
    runtime::handle_page_fault(
        PageFaultCode::from_bits(code),
        VirtualAddress::new(address),
    );
}

/// Timer gate: end of quantum. The scheduler sends the PIC its EOI
/// before dispatching, so the next tick reaches whichever thread runs.
#[unsafe(naked)]
pub extern "C" fn timer_gate() {
    naked_asm!(
        "push eax",
        "push ecx",
        "push edx",
        "call {tick}",
        "pop edx",
        "pop ecx",
        "pop eax",
        "iretd",
        tick = sym timer_tick,
    )
}

extern "C" fn timer_tick() {
    runtime::round_robin().end_of_quantum();
}
