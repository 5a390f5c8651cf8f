//! Interrupt masking for single-CPU atomic sections.
//!
//! Ready-queue and I/O-queue mutation must not be torn by the timer or
//! disk interrupt, so those sections run with interrupts disabled. The
//! [`IrqGuard`] snapshots EFLAGS.IF, executes `cli`, and restores the
//! prior state on drop — nested guards therefore compose correctly.
//!
//! On hosted builds (no `asm` feature) the guard is a no-op so scheduler
//! and driver logic can run under a test harness; the queue locks still
//! provide mutual exclusion there.

/// Returns the current EFLAGS value (via `pushfd`/`pop`).
///
/// Bit 9 (`IF`) indicates whether interrupts are enabled.
#[cfg(all(feature = "asm", target_arch = "x86"))]
#[inline]
#[must_use]
pub fn eflags() -> u32 {
    let flags: u32;
    unsafe {
        core::arch::asm!("pushfd; pop {}", out(reg) flags, options(nostack, preserves_flags));
    }
    flags
}

/// Whether maskable interrupts are currently enabled.
#[cfg(all(feature = "asm", target_arch = "x86"))]
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    eflags() & (1 << 9) != 0
}

/// Disable maskable interrupts (`cli`). Requires a privileged context.
#[cfg(all(feature = "asm", target_arch = "x86"))]
#[inline]
pub fn disable_interrupts() {
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
}

/// Enable maskable interrupts (`sti`). Requires a privileged context.
#[cfg(all(feature = "asm", target_arch = "x86"))]
#[inline]
pub fn enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

#[cfg(not(all(feature = "asm", target_arch = "x86")))]
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    false
}

#[cfg(not(all(feature = "asm", target_arch = "x86")))]
#[inline]
pub fn disable_interrupts() {}

#[cfg(not(all(feature = "asm", target_arch = "x86")))]
#[inline]
pub fn enable_interrupts() {}

/// RAII guard: disables interrupts on creation, restores the previous
/// state on drop.
pub struct IrqGuard {
    /// IF state when the guard was created.
    were_enabled: bool,
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let were_enabled = interrupts_enabled();
        if were_enabled {
            disable_interrupts();
        }
        Self { were_enabled }
    }
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            enable_interrupts();
        }
    }
}
