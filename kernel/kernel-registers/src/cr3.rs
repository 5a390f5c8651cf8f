#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::{LoadRegister, StoreRegister};
use bitfield_struct::bitfield;
use kernel_addresses::PhysicalAddress;

/// CR3 — page-directory base register.
///
/// Holds the physical base address of the page directory plus the
/// cache-control flags for directory walks. Writing CR3 also flushes the
/// non-global TLB entries, which is how this kernel invalidates stale
/// translations.
#[bitfield(u32)]
pub struct Cr3 {
    /// Bits 0–2 — reserved (must be 0).
    #[bits(3)]
    reserved0: u8,

    /// Bit 3 — PWT: write-through caching for directory accesses.
    pub pwt: bool,

    /// Bit 4 — PCD: cache disable for directory accesses.
    pub pcd: bool,

    /// Bits 5–11 — reserved (must be 0).
    #[bits(7)]
    reserved1: u8,

    /// Bits 12–31 — page-directory physical base >> 12.
    #[bits(20)]
    directory_base_4k: u32,
}

impl Cr3 {
    /// Create a `Cr3` value from the directory's physical base address.
    ///
    /// The base must be 4 KiB-aligned; CR3 receives the directory base
    /// itself, never the contents of its first entry.
    #[must_use]
    pub fn from_directory_phys(directory: PhysicalAddress) -> Self {
        debug_assert_eq!(
            directory.as_u32() & 0xfff,
            0,
            "directory base must be 4K-aligned"
        );
        Self::new().with_directory_base_4k(directory.as_u32() >> 12)
    }

    /// Full physical address of the page directory.
    #[must_use]
    pub const fn directory_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.directory_base_4k() << 12)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegister for Cr3 {
    unsafe fn load() -> Self {
        let cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl StoreRegister for Cr3 {
    unsafe fn store(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_directory_base() {
        let pa = PhysicalAddress::new(0x0020_0000);
        let cr3 = Cr3::from_directory_phys(pa);
        assert_eq!(cr3.directory_phys(), pa);
        assert_eq!(cr3.into_bits(), 0x0020_0000);
    }
}
