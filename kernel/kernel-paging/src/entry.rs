use bitfield_struct::bitfield;
use kernel_addresses::FrameNumber;

/// A 32-bit page-directory or page-table entry.
///
/// Both levels share one layout: the physical frame number of the pointee
/// in bits 31:12 and flag bits below. This kernel writes exactly two
/// shapes: present-and-writable mappings (`… | 0b011`) and the
/// not-present-but-writable placeholder (`0x2`) that marks a slot as
/// expecting lazy allocation.
#[bitfield(u32)]
pub struct PageTableEntry {
    /// Bit 0 — P: translation may use this entry; clear faults.
    pub present: bool,

    /// Bit 1 — R/W: writes allowed (kernel ignores this at CPL 0 unless
    /// CR0.WP is set).
    pub writable: bool,

    /// Bit 2 — U/S: user-mode access allowed; this kernel maps
    /// supervisor-only.
    pub user: bool,

    /// Bit 3 — PWT: write-through caching.
    pub write_through: bool,

    /// Bit 4 — PCD: cache disable.
    pub cache_disable: bool,

    /// Bit 5 — A: set by the CPU on first access.
    pub accessed: bool,

    /// Bit 6 — D: set by the CPU on first write (page-table level only).
    pub dirty: bool,

    /// Bits 7–11 — PS/G/available; unused by this kernel.
    #[bits(5)]
    __: u8,

    /// Bits 12–31 — physical frame number of the pointee.
    #[bits(20)]
    frame: u32,
}

impl PageTableEntry {
    /// A present, writable, supervisor mapping of `frame` (`P|R/W`).
    #[must_use]
    pub const fn map(frame: FrameNumber) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_frame(frame.as_u32())
    }

    /// The not-present-but-writable placeholder (`0x2`): no translation,
    /// but the slot is earmarked for lazy allocation.
    #[must_use]
    pub const fn placeholder() -> Self {
        Self::new().with_writable(true)
    }

    /// Frame number of the pointee; meaningful only when present.
    #[must_use]
    pub const fn frame_number(self) -> FrameNumber {
        FrameNumber::new(self.frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_encodes_frame_and_low_flags() {
        let entry = PageTableEntry::map(FrameNumber::new(0x12345));
        assert_eq!(entry.into_bits(), 0x1234_5003);
        assert!(entry.present());
        assert!(entry.writable());
        assert!(!entry.user());
        assert_eq!(entry.frame_number(), FrameNumber::new(0x12345));
    }

    #[test]
    fn placeholder_is_raw_0x2() {
        assert_eq!(PageTableEntry::placeholder().into_bits(), 0x2);
        assert!(!PageTableEntry::placeholder().present());
    }
}
