use crate::{DirectoryIndex, PAGE_SIZE, TableIndex};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Virtual memory address (what code dereferences once paging is on).
///
/// Newtype over `u32` to prevent mixing with physical addresses.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u32);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Page-directory index (bits 31:22).
    #[inline]
    #[must_use]
    pub const fn directory_index(self) -> DirectoryIndex {
        DirectoryIndex::new(((self.0 >> 22) & 0x3ff) as u16)
    }

    /// Page-table index (bits 21:12).
    #[inline]
    #[must_use]
    pub const fn table_index(self) -> TableIndex {
        TableIndex::new(((self.0 >> 12) & 0x3ff) as u16)
    }

    /// Byte offset within the page (bits 11:0).
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u32 {
        self.0 % PAGE_SIZE
    }

    /// Address rounded down to its page base.
    #[inline]
    #[must_use]
    pub const fn page_base(self) -> Self {
        Self(crate::align_down(self.0, PAGE_SIZE))
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:08x})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for VirtualAddress {
    #[inline]
    fn from(addr: u32) -> Self {
        Self::new(addr)
    }
}

impl Add<u32> for VirtualAddress {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.checked_add(rhs).expect("VirtualAddress add"))
    }
}

impl AddAssign<u32> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_indices() {
        let va = VirtualAddress::new(0x004e_63f8);
        assert_eq!(va.directory_index().as_usize(), 1);
        assert_eq!(va.table_index().as_usize(), 0xe6);
        assert_eq!(va.page_offset(), 0x3f8);
    }

    #[test]
    fn self_map_window_indices() {
        // The directory window lives in the last directory slot.
        let va = VirtualAddress::new(0xffff_f000);
        assert_eq!(va.directory_index().as_usize(), 1023);
        assert_eq!(va.table_index().as_usize(), 1023);
    }
}
