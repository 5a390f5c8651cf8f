use crate::table::PageTableFrame;
use kernel_addresses::{DirectoryIndex, VirtualAddress};

/// Directory slot reserved for the self-mapping.
pub const SELF_MAP_SLOT: usize = 1023;

/// Virtual address of the current page directory, through the self-map.
pub const DIRECTORY_WINDOW: VirtualAddress = VirtualAddress::new(0xffff_f000);

/// Virtual address of the page table behind directory slot `index`,
/// through the self-map.
#[must_use]
pub const fn table_window(index: DirectoryIndex) -> VirtualAddress {
    VirtualAddress::new((0x3ff << 22) | (index.as_u32() << 12))
}

/// Access to the page-table frames of the **running** address space.
///
/// Fault service and page release must edit tables while paging is on,
/// when the frames holding them have no identity mapping. On the machine
/// that goes through the self-map window ([`SelfMapWindow`]); in tests a
/// simulated MMU resolves the same requests against an arena. Either way
/// the contract is the MMU's view: `table(i)` is whatever frame the
/// current directory's slot `i` references.
pub trait TableWindow {
    /// The current page directory.
    ///
    /// # Safety
    /// The caller must be the only writer of this address space's tables
    /// for the returned borrow's use.
    unsafe fn directory<'a>(&self) -> &'a mut PageTableFrame;

    /// The page table behind directory slot `index`.
    ///
    /// # Safety
    /// As [`TableWindow::directory`]; additionally the slot must hold a
    /// present entry, otherwise there is no table to reach.
    unsafe fn table<'a>(&self, index: DirectoryIndex) -> &'a mut PageTableFrame;

    /// Discard cached translations after a mapping was removed.
    fn flush_tlb(&self);
}

/// The real window: dereferences the fixed self-map virtual addresses.
///
/// Usable only once paging is enabled with the self-map entry installed —
/// which is exactly when physical access stops working and this starts.
pub struct SelfMapWindow {
    _private: (),
}

impl SelfMapWindow {
    /// # Safety
    /// Paging must be enabled and the current directory's slot 1023 must
    /// reference the directory itself.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl TableWindow for SelfMapWindow {
    unsafe fn directory<'a>(&self) -> &'a mut PageTableFrame {
        unsafe { &mut *(DIRECTORY_WINDOW.as_u32() as usize as *mut PageTableFrame) }
    }

    unsafe fn table<'a>(&self, index: DirectoryIndex) -> &'a mut PageTableFrame {
        unsafe { &mut *(table_window(index).as_u32() as usize as *mut PageTableFrame) }
    }

    /// Reload CR3 with its own value; on x86 that drops every non-global
    /// TLB entry.
    fn flush_tlb(&self) {
        #[cfg(all(feature = "asm", target_arch = "x86"))]
        unsafe {
            use kernel_registers::{Cr3, LoadRegister, StoreRegister};
            Cr3::load().store();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_addresses() {
        assert_eq!(DIRECTORY_WINDOW.as_u32(), 0xffff_f000);
        assert_eq!(
            table_window(DirectoryIndex::new(0)).as_u32(),
            0xffc0_0000
        );
        assert_eq!(
            table_window(DirectoryIndex::new(1)).as_u32(),
            0xffc0_1000
        );
        assert_eq!(
            table_window(DirectoryIndex::new(1023)),
            DIRECTORY_WINDOW
        );
    }
}
