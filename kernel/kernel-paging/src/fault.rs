use bitfield_struct::bitfield;
use kernel_addresses::VirtualAddress;

/// Page-fault error code as pushed by the CPU.
///
/// Reference: Intel SDM Vol. 3A, "Page-Fault Exception (#PF)". Only the
/// low bits exist on a 32-bit machine without PKE/CET.
#[bitfield(u32)]
pub struct PageFaultCode {
    /// Bit 0 — 0: the page was not present. 1: protection violation on a
    /// present page.
    pub protection_violation: bool,

    /// Bit 1 — 0: read. 1: write.
    pub write: bool,

    /// Bit 2 — 0: supervisor access. 1: user-mode access.
    pub user: bool,

    /// Bit 3 — reserved bit set in a paging structure.
    pub reserved_bit: bool,

    /// Bit 4 — instruction fetch.
    pub instruction_fetch: bool,

    #[bits(27)]
    __: u32,
}

impl PageFaultCode {
    pub fn explain(&self) -> &'static str {
        if !self.protection_violation() {
            "page not present"
        } else if self.write() {
            "write to a protected page"
        } else {
            "read from a protected page"
        }
    }
}

/// Why fault service refused; all of these are unrecoverable and the ISR
/// halts on them.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum FaultError {
    /// The page was present but the access was disallowed — a kernel bug,
    /// not a lazy-allocation miss.
    #[error("protection violation at {0}")]
    ProtectionViolation(VirtualAddress),

    /// No registered virtual-memory pool claims the address.
    #[error("address {0} lies in no virtual-memory pool")]
    OutsideAllPools(VirtualAddress),

    /// The process frame pool had no frame for the page or table.
    #[error("out of physical frames while servicing a fault")]
    OutOfFrames,
}

/// What a successful fault service did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultResolution {
    /// Installed the missing leaf mapping; the access can retry.
    MappedPage,
    /// Linked a fresh page table into the directory; the access re-faults
    /// once and then takes the leaf branch.
    CreatedTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_bit_zero() {
        assert!(!PageFaultCode::from_bits(0x0).protection_violation());
        assert!(PageFaultCode::from_bits(0x1).protection_violation());
        assert!(PageFaultCode::from_bits(0x2).write());
    }
}
