//! Physical and virtual memory layout.
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────┐
//!             │ low memory, kernel image    │  identity-mapped
//! 0x0020_0000 ├─────────────────────────────┤  frame 512
//!             │ kernel frame pool (2 MiB)   │
//! 0x0040_0000 ├─────────────────────────────┤  frame 1024, end of shared region
//!             │ process frame pool (28 MiB) │
//! 0x0200_0000 └─────────────────────────────┘  frame 8192
//! ```

/// First frame of the kernel frame pool (2 MiB mark).
pub const KERNEL_POOL_BASE_FRAME: u32 = 512;

/// Kernel pool span: 2 MiB of frames.
pub const KERNEL_POOL_FRAMES: u32 = 512;

/// First frame of the process frame pool (4 MiB mark, right above the
/// identity-mapped shared region).
pub const PROCESS_POOL_BASE_FRAME: u32 = 1024;

/// Process pool span: 28 MiB of frames.
pub const PROCESS_POOL_FRAMES: u32 = 7168;

/// Bytes shared by every address space and identity-mapped by the first
/// page table: the first 4 MiB.
pub const SHARED_SIZE: u32 = 4 * 1024 * 1024;
