use bitfield_struct::bitfield;
use core::hint::spin_loop;
use kernel_ports::{IDE_PRIMARY_ALT_STATUS, IDE_PRIMARY_BASE, PortBus};

/// Bytes per disk block (one sector).
pub const BLOCK_SIZE: usize = 512;

/// Words per block on the 16-bit data port.
const WORDS_PER_BLOCK: usize = BLOCK_SIZE / 2;

// Primary-channel register offsets from IDE_PRIMARY_BASE (0x1F0).
const REG_DATA: u16 = 0;
const REG_SECTOR_COUNT: u16 = 2;
const REG_LBA_LOW: u16 = 3;
const REG_LBA_MID: u16 = 4;
const REG_LBA_HIGH: u16 = 5;
const REG_DRIVE_SELECT: u16 = 6;
const REG_COMMAND: u16 = 7;
const REG_STATUS: u16 = 7;

const CMD_READ_SECTORS: u8 = 0x20;
const CMD_WRITE_SECTORS: u8 = 0x30;
const CMD_CACHE_FLUSH: u8 = 0xe7;

/// Drive-select base value: master drive, LBA addressing.
const DRIVE_MASTER_LBA: u8 = 0xe0;

/// IDE status register.
#[bitfield(u8)]
pub struct AtaStatus {
    /// Bit 0 — ERR: the last command ended in error.
    pub error: bool,

    /// Bits 1–2 — obsolete (index/corrected).
    #[bits(2)]
    __: u8,

    /// Bit 3 — DRQ: the drive has PIO data to exchange.
    pub data_request: bool,

    /// Bit 4 — SRV: overlapped-mode service request.
    pub service: bool,

    /// Bit 5 — DF: drive fault (does not set ERR).
    pub drive_fault: bool,

    /// Bit 6 — RDY: spun up and ready for commands.
    pub ready: bool,

    /// Bit 7 — BSY: drive owns the registers; poll until clear.
    pub busy: bool,
}

/// What the error ladder found when the data phase should have started.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DataPhaseError {
    /// ERR set: the command failed.
    #[error("drive reports a command error")]
    CommandError,
    /// DF set: the drive itself faulted.
    #[error("drive fault")]
    DriveFault,
    /// Neither fault bit, but no DRQ either — nothing to transfer.
    #[error("drive never raised DRQ")]
    NoDataRequest,
}

/// Direction of a block operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiskOp {
    Read,
    Write,
}

impl DiskOp {
    const fn command(self) -> u8 {
        match self {
            Self::Read => CMD_READ_SECTORS,
            Self::Write => CMD_WRITE_SECTORS,
        }
    }
}

/// Register-level sequencing for the primary IDE channel.
///
/// Knows the LBA28 PIO protocol and nothing about threads; the
/// non-blocking wrapper decides how to wait and who may touch the ports.
/// Derived from the classic "LBA HDD access via PIO" recipe.
pub struct IdeController<P: PortBus> {
    ports: P,
}

impl<P: PortBus> IdeController<P> {
    #[must_use]
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    /// Select the block and issue the read/write command.
    ///
    /// Waits for a busy drive to release the registers first; the data
    /// phase is *not* awaited here.
    pub fn issue_command(&self, op: DiskOp, block_no: u32) {
        while self.status().busy() {
            spin_loop();
        }

        self.write_reg(REG_SECTOR_COUNT, 0x01);
        self.write_reg(REG_LBA_LOW, block_no as u8);
        self.write_reg(REG_LBA_MID, (block_no >> 8) as u8);
        self.write_reg(REG_LBA_HIGH, (block_no >> 16) as u8);
        self.write_reg(
            REG_DRIVE_SELECT,
            DRIVE_MASTER_LBA | ((block_no >> 24) as u8 & 0x0f),
        );
        self.write_reg(REG_COMMAND, op.command());
    }

    /// Current contents of the status register.
    #[must_use]
    pub fn status(&self) -> AtaStatus {
        AtaStatus::from_bits(self.ports.read_u8(IDE_PRIMARY_BASE + REG_STATUS))
    }

    /// Whether the drive is ready to exchange data: DRQ set, BSY clear.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let status = self.status();
        !status.busy() && status.data_request()
    }

    /// The ERR → DF → DRQ ladder, checked once BSY has cleared and before
    /// touching the data port.
    pub fn check_data_phase(&self) -> Result<(), DataPhaseError> {
        let status = self.status();
        if status.error() {
            return Err(DataPhaseError::CommandError);
        }
        if status.drive_fault() {
            return Err(DataPhaseError::DriveFault);
        }
        if !status.data_request() {
            return Err(DataPhaseError::NoDataRequest);
        }
        Ok(())
    }

    /// Pull one block off the data port, low byte first.
    pub fn read_data(&self, buf: &mut [u8; BLOCK_SIZE]) {
        self.settle();
        for i in 0..WORDS_PER_BLOCK {
            let word = self.ports.read_u16(IDE_PRIMARY_BASE + REG_DATA);
            buf[2 * i] = word as u8;
            buf[2 * i + 1] = (word >> 8) as u8;
        }
    }

    /// Push one block onto the data port, then flush the drive cache so
    /// the write is durable before the command counts as done.
    pub fn write_data(&self, buf: &[u8; BLOCK_SIZE]) {
        self.settle();
        for i in 0..WORDS_PER_BLOCK {
            let word = u16::from(buf[2 * i]) | (u16::from(buf[2 * i + 1]) << 8);
            self.ports.write_u16(IDE_PRIMARY_BASE + REG_DATA, word);
        }

        self.write_reg(REG_COMMAND, CMD_CACHE_FLUSH);
        while self.status().busy() {
            spin_loop();
        }
    }

    /// Give the drive its 400 ns to assert BSY after a command: each
    /// alternate-status read burns ~100 ns without side effects.
    fn settle(&self) {
        for _ in 0..4 {
            let _ = self.ports.read_u8(IDE_PRIMARY_ALT_STATUS);
        }
    }

    fn write_reg(&self, reg: u16, value: u8) {
        self.ports.write_u8(IDE_PRIMARY_BASE + reg, value);
    }
}
