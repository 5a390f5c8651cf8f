use crate::{FRAME_SIZE, PhysicalAddress};
use core::fmt;
use core::ops::{Add, Sub};

/// Index of a 4 KiB physical frame, counted from physical address zero.
///
/// Frame pools allocate and release in these units; multiplying by
/// [`FRAME_SIZE`] yields the frame's base address.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FrameNumber(u32);

impl FrameNumber {
    #[inline]
    #[must_use]
    pub const fn new(frame: u32) -> Self {
        debug_assert!(frame < (1 << 20), "frame number beyond 4 GiB");
        Self(frame)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Physical base address of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 * FRAME_SIZE)
    }
}

impl fmt::Debug for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FrameNumber {
    #[inline]
    fn from(frame: u32) -> Self {
        Self::new(frame)
    }
}

impl Add<u32> for FrameNumber {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self::new(self.0 + rhs)
    }
}

impl Sub<FrameNumber> for FrameNumber {
    type Output = u32;

    #[inline]
    fn sub(self, rhs: FrameNumber) -> Self::Output {
        self.0.checked_sub(rhs.0).expect("FrameNumber sub")
    }
}
