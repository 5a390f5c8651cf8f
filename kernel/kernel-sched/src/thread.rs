use core::fmt;

/// Identifies a thread; doubles as its slot in the port filter lock.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ThreadId(usize);

impl ThreadId {
    #[inline]
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid{}", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the scheduler needs from a thread. Stacks, register frames and
/// the actual context switch live outside this core; the scheduler only
/// queues references and hands control over.
pub trait Thread: Sync {
    fn id(&self) -> ThreadId;

    /// Transfer control to this thread.
    ///
    /// On the machine this is the context-switch primitive and does not
    /// return until the caller is dispatched again.
    ///
    /// # Safety
    /// The thread's saved context must be valid to resume, and the caller
    /// must be at a point where losing the CPU is correct (no queue lock
    /// held, interrupts in their expected state).
    unsafe fn dispatch(&self);
}
