use crate::queue::ThreadQueue;
use crate::thread::{Thread, ThreadId};
use kernel_sync::{IrqGuard, SpinLock, SyncOnceCell};
use log::trace;

/// A source of threads whose I/O has completed — in practice the
/// non-blocking disk. Consulted once per yield; returning a thread moves
/// it from the device's blocked queue back into scheduling.
pub trait BlockedIo<'t>: Sync {
    /// Pop one parked thread whose device reports ready, if any.
    fn ready_thread(&self) -> Option<&'t dyn Thread>;
}

/// Cooperative FIFO scheduler over one global ready queue.
pub struct Scheduler<'t> {
    ready: SpinLock<ThreadQueue<'t>>,
    current: SpinLock<Option<&'t dyn Thread>>,
    io: SyncOnceCell<&'t (dyn BlockedIo<'t> + 't)>,
}

impl<'t> Scheduler<'t> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: SpinLock::new(ThreadQueue::new()),
            current: SpinLock::new(None),
            io: SyncOnceCell::new(),
        }
    }

    /// Wire in the I/O-blocked source. Once, at bring-up.
    pub fn attach_io(&self, io: &'t (dyn BlockedIo<'t> + 't)) {
        assert!(
            self.io.set(io).is_ok(),
            "I/O source already attached to the scheduler"
        );
    }

    /// Append `thread` to the tail of the ready queue.
    pub fn add(&self, thread: &'t dyn Thread) {
        let _irq = IrqGuard::new();
        self.ready.lock().enqueue(thread);
    }

    /// Put a thread that was running (or whose wait is over) back in line.
    pub fn resume(&self, thread: &'t dyn Thread) {
        self.add(thread);
    }

    /// Give up the CPU: drain at most one finished I/O waiter into the
    /// ready queue, then dispatch to the queue's head.
    ///
    /// With an empty ready queue this simply returns to the caller — the
    /// only thread there is keeps running.
    pub fn yield_now(&self) {
        let irq = IrqGuard::new();

        if let Some(io) = self.io.get() {
            if let Some(finished) = io.ready_thread() {
                trace!("I/O wait over for {}, back to ready", finished.id());
                self.ready.lock().enqueue(finished);
            }
        }

        let Some(next) = self.ready.lock().dequeue() else {
            return;
        };
        *self.current.lock() = Some(next);

        // Interrupts come back on before control moves; the dispatch
        // primitive is atomic with respect to the next tick.
        drop(irq);
        trace!("dispatching to {}", next.id());
        unsafe { next.dispatch() }
    }

    /// Remove every queued occurrence of `thread`; it will not be
    /// scheduled again unless re-added.
    pub fn terminate(&self, thread: &dyn Thread) {
        let _irq = IrqGuard::new();
        self.ready.lock().remove(thread.id());
        trace!("terminated {}", thread.id());
    }

    /// The thread most recently dispatched to.
    #[must_use]
    pub fn current_thread(&self) -> Option<&'t dyn Thread> {
        *self.current.lock()
    }

    /// Id of the current thread, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<ThreadId> {
        self.current_thread().map(|thread| thread.id())
    }

    /// Number of threads waiting in the ready queue.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready.lock().len()
    }
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}
