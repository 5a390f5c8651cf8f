use crate::ata::{BLOCK_SIZE, DiskOp, IdeController};
use core::hint::spin_loop;
use kernel_ports::PortBus;
use kernel_sched::{BlockedIo, Scheduler, Thread, ThreadQueue};
use kernel_sync::{IrqGuard, PortLock, SpinLock};
use log::{debug, trace};

/// A block device that yields instead of spinning.
///
/// `read`/`write` issue the command, park the calling thread until the
/// device raises DRQ, then move the data. Parking means: enqueue on the
/// disk's I/O-blocked queue and call [`Scheduler::yield_now`]; the
/// scheduler's per-yield [`BlockedIo`] poll brings the thread back once
/// [`is_thread_ready`](Self::is_thread_ready) holds.
///
/// Both port phases of an operation take the Peterson filter lock under
/// the caller's thread id, so interleaved threads cannot mix their
/// register sequences on the one controller.
pub struct NonBlockingDisk<'t, P: PortBus> {
    ide: IdeController<P>,
    blocked: SpinLock<ThreadQueue<'t>>,
    port_lock: PortLock,
    blocks: u32,
}

impl<'t, P: PortBus> NonBlockingDisk<'t, P> {
    /// Wrap the controller behind `ports`; `blocks` is the device
    /// capacity in 512-byte blocks.
    #[must_use]
    pub const fn new(ports: P, blocks: u32) -> Self {
        Self {
            ide: IdeController::new(ports),
            blocked: SpinLock::new(ThreadQueue::new()),
            port_lock: PortLock::new(),
            blocks,
        }
    }

    /// Device capacity in blocks.
    #[must_use]
    pub const fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Read `block_no` into `buf`, yielding while the device works.
    pub fn read(&self, block_no: u32, buf: &mut [u8; BLOCK_SIZE], scheduler: &Scheduler<'t>) {
        debug_assert!(block_no < self.blocks);
        trace!("read of block {block_no}");
        let tid = current_lock_slot(scheduler);

        {
            let _port = self.port_lock.lock(tid);
            self.ide.issue_command(DiskOp::Read, block_no);
        }

        self.wait_until_ready(scheduler);

        let _port = self.port_lock.lock(tid);
        if let Err(fault) = self.ide.check_data_phase() {
            panic!("disk fault reading block {block_no}: {fault}");
        }
        self.ide.read_data(buf);
    }

    /// Write `buf` to `block_no`, yielding while the device works.
    pub fn write(&self, block_no: u32, buf: &[u8; BLOCK_SIZE], scheduler: &Scheduler<'t>) {
        debug_assert!(block_no < self.blocks);
        trace!("write of block {block_no}");
        let tid = current_lock_slot(scheduler);

        {
            let _port = self.port_lock.lock(tid);
            self.ide.issue_command(DiskOp::Write, block_no);
        }

        self.wait_until_ready(scheduler);

        let _port = self.port_lock.lock(tid);
        if let Err(fault) = self.ide.check_data_phase() {
            panic!("disk fault writing block {block_no}: {fault}");
        }
        self.ide.write_data(buf);
    }

    /// Park the calling thread until the device reports ready.
    ///
    /// Each pass enqueues the current thread on the I/O-blocked queue and
    /// yields; control returns here only after the scheduler has observed
    /// readiness and moved the thread back to the ready queue. Without a
    /// current thread (bring-up) there is nothing to park, so this spins.
    pub fn wait_until_ready(&self, scheduler: &Scheduler<'t>) {
        while !self.ide.is_ready() {
            match scheduler.current_thread() {
                Some(current) => {
                    trace!("parking {} for disk I/O", current.id());
                    {
                        let _irq = IrqGuard::new();
                        self.blocked.lock().enqueue(current);
                    }
                    scheduler.yield_now();
                }
                None => spin_loop(),
            }
        }
    }

    /// True iff the device reports ready **and** a thread is parked — the
    /// condition under which a yield should unblock someone.
    #[must_use]
    pub fn is_thread_ready(&self) -> bool {
        !self.blocked.lock().is_empty() && self.ide.is_ready()
    }

    /// Pop one thread from the I/O-blocked queue.
    pub fn schedule_blocked_thread(&self) -> Option<&'t dyn Thread> {
        let _irq = IrqGuard::new();
        let thread = self.blocked.lock().dequeue();
        if let Some(thread) = thread {
            debug!("disk ready, unblocking {}", thread.id());
        }
        thread
    }

    /// Threads currently parked on the I/O-blocked queue.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.blocked.lock().len()
    }
}

impl<'t, P: PortBus + Sync> BlockedIo<'t> for NonBlockingDisk<'t, P> {
    fn ready_thread(&self) -> Option<&'t dyn Thread> {
        if self.is_thread_ready() {
            self.schedule_blocked_thread()
        } else {
            None
        }
    }
}

/// Filter-lock slot for the caller: its thread id, or slot 0 during
/// bring-up before any dispatch happened.
fn current_lock_slot(scheduler: &Scheduler<'_>) -> usize {
    scheduler.current_id().map_or(0, |id| id.as_usize())
}
