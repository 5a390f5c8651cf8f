use crate::scheduler::Scheduler;
use kernel_ports::{PIC_COMMAND, PIC_EOI, PortBus};
use log::trace;

/// Round-robin preemption on top of the cooperative scheduler.
///
/// The timer interrupt ends a thread's quantum by calling
/// [`end_of_quantum`](Self::end_of_quantum): the running thread goes to
/// the back of the ready queue and the head runs next. Because the yield
/// happens inside the interrupt handler, the master PIC must see its
/// end-of-interrupt before control leaves through a dispatch — otherwise
/// the next tick never arrives.
pub struct RoundRobinScheduler<'t, P: PortBus> {
    scheduler: Scheduler<'t>,
    ports: P,
}

impl<'t, P: PortBus> RoundRobinScheduler<'t, P> {
    #[must_use]
    pub const fn new(ports: P) -> Self {
        Self {
            scheduler: Scheduler::new(),
            ports,
        }
    }

    /// The underlying cooperative scheduler (add, resume, terminate …).
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler<'t> {
        &self.scheduler
    }

    /// Yield from interrupt context: acknowledge the tick at the master
    /// PIC, then delegate to the cooperative yield.
    pub fn yield_now(&self) {
        self.ports.write_u8(PIC_COMMAND, PIC_EOI);
        self.scheduler.yield_now();
    }

    /// End-of-quantum handling for the timer interrupt: the current
    /// thread rejoins the ready queue at the tail, then the head is
    /// dispatched.
    pub fn end_of_quantum(&self) {
        trace!("time quantum over, preempting");
        if let Some(current) = self.scheduler.current_thread() {
            self.scheduler.resume(current);
        }
        self.yield_now();
    }
}
