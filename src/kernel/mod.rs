//! # Kernel Core Object
//!
//! [`Kernel`] owns the platform, the gate table, the handler table, the
//! interrupt controllers, the critical-section state, and the scheduler. The
//! boot code builds exactly one and hands it to the entry stubs.
//!
//! ## Submodules
//!
//! - `init`: boot sequence run in phases
//! - `status`: per-phase progress tracking
//!
//! ## Example
//!
//! ```ignore
//! let mut kernel = Kernel::new(platform, KernelConfig::default());
//! kernel.boot(&stubs, threads)?;
//! kernel.irq_enable();
//! ```

pub mod init;
pub mod status;

use alloc::boxed::Box;

pub use status::{BootStatus, ComponentStatus, InitStatus};

use crate::config::{KernelConfig, ENTRY_COUNT};
use crate::hal::{Cpu, Platform};
use crate::interrupts::{ChainedPics, CriticalSection, EntryStubs, GateTable, Handler, InterruptIndex};
use crate::memory::{resolve_page_fault, FaultResolution, PageFault};
use crate::task::sched::InitThreads;
use crate::task::{QueueId, Scheduler, TaskEntry, TaskId, TaskState};

pub struct Kernel<P: Platform> {
    pub(crate) platform: P,
    guard: CriticalSection,
    /// Boxed so the address loaded into the IDT register never moves.
    idt: Box<GateTable>,
    pub(crate) pics: ChainedPics,
    pub(crate) handlers: [Handler<P>; ENTRY_COUNT],
    pub(crate) sched: Scheduler,
    pub(crate) default_irqs: u32,
    pub(crate) status: BootStatus,
}

impl<P: Platform> Kernel<P> {
    /// Adopt the running boot context as the first task. Nothing touches the
    /// hardware until [`interrupt_init`](Self::interrupt_init).
    pub fn new(platform: P, config: KernelConfig) -> Self {
        let sched = Scheduler::new(config, platform.kernel_space());
        Self {
            platform,
            guard: CriticalSection::new(),
            idt: Box::new(GateTable::new()),
            pics: ChainedPics::new(),
            handlers: core::array::from_fn(Handler::initial),
            sched,
            default_irqs: 0,
            status: BootStatus::new(),
        }
    }

    /// Remap and mask the controllers, fill the gate table from `stubs`,
    /// reset the handler table, and load the table register.
    pub fn interrupt_init(&mut self, stubs: &EntryStubs) {
        self.pics.initialize(&mut self.platform);

        self.idt.build(stubs);
        self.handlers = core::array::from_fn(Handler::initial);

        let pointer = self.idt.pointer();
        self.platform.load_idt(&pointer);
    }

    /// Bind the timer line to the scheduler tick and unmask it.
    pub fn clock_init(&mut self) {
        let clock = InterruptIndex::Clock;
        self.handlers[clock.as_usize()] = Handler::Clock;
        if let Some(irq) = clock.irq() {
            self.set_interrupt_mask(irq, true);
        }
    }

    /// Start the idle task and the two initial workers.
    pub fn task_init(&mut self, threads: InitThreads) {
        self.sched.init(threads);
    }

    pub fn gate_table(&self) -> &GateTable {
        &self.idt
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn boot_status(&self) -> &BootStatus {
        &self.status
    }

    // Critical sections

    pub fn irq_enabled(&self) -> bool {
        self.platform.irq_enabled()
    }

    pub fn irq_enable(&mut self) {
        self.platform.irq_enable();
    }

    /// Clear the interrupt flag and return whether it was set.
    pub fn irq_disable(&mut self) -> bool {
        self.platform.irq_disable()
    }

    pub fn irq_save(&mut self) {
        self.guard.save(&mut self.platform);
    }

    pub fn irq_restore(&mut self) {
        self.guard.restore(&mut self.platform);
    }

    pub fn irq_depth(&self) -> usize {
        self.guard.depth()
    }

    // Tasks

    pub fn current(&self) -> TaskId {
        self.sched.current()
    }

    pub fn jiffies(&self) -> u32 {
        self.sched.jiffies()
    }

    pub fn task_create(&mut self, entry: TaskEntry, name: &str, priority: u32, uid: u32) -> TaskId {
        self.sched.task_create(entry, name, priority, uid)
    }

    pub fn create_queue(&mut self) -> QueueId {
        self.sched.create_queue()
    }

    pub fn schedule(&mut self) {
        self.sched.schedule(&mut self.platform);
    }

    pub fn task_yield(&mut self) {
        self.sched.task_yield(&mut self.platform);
    }

    pub fn task_block(&mut self, id: TaskId, queue: Option<QueueId>, state: TaskState) {
        self.sched.task_block(&mut self.platform, id, queue, state);
    }

    pub fn task_unblock(&mut self, id: TaskId) {
        self.sched.task_unblock(&mut self.platform, id);
    }

    pub fn task_sleep(&mut self, ms: u32) {
        self.sched.task_sleep(&mut self.platform, ms);
    }

    pub fn task_wakeup(&mut self) {
        self.sched.task_wakeup(&mut self.platform);
    }

    #[cfg(feature = "task-reap")]
    pub fn task_exit(&mut self) {
        self.sched.task_exit(&mut self.platform);
    }

    #[cfg(feature = "task-reap")]
    pub fn task_reap(&mut self, id: TaskId) {
        self.sched.task_reap(id);
    }

    // Memory

    /// Move the current task's program break.
    pub fn set_brk(&mut self, brk: u32) {
        let current = self.sched.current();
        self.sched.set_brk(current, brk);
    }

    /// Resolve `fault` against the current task's heap and stack bounds.
    pub fn page_fault(&mut self, fault: PageFault) -> FaultResolution {
        let brk = self.sched.task(self.sched.current()).brk();
        resolve_page_fault(&mut self.platform, fault, brk)
    }
}
