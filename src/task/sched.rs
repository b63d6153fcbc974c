//! Priority/recency scheduler over a fixed task table.
//!
//! Every operation that touches the table or a queue expects interrupts to be
//! disabled by the caller and asserts it.

use alloc::boxed::Box;

use crate::config::{KernelConfig, KERNEL_UID, NUM_QUEUES, NUM_TASKS, USER_UID};
use crate::hal::{ContextSwitch, Cpu};
use crate::memory::AddressSpace;

use super::queue::{Link, QueueId, TaskQueue};
use super::{Task, TaskEntry, TaskId, TaskState};

/// Entry points of the tasks started by [`Scheduler::init`].
#[derive(Debug, Clone, Copy)]
pub struct InitThreads {
    pub idle: TaskEntry,
    pub init: TaskEntry,
    pub test: TaskEntry,
}

pub struct Scheduler {
    tasks: [Option<Box<Task>>; NUM_TASKS],
    queues: [TaskQueue; NUM_QUEUES],
    queues_used: usize,
    current: TaskId,
    idle: Option<TaskId>,
    /// Global tick counter.
    jiffies: u32,
    jiffy_ms: u32,
    kernel_space: AddressSpace,
}

impl Scheduler {
    /// Empty queues and a TCB for the context that is already running, so
    /// it can be switched away from.
    pub fn new(config: KernelConfig, kernel_space: AddressSpace) -> Self {
        assert!(config.jiffy_ms > 0, "jiffy must be at least 1 ms");

        let mut tasks: [Option<Box<Task>>; NUM_TASKS] = core::array::from_fn(|_| None);
        tasks[0] = Some(Box::new(Task::adopt_boot(kernel_space)));

        Self {
            tasks,
            queues: [TaskQueue::new(); NUM_QUEUES],
            queues_used: usize::from(QueueId::RESERVED),
            current: TaskId(0),
            idle: None,
            jiffies: 0,
            jiffy_ms: config.jiffy_ms,
            kernel_space,
        }
    }

    /// Start the idle task and the two initial workers.
    pub fn init(&mut self, threads: InitThreads) {
        self.spawn_idle(threads.idle);
        self.task_create(threads.init, "init", 5, USER_UID);
        self.task_create(threads.test, "test", 5, KERNEL_UID);
    }

    /// Create the fallback task picked when nothing else is ready.
    pub fn spawn_idle(&mut self, entry: TaskEntry) -> TaskId {
        assert!(self.idle.is_none(), "idle task already exists");
        let id = self.task_create(entry, "idle", 1, KERNEL_UID);
        self.idle = Some(id);
        id
    }

    pub fn task_create(&mut self, entry: TaskEntry, name: &str, priority: u32, uid: u32) -> TaskId {
        let slot = self
            .tasks
            .iter()
            .position(Option::is_none)
            .unwrap_or_else(|| panic!("task table full, cannot create {}", name));

        self.tasks[slot] = Some(Box::new(Task::new(
            entry,
            name,
            priority,
            uid,
            self.kernel_space,
        )));
        klog!("task {} created in slot {}", name, slot);
        TaskId(slot)
    }

    /// Hand out a fresh wait queue for `task_block`.
    pub fn create_queue(&mut self) -> QueueId {
        assert!(self.queues_used < NUM_QUEUES, "out of wait queues");
        let id = QueueId(self.queues_used as u8);
        self.queues_used += 1;
        id
    }

    pub fn current(&self) -> TaskId {
        self.current
    }

    pub fn idle(&self) -> Option<TaskId> {
        self.idle
    }

    pub fn jiffies(&self) -> u32 {
        self.jiffies
    }

    pub fn jiffy_ms(&self) -> u32 {
        self.jiffy_ms
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.0).and_then(|slot| slot.as_deref())
    }

    pub fn task(&self, id: TaskId) -> &Task {
        self.get(id)
            .unwrap_or_else(|| panic!("no task in slot {}", id.0))
    }

    fn task_mut(&mut self, id: TaskId) -> &mut Task {
        self.tasks
            .get_mut(id.0)
            .and_then(|slot| slot.as_deref_mut())
            .unwrap_or_else(|| panic!("no task in slot {}", id.0))
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_deref().map(|task| (TaskId(i), task)))
    }

    pub fn running_count(&self) -> usize {
        self.tasks()
            .filter(|(_, task)| task.state == TaskState::Running)
            .count()
    }

    pub fn queue(&self, queue: QueueId) -> &TaskQueue {
        &self.queues[queue.index()]
    }

    /// Members of `queue` from head to tail.
    pub fn queue_iter(&self, queue: QueueId) -> QueueIter<'_> {
        QueueIter {
            sched: self,
            next: self.queues[queue.index()].head,
        }
    }

    pub fn set_brk(&mut self, id: TaskId, brk: u32) {
        self.task_mut(id).brk = brk;
    }

    /// Ready task other than the caller with the most remaining ticks; ties
    /// go to the one that ran least recently.
    fn search(&self, state: TaskState) -> Option<TaskId> {
        let mut result: Option<(TaskId, &Task)> = None;

        for (id, task) in self.tasks() {
            if id == self.current || task.state != state {
                continue;
            }

            let better = match result {
                None => true,
                Some((_, best)) => {
                    task.ticks > best.ticks
                        || (task.ticks == best.ticks && task.jiffies < best.jiffies)
                }
            };
            if better {
                result = Some((id, task));
            }
        }

        match result {
            Some((id, _)) => Some(id),
            None if state == TaskState::Ready => self.idle,
            None => None,
        }
    }

    pub fn schedule<H: Cpu + ContextSwitch>(&mut self, hal: &mut H) {
        assert!(!hal.irq_enabled(), "schedule with interrupts enabled");

        let current = self.current;
        let next = self
            .search(TaskState::Ready)
            .unwrap_or_else(|| panic!("no runnable task and no idle task"));

        let candidate = self.task(next);
        assert!(
            candidate.magic_intact(),
            "task {} stack overflow detected",
            candidate.name()
        );

        let task = self.task_mut(current);
        if task.state == TaskState::Running {
            task.state = TaskState::Ready;
        }
        if task.ticks == 0 {
            task.ticks = task.priority;
        }

        self.task_mut(next).state = TaskState::Running;
        if next == current {
            return;
        }

        klog!("switch {} -> {}", self.task(current).name(), self.task(next).name());
        self.current = next;

        let next_sp = self.task(next).stack_pointer;
        let prev_sp = &mut self.task_mut(current).stack_pointer;
        // SAFETY: next_sp was laid out by Task::new or saved by a previous
        // switch, and interrupts are off.
        unsafe { hal.switch(prev_sp, next_sp) };
    }

    pub fn task_yield<H: Cpu + ContextSwitch>(&mut self, hal: &mut H) {
        self.schedule(hal);
    }

    /// Park `id` on `queue` (or the default blocked queue) in `state`.
    /// Reschedules immediately when `id` is the caller.
    pub fn task_block<H: Cpu + ContextSwitch>(
        &mut self,
        hal: &mut H,
        id: TaskId,
        queue: Option<QueueId>,
        state: TaskState,
    ) {
        assert!(!hal.irq_enabled(), "task_block with interrupts enabled");
        assert!(
            self.task(id).link.is_free(),
            "task {} is already queued",
            self.task(id).name()
        );
        assert!(state.is_blocked(), "{:?} is not a blocked state", state);
        assert!(Some(id) != self.idle, "idle task cannot block");

        let queue = queue.unwrap_or(QueueId::BLOCKED);
        self.link_before(queue, None, id);
        self.task_mut(id).state = state;

        if id == self.current {
            self.schedule(hal);
        }
    }

    /// Take `id` off its queue and make it ready. Does not reschedule.
    pub fn task_unblock<H: Cpu>(&mut self, hal: &mut H, id: TaskId) {
        assert!(!hal.irq_enabled(), "task_unblock with interrupts enabled");
        assert!(
            !self.task(id).link.is_free(),
            "task {} is not queued",
            self.task(id).name()
        );

        self.unlink(id);
        assert!(self.task(id).link.is_free(), "task {} still queued", self.task(id).name());

        self.task_mut(id).state = TaskState::Ready;
    }

    /// Put the caller to sleep for at least `ms` milliseconds.
    pub fn task_sleep<H: Cpu + ContextSwitch>(&mut self, hal: &mut H, ms: u32) {
        assert!(!hal.irq_enabled(), "task_sleep with interrupts enabled");
        assert!(ms > 0, "sleep duration must be positive");

        let ticks = ms.div_ceil(self.jiffy_ms);
        let deadline = self.jiffies.saturating_add(ticks);
        let current = self.current;
        assert!(Some(current) != self.idle, "idle task cannot block");
        assert!(
            self.task(current).link.is_free(),
            "task {} is already queued",
            self.task(current).name()
        );

        self.task_mut(current).jiffies = deadline;

        let anchor = self
            .queue_iter(QueueId::SLEEPING)
            .find(|&id| self.task(id).jiffies > deadline);
        self.link_before(QueueId::SLEEPING, anchor, current);

        self.task_mut(current).state = TaskState::Sleeping;
        self.schedule(hal);
    }

    /// Ready every sleeper whose deadline has passed.
    pub fn task_wakeup<H: Cpu>(&mut self, hal: &mut H) {
        assert!(!hal.irq_enabled(), "task_wakeup with interrupts enabled");

        while let Some(id) = self.queues[QueueId::SLEEPING.index()].head {
            if self.task(id).jiffies > self.jiffies {
                break;
            }
            self.task_unblock(hal, id);
        }
    }

    /// One timer tick: advance the clock, wake sleepers, charge the running
    /// task, and preempt it once its slice is used up.
    ///
    /// The clock saturates at `u32::MAX` so deadlines stay ordered.
    pub fn tick<H: Cpu + ContextSwitch>(&mut self, hal: &mut H) {
        self.jiffies = self.jiffies.saturating_add(1);
        self.task_wakeup(hal);

        let now = self.jiffies;
        let task = self.task_mut(self.current);
        assert!(task.magic_intact(), "task {} stack overflow detected", task.name());

        task.jiffies = now;
        task.ticks = task.ticks.saturating_sub(1);
        if task.ticks == 0 {
            self.schedule(hal);
        }
    }

    /// Mark the caller dead and switch away for good.
    #[cfg(feature = "task-reap")]
    pub fn task_exit<H: Cpu + ContextSwitch>(&mut self, hal: &mut H) {
        assert!(!hal.irq_enabled(), "task_exit with interrupts enabled");
        let current = self.current;
        assert!(Some(current) != self.idle, "idle task cannot exit");
        assert!(self.task(current).link.is_free(), "exiting task is queued");

        self.task_mut(current).state = TaskState::Died;
        self.schedule(hal);
    }

    /// Free the slot of a dead task so `task_create` can reuse it.
    #[cfg(feature = "task-reap")]
    pub fn task_reap(&mut self, id: TaskId) {
        assert!(id != self.current, "cannot reap the running task");
        let task = self.task(id);
        assert_eq!(task.state, TaskState::Died, "task {} is still alive", task.name());
        assert!(task.link.is_free(), "task {} is queued", task.name());

        self.tasks[id.0] = None;
    }

    /// Link `id` into `queue` before `anchor`, or at the tail.
    fn link_before(&mut self, queue: QueueId, anchor: Option<TaskId>, id: TaskId) {
        assert!(queue.index() < self.queues_used, "queue {} was never created", queue.0);

        let prev = match anchor {
            Some(a) => {
                debug_assert_eq!(self.task(a).link.queue(), Some(queue));
                self.task(a).link.prev()
            }
            None => self.queues[queue.index()].tail,
        };

        self.task_mut(id).link = Link::Queued {
            queue,
            prev,
            next: anchor,
        };

        let q = &mut self.queues[queue.index()];
        if prev.is_none() {
            q.head = Some(id);
        }
        if anchor.is_none() {
            q.tail = Some(id);
        }
        q.len += 1;

        if let Some(p) = prev {
            self.task_mut(p).link.set_next(Some(id));
        }
        if let Some(a) = anchor {
            self.task_mut(a).link.set_prev(Some(id));
        }
    }

    fn unlink(&mut self, id: TaskId) {
        let Link::Queued { queue, prev, next } = self.task(id).link else {
            return;
        };

        let q = &mut self.queues[queue.index()];
        if prev.is_none() {
            q.head = next;
        }
        if next.is_none() {
            q.tail = prev;
        }
        q.len -= 1;

        if let Some(p) = prev {
            self.task_mut(p).link.set_next(next);
        }
        if let Some(n) = next {
            self.task_mut(n).link.set_prev(prev);
        }
        self.task_mut(id).link = Link::Free;
    }
}

pub struct QueueIter<'a> {
    sched: &'a Scheduler,
    next: Option<TaskId>,
}

impl Iterator for QueueIter<'_> {
    type Item = TaskId;

    fn next(&mut self) -> Option<TaskId> {
        let id = self.next?;
        self.next = self.sched.task(id).link.next();
        Some(id)
    }
}
