//! Task Control
//!
//! # Task Lifecycle
//! ```text
//!   create ──▶ Ready ◀──────────── unblock / wakeup ─────┐
//!               │  ▲                                     │
//!      schedule │  │ preempt / yield                     │
//!               ▼  │                                     │
//!             Running ── block / sleep ──▶ Blocked, Sleeping, Waiting
//! ```
//!
//! At most one task is `Running`. A task sits in at most one wait queue,
//! which [`Link`] makes structural rather than asserted.

pub mod queue;
pub mod sched;

use alloc::boxed::Box;
use core::mem::size_of;

use crate::config::{PAGE_SIZE, TASK_MAGIC, TASK_NAME_LEN};
use crate::memory::AddressSpace;

pub use queue::{Link, QueueId, TaskQueue};
pub use sched::{InitThreads, Scheduler};

/// Entry point of a kernel task. The first switch into the task "returns"
/// here.
pub type TaskEntry = extern "C" fn();

/// Slot index in the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    /// Generic wait in a blocked queue.
    Blocked,
    /// Timed wait in the sleeping queue.
    Sleeping,
    /// Waiting on a resource-specific queue.
    Waiting,
    /// Exited, slot not yet reclaimed.
    Died,
}

impl TaskState {
    /// States a task may be parked in by `task_block`.
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked | Self::Sleeping | Self::Waiting)
    }
}

/// Callee-saved registers and return address popped by the first switch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskFrame {
    pub edi: usize,
    pub esi: usize,
    pub ebx: usize,
    pub ebp: usize,
    pub eip: usize,
}

const STACK_WORDS: usize = PAGE_SIZE / size_of::<usize>();
const FRAME_WORDS: usize = size_of::<TaskFrame>() / size_of::<usize>();

/// One page of kernel stack. The lowest word holds [`TASK_MAGIC`]; a stack
/// that grows into it has overflowed.
#[repr(C, align(4096))]
pub struct KernelStack {
    words: [usize; STACK_WORDS],
}

impl KernelStack {
    fn new() -> Box<Self> {
        let mut stack = Box::new(Self {
            words: [0; STACK_WORDS],
        });
        stack.words[0] = TASK_MAGIC;
        stack
    }

    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn top(&self) -> usize {
        self.base() + PAGE_SIZE
    }

    pub fn canary(&self) -> usize {
        self.words[0]
    }

    /// Carve the initial frame at the top; returns the saved stack pointer.
    fn push_frame(&mut self, frame: TaskFrame) -> usize {
        let at = STACK_WORDS - FRAME_WORDS;
        self.words[at..].copy_from_slice(&[frame.edi, frame.esi, frame.ebx, frame.ebp, frame.eip]);
        self.base() + at * size_of::<usize>()
    }

    fn frame(&self) -> TaskFrame {
        let w = &self.words[STACK_WORDS - FRAME_WORDS..];
        TaskFrame {
            edi: w[0],
            esi: w[1],
            ebx: w[2],
            ebp: w[3],
            eip: w[4],
        }
    }
}

/// Task control block.
pub struct Task {
    /// Kernel stack pointer saved by the last switch away.
    pub(crate) stack_pointer: usize,
    pub(crate) state: TaskState,
    name: [u8; TASK_NAME_LEN],
    name_len: usize,
    pub(crate) priority: u32,
    /// Remaining ticks of the current time slice.
    pub(crate) ticks: u32,
    /// Wake deadline while sleeping, otherwise the tick it last ran at.
    pub(crate) jiffies: u32,
    pub(crate) uid: u32,
    pub(crate) space: AddressSpace,
    /// Program break, end of the user heap.
    pub(crate) brk: u32,
    pub(crate) link: Link,
    /// `None` for the boot context, which runs on the boot stack.
    stack: Option<Box<KernelStack>>,
}

impl Task {
    pub(crate) fn new(
        entry: TaskEntry,
        name: &str,
        priority: u32,
        uid: u32,
        space: AddressSpace,
    ) -> Self {
        let mut stack = KernelStack::new();
        let stack_pointer = stack.push_frame(TaskFrame {
            edi: 0x3333_3333,
            esi: 0x2222_2222,
            ebx: 0x1111_1111,
            ebp: 0x4444_4444,
            eip: entry as usize,
        });

        let mut task = Self::bare(name, priority, uid, space);
        task.stack_pointer = stack_pointer;
        task.stack = Some(stack);
        task
    }

    /// TCB for the context that is already running at boot.
    pub(crate) fn adopt_boot(space: AddressSpace) -> Self {
        let mut task = Self::bare("setup", 1, crate::config::KERNEL_UID, space);
        task.state = TaskState::Running;
        task
    }

    fn bare(name: &str, priority: u32, uid: u32, space: AddressSpace) -> Self {
        let mut buf = [0u8; TASK_NAME_LEN];
        let mut len = name.len().min(TASK_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);

        Self {
            stack_pointer: 0,
            state: TaskState::Ready,
            name: buf,
            name_len: len,
            priority,
            ticks: priority,
            jiffies: 0,
            uid,
            space,
            brk: 0,
            link: Link::Free,
            stack: None,
        }
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len]).unwrap_or("?")
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn jiffies(&self) -> u32 {
        self.jiffies
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn address_space(&self) -> AddressSpace {
        self.space
    }

    pub fn brk(&self) -> u32 {
        self.brk
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    pub fn stack(&self) -> Option<&KernelStack> {
        self.stack.as_deref()
    }

    /// Frame the first switch will pop, if this task has its own stack.
    pub fn initial_frame(&self) -> Option<TaskFrame> {
        self.stack.as_ref().map(|s| s.frame())
    }

    /// False once the stack has overflowed into its canary.
    pub fn magic_intact(&self) -> bool {
        self.stack.as_ref().map_or(true, |s| s.canary() == TASK_MAGIC)
    }

    #[cfg(test)]
    pub(crate) fn smash_canary(&mut self) {
        if let Some(stack) = self.stack.as_mut() {
            stack.words[0] = 0;
        }
    }
}
