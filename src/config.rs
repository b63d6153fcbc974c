//! Kernel-wide constants and boot-time configuration.

/// Number of gates in the interrupt descriptor table.
pub const IDT_SIZE: usize = 256;

/// Vectors with a dedicated entry stub: 32 exceptions plus 16 device IRQs.
pub const ENTRY_COUNT: usize = 0x30;

/// CPU exception vectors 0x00..0x20.
pub const EXCEPTION_COUNT: usize = 0x20;

/// The user-callable software interrupt.
pub const SYSCALL_VECTOR: usize = 0x80;

/// Capacity of the task table.
pub const NUM_TASKS: usize = 64;

/// Wait queues, including the default blocked queue and the sleeping queue.
pub const NUM_QUEUES: usize = 16;

pub const PAGE_SIZE: usize = 0x1000;

pub const TASK_NAME_LEN: usize = 16;

/// Canary written at the base of every kernel stack.
pub const TASK_MAGIC: usize = 0x2002_1025;

/// Identity-mapped kernel memory; nothing below this address may fault.
pub const KERNEL_MEMORY_SIZE: u32 = 0x80_0000;

pub const USER_STACK_TOP: u32 = 0x1000_0000;
pub const USER_STACK_SIZE: u32 = 0x20_0000;
pub const USER_STACK_BOTTOM: u32 = USER_STACK_TOP - USER_STACK_SIZE;

pub const KERNEL_UID: u32 = 0;
pub const USER_UID: u32 = 1000;

/// Milliseconds per timer tick unless configured otherwise.
pub const DEFAULT_JIFFY_MS: u32 = 10;

/// Settings fixed when the kernel object is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Timer tick granularity; sleeps are rounded up to whole ticks.
    pub jiffy_ms: u32,
}

impl KernelConfig {
    pub const fn new(jiffy_ms: u32) -> Self {
        Self { jiffy_ms }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_JIFFY_MS)
    }
}
