//! Hardware collaborators.
//!
//! The core never touches the machine directly. Boot code provides one
//! platform object implementing every trait here and hands it to
//! [`Kernel::new`](crate::Kernel::new).
//!
//! ```text
//! +-------------------+
//! |    Kernel core    |  interrupts, memory, task
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! |    HAL traits     |  Cpu, PortIo, ContextSwitch, Mmu
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! | Platform (boot)   |  cli/sti, in/out, task_switch, page tables
//! +-------------------+
//! ```

use crate::interrupts::idt::IdtPointer;
use crate::memory::{AddressSpace, PageEntry};

/// Processor control.
pub trait Cpu {
    /// Current value of the interrupt-enable flag (EFLAGS.IF).
    fn irq_enabled(&self) -> bool;

    /// Set or clear the interrupt-enable flag (`sti` / `cli`).
    fn set_irq_enabled(&mut self, enabled: bool);

    /// Faulting linear address of the last page fault (CR2).
    fn fault_address(&self) -> u32;

    /// Load the interrupt descriptor table register.
    fn load_idt(&mut self, pointer: &IdtPointer);

    /// Stop the machine for good.
    fn halt(&mut self) -> !;

    /// Disable interrupts and return whether they were enabled before.
    fn irq_disable(&mut self) -> bool {
        let previous = self.irq_enabled();
        self.set_irq_enabled(false);
        previous
    }

    fn irq_enable(&mut self) {
        self.set_irq_enabled(true);
    }
}

/// Raw port I/O.
pub trait PortIo {
    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, port: u16, value: u8);
    fn inw(&mut self, port: u16) -> u16;
    fn outw(&mut self, port: u16, value: u16);
}

/// Kernel-to-kernel context switch.
pub trait ContextSwitch {
    /// Save the running stack pointer into `prev_sp` and resume the task
    /// whose saved stack pointer is `next_sp`.
    ///
    /// # Safety
    /// `next_sp` must point at a frame laid out by task creation or saved by
    /// an earlier switch, and interrupts must be disabled.
    unsafe fn switch(&mut self, prev_sp: &mut usize, next_sp: usize);
}

/// Paging collaborator consulted by the page-fault resolver.
pub trait Mmu {
    /// Page directory and virtual-memory map shared by kernel tasks.
    fn kernel_space(&self) -> AddressSpace;

    /// Page-table entry mapping `vaddr` in the active address space.
    fn page_entry(&mut self, vaddr: u32) -> &mut PageEntry;

    /// Number of address spaces referencing physical frame `index`.
    fn frame_refs(&self, index: u32) -> u8;

    /// Drop one reference to physical frame `index`.
    fn put_frame(&mut self, index: u32);

    /// Allocate a frame, copy the page at `vaddr` into it, and return the
    /// new frame's physical address.
    fn copy_page(&mut self, vaddr: u32) -> u32;

    /// Invalidate the cached translation of `vaddr`.
    fn flush_tlb(&mut self, vaddr: u32);

    /// Map a fresh zero-filled frame at the page `vaddr`.
    fn link_page(&mut self, vaddr: u32);
}

/// Everything the kernel core needs from the machine.
pub trait Platform: Cpu + PortIo + ContextSwitch + Mmu {}

impl<T: Cpu + PortIo + ContextSwitch + Mmu> Platform for T {}
