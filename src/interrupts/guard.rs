//! Nestable interrupt-disable sections.
//!
//! This is the only concurrency control in the kernel. With one core, the
//! only thing that can race a queue or scheduler update is an interrupt, so
//! every such update runs between [`CriticalSection::save`] and
//! [`CriticalSection::restore`].

use crate::hal::Cpu;

/// Nesting counter plus the interrupt flag seen by the outermost `save`.
#[derive(Debug, Default)]
pub struct CriticalSection {
    depth: usize,
    outer_state: bool,
}

impl CriticalSection {
    pub const fn new() -> Self {
        Self {
            depth: 0,
            outer_state: false,
        }
    }

    /// Disable interrupts and enter a (possibly nested) section.
    pub fn save<C: Cpu>(&mut self, cpu: &mut C) {
        let previous = cpu.irq_disable();

        // Only the outermost entry can observe interrupts enabled.
        if self.depth == 0 {
            self.outer_state = previous;
        }
        self.depth += 1;
    }

    /// Leave a section. The outermost `restore` puts back the flag that the
    /// outermost `save` found.
    pub fn restore<C: Cpu>(&mut self, cpu: &mut C) {
        assert!(!cpu.irq_enabled(), "irq_restore with interrupts enabled");
        assert!(self.depth > 0, "irq_restore without matching irq_save");

        self.depth -= 1;
        if self.depth == 0 {
            cpu.set_irq_enabled(self.outer_state);
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
