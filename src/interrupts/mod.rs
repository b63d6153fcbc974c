//! # Interrupt Handling Module
//!
//! - **IDT**: 32-bit gate descriptors for the 48 entry stubs plus the syscall gate
//! - **PIC**: cascaded 8259 controllers, masking and EOI
//! - **Guard**: nestable interrupt-disable sections
//! - **Dispatch**: the common entry every stub calls into
//!
//! ## Interrupt Vector Layout
//!
//! | Vector    | Type                   | Handler                    |
//! |-----------|------------------------|----------------------------|
//! | 0x00-0x1F | CPU Exceptions         | diagnostic halt            |
//! | 0x0E      | Page Fault             | page-fault resolver        |
//! | 0x20      | Clock (IRQ0)           | clock handler              |
//! | 0x21-0x2F | Devices (IRQ1-15)      | default handler or driver  |
//! | 0x80      | Syscall (DPL 3)        | syscall dispatch           |

pub mod dispatch;
pub mod guard;
pub mod idt;
pub mod pic;

pub use dispatch::{exception_message, DriverFn, Handler, TrapFrame};
pub use guard::CriticalSection;
pub use idt::{EntryStubs, Gate, GateTable};
pub use pic::{ChainedPics, PIC_1_OFFSET, PIC_2_OFFSET};

/// Vector of the page-fault exception.
pub const PAGE_FAULT_VECTOR: u8 = 0x0e;

/// Device IRQ lines on the two controllers.
pub const IRQ_COUNT: u8 = 16;

// Interrupt indices - these are the actual vector numbers the CPU sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Clock = PIC_1_OFFSET, // 0x20 - IRQ0
    Syscall = 0x80,
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_usize(self) -> usize {
        usize::from(self.as_u8())
    }

    /// IRQ line for device vectors, `None` for the syscall gate.
    pub fn irq(self) -> Option<u8> {
        let vector = self.as_u8();
        (PIC_1_OFFSET..PIC_1_OFFSET + IRQ_COUNT)
            .contains(&vector)
            .then(|| vector - PIC_1_OFFSET)
    }
}
