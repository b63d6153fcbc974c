//! # Programmable Interrupt Controller (8259 PIC)
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │◀────│   PIC 2     │
//! │  (Master)   │ IR2 │  (Slave)    │
//! │ IRQ 0-7     │     │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │
//!       ▼
//!     CPU
//! ```
//!
//! ## Vector Remapping
//!
//! IRQ 0-15 would collide with CPU exception vectors, so they are remapped:
//! - PIC 1: vectors 0x20-0x27 (IRQ 0-7)
//! - PIC 2: vectors 0x28-0x2F (IRQ 8-15)
//!
//! All lines start masked. A line delivers nothing until a driver unmasks it.

use crate::hal::PortIo;

pub const PIC_1_OFFSET: u8 = 0x20; // Master PIC handles IRQs 0-7
pub const PIC_2_OFFSET: u8 = 0x28; // Slave PIC handles IRQs 8-15

pub const PIC_1_COMMAND: u16 = 0x20;
pub const PIC_1_DATA: u16 = 0x21;
pub const PIC_2_COMMAND: u16 = 0xa0;
pub const PIC_2_DATA: u16 = 0xa1;

pub const PIC_EOI: u8 = 0x20;

/// Edge triggered, cascaded, ICW4 follows.
const ICW1_INIT: u8 = 0b0001_0001;
/// Slave attached to master input 2.
const ICW3_MASTER_CASCADE: u8 = 0b0000_0100;
/// Slave cascade identity.
const ICW3_SLAVE_ID: u8 = 2;
/// 8086 mode, normal EOI.
const ICW4_8086: u8 = 0b0000_0001;
const MASK_ALL: u8 = 0xff;

/// The master/slave 8259 pair. Stateless: every operation goes through the
/// caller's port I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainedPics;

impl ChainedPics {
    pub const fn new() -> Self {
        Self
    }

    /// Remap both controllers and mask every line.
    pub fn initialize<P: PortIo>(&self, io: &mut P) {
        io.outb(PIC_1_COMMAND, ICW1_INIT);
        io.outb(PIC_1_DATA, PIC_1_OFFSET);
        io.outb(PIC_1_DATA, ICW3_MASTER_CASCADE);
        io.outb(PIC_1_DATA, ICW4_8086);

        io.outb(PIC_2_COMMAND, ICW1_INIT);
        io.outb(PIC_2_DATA, PIC_2_OFFSET);
        io.outb(PIC_2_DATA, ICW3_SLAVE_ID);
        io.outb(PIC_2_DATA, ICW4_8086);

        io.outb(PIC_1_DATA, MASK_ALL);
        io.outb(PIC_2_DATA, MASK_ALL);
    }

    pub fn handles_interrupt(&self, vector: u8) -> bool {
        (PIC_1_OFFSET..PIC_2_OFFSET + 8).contains(&vector)
    }

    /// Acknowledge `vector`. Slave vectors are acknowledged at the slave
    /// first, then at the master whose cascade input they came through.
    pub fn notify_end_of_interrupt<P: PortIo>(&self, io: &mut P, vector: u8) {
        if (PIC_1_OFFSET..PIC_2_OFFSET).contains(&vector) {
            io.outb(PIC_1_COMMAND, PIC_EOI);
        }
        if (PIC_2_OFFSET..PIC_2_OFFSET + 8).contains(&vector) {
            io.outb(PIC_2_COMMAND, PIC_EOI);
            io.outb(PIC_1_COMMAND, PIC_EOI);
        }
    }

    /// Unmask (`enable`) or mask IRQ line `irq` in 0..16.
    pub fn set_mask<P: PortIo>(&self, io: &mut P, irq: u8, enable: bool) {
        assert!(irq < 16, "IRQ {} out of range", irq);

        let (port, line) = if irq < 8 {
            (PIC_1_DATA, irq)
        } else {
            (PIC_2_DATA, irq - 8)
        };

        let mask = io.inb(port);
        let mask = if enable {
            mask & !(1 << line)
        } else {
            mask | (1 << line)
        };
        io.outb(port, mask);
    }
}
