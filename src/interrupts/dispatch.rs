//! Common interrupt entry.
//!
//! Every entry stub pushes a [`TrapFrame`] and calls
//! [`Kernel::handle_interrupt`], which routes on the [`Handler`] installed
//! for the vector.

use core::fmt;

use crate::config::{ENTRY_COUNT, EXCEPTION_COUNT};
use crate::hal::{Cpu, Platform};
use crate::kernel::Kernel;
use crate::memory::{FaultResolution, PageFault};

use super::{InterruptIndex, IRQ_COUNT, PAGE_FAULT_VECTOR, PIC_1_OFFSET};

/// Register snapshot in the order the entry stubs push it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub vector: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    /// Vector pushed by the stub itself, before the register save.
    pub vector0: u32,
    /// Hardware error code, or a zero pushed by the stub.
    pub error: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

impl TrapFrame {
    pub fn new(vector: u8) -> Self {
        Self {
            vector: u32::from(vector),
            vector0: u32::from(vector),
            ..Self::default()
        }
    }
}

/// Device handler installed with [`Kernel::set_interrupt_handler`].
pub type DriverFn<P> = fn(&mut Kernel<P>, &TrapFrame);

/// What runs for a vector.
pub enum Handler<P: Platform> {
    /// Print diagnostics and halt.
    Exception,
    PageFault,
    /// Acknowledge and count.
    Default,
    /// Timer tick driving the scheduler.
    Clock,
    Driver(DriverFn<P>),
}

impl<P: Platform> Handler<P> {
    /// Handler a vector gets when the interrupt system is initialized.
    pub fn initial(vector: usize) -> Self {
        match vector {
            v if v == usize::from(PAGE_FAULT_VECTOR) => Handler::PageFault,
            v if v < EXCEPTION_COUNT => Handler::Exception,
            _ => Handler::Default,
        }
    }
}

impl<P: Platform> Clone for Handler<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Platform> Copy for Handler<P> {}

impl<P: Platform> PartialEq for Handler<P> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handler::Driver(a), Handler::Driver(b)) => *a as usize == *b as usize,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl<P: Platform> fmt::Debug for Handler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Exception => write!(f, "Exception"),
            Handler::PageFault => write!(f, "PageFault"),
            Handler::Default => write!(f, "Default"),
            Handler::Clock => write!(f, "Clock"),
            Handler::Driver(func) => write!(f, "Driver({:#x})", *func as usize),
        }
    }
}

const EXCEPTION_MESSAGES: [&str; 0x16] = [
    "#DE Divide Error",
    "#DB RESERVED",
    "--  NMI Interrupt",
    "#BP Breakpoint",
    "#OF Overflow",
    "#BR BOUND Range Exceeded",
    "#UD Invalid Opcode (Undefined Opcode)",
    "#NM Device Not Available (No Math Coprocessor)",
    "#DF Double Fault",
    "    Coprocessor Segment Overrun (reserved)",
    "#TS Invalid TSS",
    "#NP Segment Not Present",
    "#SS Stack-Segment Fault",
    "#GP General Protection",
    "#PF Page Fault",
    "--  (Intel reserved. Do not use.)",
    "#MF x87 FPU Floating-Point Error (Math Fault)",
    "#AC Alignment Check",
    "#MC Machine Check",
    "#XF SIMD Floating-Point Exception",
    "#VE Virtualization Exception",
    "#CP Control Protection Exception",
];

const RESERVED_MESSAGE: usize = 0x0f;

/// Mnemonic for an exception vector. Everything past the table reports the
/// Intel-reserved entry.
pub fn exception_message(vector: u32) -> &'static str {
    EXCEPTION_MESSAGES
        .get(vector as usize)
        .copied()
        .unwrap_or(EXCEPTION_MESSAGES[RESERVED_MESSAGE])
}

impl<P: Platform> Kernel<P> {
    /// Entry point for every stub-backed vector.
    pub fn handle_interrupt(&mut self, frame: &TrapFrame) {
        let vector = frame.vector as usize;
        assert!(vector < ENTRY_COUNT, "no entry stub for vector {:#04x}", vector);

        match self.handlers[vector] {
            Handler::Exception => self.exception_handler(frame),
            Handler::PageFault => {
                self.page_fault_handler(frame);
            }
            Handler::Default => self.default_handler(frame.vector as u8),
            Handler::Clock => self.clock_handler(frame),
            Handler::Driver(func) => func(self, frame),
        }
    }

    pub fn handler(&self, vector: usize) -> Handler<P> {
        self.handlers[vector]
    }

    /// Install a driver for device line `irq`, replacing the default handler.
    pub fn set_interrupt_handler(&mut self, irq: u8, handler: DriverFn<P>) {
        assert!(irq < IRQ_COUNT, "IRQ {} out of range", irq);
        self.handlers[usize::from(PIC_1_OFFSET + irq)] = Handler::Driver(handler);
    }

    /// Unmask (`enable`) or mask device line `irq` at the controller.
    pub fn set_interrupt_mask(&mut self, irq: u8, enable: bool) {
        self.pics.set_mask(&mut self.platform, irq, enable);
    }

    /// Acknowledge a device vector at the controller(s) it came through.
    pub fn send_eoi(&mut self, vector: u8) {
        self.pics.notify_end_of_interrupt(&mut self.platform, vector);
    }

    /// Number of interrupts the default device handler has absorbed.
    pub fn default_irq_count(&self) -> u32 {
        self.default_irqs
    }

    fn exception_handler(&mut self, frame: &TrapFrame) -> ! {
        println!();
        println!("EXCEPTION : {} ", exception_message(frame.vector));
        println!("   VECTOR : 0x{:02X}", frame.vector);
        println!("    ERROR : 0x{:08X}", frame.error);
        println!("   EFLAGS : 0x{:08X}", frame.eflags);
        println!("       CS : 0x{:02X}", frame.cs);
        println!("      EIP : 0x{:08X}", frame.eip);
        println!("      ESP : 0x{:08X}", frame.esp);

        self.platform.halt()
    }

    fn page_fault_handler(&mut self, frame: &TrapFrame) -> FaultResolution {
        assert_eq!(
            frame.vector,
            u32::from(PAGE_FAULT_VECTOR),
            "page fault handler on wrong vector"
        );

        let fault = PageFault::new(self.platform.fault_address(), frame.error);
        klog!("Page fault address {:#010x}", fault.address);
        self.page_fault(fault)
    }

    fn default_handler(&mut self, vector: u8) {
        self.send_eoi(vector);
        klog!("[{:x}] default interrupt called {}...", vector, self.default_irqs);
        self.default_irqs = self.default_irqs.wrapping_add(1);
    }

    fn clock_handler(&mut self, frame: &TrapFrame) {
        let vector = InterruptIndex::Clock.as_u8();
        assert_eq!(frame.vector, u32::from(vector), "clock handler on wrong vector");

        self.send_eoi(vector);
        self.sched.tick(&mut self.platform);
    }
}
