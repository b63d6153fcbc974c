//! Interrupt descriptor table in the 32-bit protected-mode encoding.
//!
//! Every vector below [`ENTRY_COUNT`] gets a kernel-only interrupt gate that
//! points at its entry stub. The syscall vector is the only gate user code
//! may trigger with `int`.

use core::mem::size_of;

use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use crate::config::{ENTRY_COUNT, IDT_SIZE, SYSCALL_VECTOR};

/// Kernel code segment: GDT index 1.
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, PrivilegeLevel::Ring0);

const GATE_TYPE_INTERRUPT: u8 = 0b1110;
const GATE_DPL_SHIFT: u8 = 5;
const GATE_PRESENT: u8 = 1 << 7;

/// One IDT entry, exactly as the CPU reads it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gate {
    offset_low: u16,
    selector: u16,
    reserved: u8,
    /// type:4 | segment:1 | DPL:2 | present:1
    attributes: u8,
    offset_high: u16,
}

const _: () = assert!(size_of::<Gate>() == 8);

impl Gate {
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            reserved: 0,
            attributes: 0,
            offset_high: 0,
        }
    }

    /// Present interrupt gate entering `handler` through `selector`.
    pub fn interrupt(handler: u32, selector: SegmentSelector, dpl: PrivilegeLevel) -> Self {
        Self {
            offset_low: (handler & 0xffff) as u16,
            selector: selector.0,
            reserved: 0,
            attributes: GATE_PRESENT | ((dpl as u8) << GATE_DPL_SHIFT) | GATE_TYPE_INTERRUPT,
            offset_high: (handler >> 16) as u16,
        }
    }

    pub fn offset(&self) -> u32 {
        u32::from(self.offset_high) << 16 | u32::from(self.offset_low)
    }

    pub fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }

    pub fn dpl(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_u16(u16::from((self.attributes >> GATE_DPL_SHIFT) & 0b11))
    }

    pub fn gate_type(&self) -> u8 {
        self.attributes & 0x0f
    }

    pub fn is_present(&self) -> bool {
        self.attributes & GATE_PRESENT != 0
    }

    /// The raw 8 bytes, low address first.
    pub fn to_bytes(&self) -> [u8; 8] {
        let low = self.offset_low.to_le_bytes();
        let sel = self.selector.to_le_bytes();
        let high = self.offset_high.to_le_bytes();
        [low[0], low[1], sel[0], sel[1], self.reserved, self.attributes, high[0], high[1]]
    }
}

/// Addresses of the external entry trampolines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStubs {
    /// One stub per vector in `0..ENTRY_COUNT`.
    pub vectors: [u32; ENTRY_COUNT],
    pub syscall: u32,
}

/// Operand of `lidt`.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct IdtPointer {
    pub limit: u16,
    pub base: u32,
}

#[repr(C, align(8))]
pub struct GateTable {
    gates: [Gate; IDT_SIZE],
}

impl GateTable {
    pub const fn new() -> Self {
        Self {
            gates: [Gate::missing(); IDT_SIZE],
        }
    }

    /// Fill every stub gate as kernel-only, then open the syscall gate to ring 3.
    pub fn build(&mut self, stubs: &EntryStubs) {
        for (gate, &handler) in self.gates.iter_mut().zip(stubs.vectors.iter()) {
            *gate = Gate::interrupt(handler, KERNEL_CODE_SELECTOR, PrivilegeLevel::Ring0);
        }

        self.gates[SYSCALL_VECTOR] =
            Gate::interrupt(stubs.syscall, KERNEL_CODE_SELECTOR, PrivilegeLevel::Ring3);
    }

    pub fn gate(&self, vector: usize) -> &Gate {
        &self.gates[vector]
    }

    pub fn pointer(&self) -> IdtPointer {
        IdtPointer {
            limit: (size_of::<[Gate; IDT_SIZE]>() - 1) as u16,
            base: self.gates.as_ptr() as usize as u32,
        }
    }
}

impl Default for GateTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stubs() -> EntryStubs {
        let mut vectors = [0u32; ENTRY_COUNT];
        for (i, v) in vectors.iter_mut().enumerate() {
            *v = 0x0010_1000 + (i as u32) * 0x10;
        }
        EntryStubs {
            vectors,
            syscall: 0x0012_3456,
        }
    }

    #[test]
    fn test_gate_encoding_matches_hardware_layout() {
        let gate = Gate::interrupt(0x1234_5678, KERNEL_CODE_SELECTOR, PrivilegeLevel::Ring0);
        assert_eq!(gate.to_bytes(), [0x78, 0x56, 0x08, 0x00, 0x00, 0x8e, 0x34, 0x12]);

        let user = Gate::interrupt(0x1234_5678, KERNEL_CODE_SELECTOR, PrivilegeLevel::Ring3);
        assert_eq!(user.to_bytes()[5], 0xee);
    }

    #[test]
    fn test_build_points_each_vector_at_its_stub() {
        let stubs = stubs();
        let mut table = GateTable::new();
        table.build(&stubs);

        for vector in 0..ENTRY_COUNT {
            let gate = table.gate(vector);
            assert!(gate.is_present());
            assert_eq!(gate.offset(), stubs.vectors[vector]);
            assert_eq!(gate.selector(), KERNEL_CODE_SELECTOR);
            assert_eq!(gate.dpl(), PrivilegeLevel::Ring0);
            assert_eq!(gate.gate_type(), GATE_TYPE_INTERRUPT);
        }
        assert!(!table.gate(ENTRY_COUNT).is_present());
    }

    #[test]
    fn test_only_syscall_gate_is_user_callable() {
        let mut table = GateTable::new();
        table.build(&stubs());

        let syscall = table.gate(SYSCALL_VECTOR);
        assert_eq!(syscall.dpl(), PrivilegeLevel::Ring3);
        assert_eq!(syscall.offset(), 0x0012_3456);

        let user_gates = (0..IDT_SIZE)
            .filter(|&v| table.gate(v).is_present() && table.gate(v).dpl() == PrivilegeLevel::Ring3)
            .count();
        assert_eq!(user_gates, 1);
    }

    #[test]
    fn test_pointer_limit_covers_whole_table() {
        let table = GateTable::new();
        let pointer = table.pointer();
        let limit = pointer.limit;
        assert_eq!(limit as usize, IDT_SIZE * 8 - 1);
    }
}
