//! Simulated machine for host tests.

use std::collections::HashMap;

use crate::config::{KernelConfig, ENTRY_COUNT, PAGE_SIZE};
use crate::hal::{ContextSwitch, Cpu, Mmu, PortIo};
use crate::interrupts::idt::IdtPointer;
use crate::interrupts::EntryStubs;
use crate::kernel::Kernel;
use crate::memory::{page_addr, page_align_down, AddressSpace, PageEntry};
use crate::task::sched::InitThreads;

/// Stack pointer the mock stores into the outgoing task on every switch.
const SAVED_SP: usize = 0x5a5a_0000;

/// First frame handed out by `copy_page` and `link_page`.
const FIRST_FREE_FRAME: u32 = 0x1000;

pub struct MockPlatform {
    irq: bool,
    cr2: u32,
    idt: Option<IdtPointer>,
    ports: HashMap<u16, u8>,
    wide_ports: HashMap<u16, u16>,
    writes: Vec<(u16, u8)>,
    switches: Vec<usize>,
    pages: HashMap<u32, PageEntry>,
    refs: HashMap<u32, u8>,
    frames: HashMap<u32, Vec<u8>>,
    next_frame: u32,
    flushed: Vec<u32>,
    copies: usize,
    driver_calls: Vec<u32>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            irq: false,
            cr2: 0,
            idt: None,
            ports: HashMap::new(),
            wide_ports: HashMap::new(),
            writes: Vec::new(),
            switches: Vec::new(),
            pages: HashMap::new(),
            refs: HashMap::new(),
            frames: HashMap::new(),
            next_frame: FIRST_FREE_FRAME,
            flushed: Vec::new(),
            copies: 0,
            driver_calls: Vec::new(),
        }
    }

    // Ports

    pub fn port_writes(&self) -> Vec<(u16, u8)> {
        self.writes.clone()
    }

    pub fn clear_port_writes(&mut self) {
        self.writes.clear();
    }

    pub fn port_value(&self, port: u16) -> u8 {
        self.ports.get(&port).copied().unwrap_or(0)
    }

    // CPU

    pub fn set_fault_address(&mut self, vaddr: u32) {
        self.cr2 = vaddr;
    }

    pub fn loaded_idt(&self) -> Option<IdtPointer> {
        self.idt
    }

    // Context switches

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    pub fn last_switch_target(&self) -> Option<usize> {
        self.switches.last().copied()
    }

    pub fn saved_marker(&self) -> usize {
        SAVED_SP
    }

    // Paging

    pub fn map(&mut self, vaddr: u32, entry: PageEntry) {
        self.pages.insert(page_align_down(vaddr), entry);
    }

    pub fn entry(&self, vaddr: u32) -> PageEntry {
        self.pages
            .get(&page_align_down(vaddr))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_mapped(&self, vaddr: u32) -> bool {
        self.entry(vaddr).is_present()
    }

    pub fn set_frame_refs(&mut self, frame: u32, refs: u8) {
        self.refs.insert(frame, refs);
    }

    pub fn fill_frame(&mut self, frame: u32, byte: u8) {
        self.frames.insert(frame, vec![byte; PAGE_SIZE]);
    }

    pub fn frame_bytes(&self, frame: u32) -> Vec<u8> {
        self.frames
            .get(&frame)
            .cloned()
            .unwrap_or_else(|| vec![0; PAGE_SIZE])
    }

    pub fn flushed(&self) -> Vec<u32> {
        self.flushed.clone()
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    // Drivers

    pub fn record_driver_call(&mut self, vector: u32) {
        self.driver_calls.push(vector);
    }

    pub fn driver_calls(&self) -> Vec<u32> {
        self.driver_calls.clone()
    }

    fn alloc_frame(&mut self, contents: Vec<u8>) -> u32 {
        let frame = self.next_frame;
        self.next_frame += 1;
        self.frames.insert(frame, contents);
        self.refs.insert(frame, 1);
        frame
    }
}

impl Cpu for MockPlatform {
    fn irq_enabled(&self) -> bool {
        self.irq
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        self.irq = enabled;
    }

    fn fault_address(&self) -> u32 {
        self.cr2
    }

    fn load_idt(&mut self, pointer: &IdtPointer) {
        self.idt = Some(*pointer);
    }

    fn halt(&mut self) -> ! {
        panic!("cpu halted");
    }
}

impl PortIo for MockPlatform {
    fn inb(&mut self, port: u16) -> u8 {
        self.port_value(port)
    }

    fn outb(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
        self.ports.insert(port, value);
    }

    fn inw(&mut self, port: u16) -> u16 {
        self.wide_ports.get(&port).copied().unwrap_or(0)
    }

    fn outw(&mut self, port: u16, value: u16) {
        self.wide_ports.insert(port, value);
    }
}

impl ContextSwitch for MockPlatform {
    unsafe fn switch(&mut self, prev_sp: &mut usize, next_sp: usize) {
        *prev_sp = SAVED_SP;
        self.switches.push(next_sp);
    }
}

impl Mmu for MockPlatform {
    fn kernel_space(&self) -> AddressSpace {
        AddressSpace {
            page_dir: 0x1000,
            vmap: 0x2000,
        }
    }

    fn page_entry(&mut self, vaddr: u32) -> &mut PageEntry {
        self.pages.entry(page_align_down(vaddr)).or_default()
    }

    fn frame_refs(&self, index: u32) -> u8 {
        self.refs.get(&index).copied().unwrap_or(0)
    }

    fn put_frame(&mut self, index: u32) {
        let refs = self.refs.entry(index).or_insert(0);
        assert!(*refs > 0, "put_frame on free frame {:#x}", index);
        *refs -= 1;
    }

    fn copy_page(&mut self, vaddr: u32) -> u32 {
        let source = self.entry(vaddr).frame_index();
        let contents = self.frame_bytes(source);
        let frame = self.alloc_frame(contents);
        self.copies += 1;
        page_addr(frame)
    }

    fn flush_tlb(&mut self, vaddr: u32) {
        self.flushed.push(vaddr);
    }

    fn link_page(&mut self, vaddr: u32) {
        let frame = self.alloc_frame(vec![0; PAGE_SIZE]);
        self.map(vaddr, PageEntry::new(frame));
    }
}

extern "C" fn idle_thread() {}
extern "C" fn init_thread() {}
extern "C" fn test_thread() {}

pub fn threads() -> InitThreads {
    InitThreads {
        idle: idle_thread,
        init: init_thread,
        test: test_thread,
    }
}

pub fn stubs() -> EntryStubs {
    let mut vectors = [0u32; ENTRY_COUNT];
    for (i, v) in vectors.iter_mut().enumerate() {
        *v = 0x0010_1000 + (i as u32) * 0x10;
    }
    EntryStubs {
        vectors,
        syscall: 0x0010_2000,
    }
}

/// Kernel with the interrupt system initialized and only the boot task.
pub fn kernel() -> Kernel<MockPlatform> {
    let mut kernel = Kernel::new(MockPlatform::new(), KernelConfig::default());
    kernel.interrupt_init(&stubs());
    kernel
}
