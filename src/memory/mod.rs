//! Paging vocabulary shared with the memory collaborator, and the page-fault
//! resolver.
//!
//! Frame allocation, the reference-count table, and the page tables
//! themselves live behind [`Mmu`](crate::hal::Mmu).

pub mod fault;

use x86_64::structures::paging::PageTableFlags;

pub use fault::{resolve_page_fault, FaultResolution, PageFault};

use crate::config::PAGE_SIZE;

const FRAME_SHIFT: u32 = 12;
const FLAG_MASK: u32 = 0xfff;

/// Round `addr` down to its page.
pub const fn page_align_down(addr: u32) -> u32 {
    addr & !(PAGE_SIZE as u32 - 1)
}

/// Page number of `addr`.
pub const fn page_index(addr: u32) -> u32 {
    addr >> FRAME_SHIFT
}

/// Address of page number `index`.
pub const fn page_addr(index: u32) -> u32 {
    index << FRAME_SHIFT
}

/// 32-bit page-table entry: 20-bit frame index over 12 flag bits.
///
/// The low flag bits share their meaning with the 64-bit encoding, so they
/// are handled as [`PageTableFlags`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageEntry(u32);

impl PageEntry {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Fresh user mapping of frame `index`: present, writable, user.
    pub fn new(index: u32) -> Self {
        let mut entry = Self::empty();
        entry.init(index);
        entry
    }

    /// Reset to a present, writable, user-accessible mapping of `index`.
    pub fn init(&mut self, index: u32) {
        let flags =
            PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER_ACCESSIBLE;
        self.0 = index << FRAME_SHIFT | flags.bits() as u32;
    }

    pub fn flags(&self) -> PageTableFlags {
        PageTableFlags::from_bits_truncate(u64::from(self.0 & FLAG_MASK))
    }

    pub fn set_flags(&mut self, flags: PageTableFlags) {
        self.0 = (self.0 & !FLAG_MASK) | (flags.bits() as u32 & FLAG_MASK);
    }

    pub fn frame_index(&self) -> u32 {
        self.0 >> FRAME_SHIFT
    }

    pub fn set_frame_index(&mut self, index: u32) {
        self.0 = index << FRAME_SHIFT | (self.0 & FLAG_MASK);
    }

    pub fn is_present(&self) -> bool {
        self.flags().contains(PageTableFlags::PRESENT)
    }

    pub fn is_writable(&self) -> bool {
        self.flags().contains(PageTableFlags::WRITABLE)
    }

    pub fn set_writable(&mut self, writable: bool) {
        let mut flags = self.flags();
        flags.set(PageTableFlags::WRITABLE, writable);
        self.set_flags(flags);
    }
}

/// Page directory and virtual-memory map of one address space, as physical
/// addresses owned by the memory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressSpace {
    pub page_dir: u32,
    pub vmap: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_entry_layout() {
        let entry = PageEntry::new(0x12345);
        assert_eq!(entry.raw(), 0x1234_5007);
        assert_eq!(entry.frame_index(), 0x12345);
        assert!(entry.is_present());
        assert!(entry.is_writable());
    }

    #[test]
    fn test_set_writable_keeps_frame() {
        let mut entry = PageEntry::new(0x400);
        entry.set_writable(false);
        assert_eq!(entry.raw(), 0x0040_0005);
        entry.set_writable(true);
        assert_eq!(entry.frame_index(), 0x400);
        assert!(entry.is_writable());
    }

    #[test]
    fn test_page_rounding() {
        assert_eq!(page_align_down(0x0080_1234), 0x0080_1000);
        assert_eq!(page_index(0x0080_1234), 0x801);
        assert_eq!(page_addr(0x801), 0x0080_1000);
    }
}
