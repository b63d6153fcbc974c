//! Page-fault resolution: copy-on-write break and lazy allocation.
//!
//! Anything else is fatal. There is no swap and no deferred paging.

use x86_64::structures::idt::PageFaultErrorCode;

use crate::config::{KERNEL_MEMORY_SIZE, USER_STACK_BOTTOM, USER_STACK_TOP};
use crate::hal::Mmu;

use super::{page_align_down, page_index};

/// Decoded fault: the CR2 address plus the hardware error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFault {
    pub address: u32,
    pub code: PageFaultErrorCode,
}

impl PageFault {
    pub fn new(address: u32, error: u32) -> Self {
        Self {
            address,
            code: PageFaultErrorCode::from_bits_truncate(u64::from(error)),
        }
    }

    /// The page was present, so this is a protection violation.
    pub fn present(&self) -> bool {
        self.code.contains(PageFaultErrorCode::PROTECTION_VIOLATION)
    }

    pub fn write(&self) -> bool {
        self.code.contains(PageFaultErrorCode::CAUSED_BY_WRITE)
    }

    pub fn user(&self) -> bool {
        self.code.contains(PageFaultErrorCode::USER_MODE)
    }
}

/// How a fault was resolved. The faulting instruction is retried afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultResolution {
    /// Sole owner of a shared frame: the entry was made writable in place.
    Reclaimed { frame: u32 },
    /// Frame still shared: the page was copied into `frame`.
    Copied { from: u32, frame: u32 },
    /// A zeroed frame was mapped at `page`.
    Allocated { page: u32 },
}

/// Resolve `fault` for a task whose program break is `brk`.
///
/// Panics when the fault is neither a copy-on-write write nor a user access
/// inside the heap or stack region.
pub fn resolve_page_fault<M: Mmu>(mm: &mut M, fault: PageFault, brk: u32) -> FaultResolution {
    let vaddr = fault.address;

    // The identity-mapped kernel region below KERNEL_MEMORY_SIZE never faults.
    assert!(
        (KERNEL_MEMORY_SIZE..USER_STACK_TOP).contains(&vaddr),
        "page fault at {:#010x} outside user space",
        vaddr
    );

    if fault.present() {
        assert!(fault.write(), "present page fault at {:#010x} without write", vaddr);
        return copy_on_write(mm, vaddr);
    }

    if fault.user() && (vaddr < brk || vaddr > USER_STACK_BOTTOM) {
        let page = page_align_down(vaddr);
        mm.link_page(page);
        klog!("LAZY page for {:#010x}", vaddr);
        return FaultResolution::Allocated { page };
    }

    panic!("Page Fault!!! address {:#010x} code {:?}", vaddr, fault.code);
}

fn copy_on_write<M: Mmu>(mm: &mut M, vaddr: u32) -> FaultResolution {
    let index = mm.page_entry(vaddr).frame_index();
    assert!(mm.frame_refs(index) > 0, "frame {:#x} has no owner", index);

    let resolution = if mm.frame_refs(index) == 1 {
        // Every other owner already broke away; keep the frame.
        mm.page_entry(vaddr).set_writable(true);
        FaultResolution::Reclaimed { frame: index }
    } else {
        let paddr = mm.copy_page(page_align_down(vaddr));
        let frame = page_index(paddr);
        mm.page_entry(vaddr).init(frame);
        mm.flush_tlb(vaddr);
        mm.put_frame(index);
        FaultResolution::Copied { from: index, frame }
    };

    assert!(mm.frame_refs(index) > 0, "frame {:#x} lost its last owner", index);
    klog!("WRITE page for {:#010x}", vaddr);
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PageEntry;
    use crate::testing::MockPlatform;

    const P: u32 = 1 << 0;
    const W: u32 = 1 << 1;
    const U: u32 = 1 << 2;

    const HEAP_ADDR: u32 = 0x0080_2000;
    const BRK: u32 = 0x0090_0000;

    fn shared_readonly(mm: &mut MockPlatform, vaddr: u32, frame: u32, refs: u8) {
        let mut entry = PageEntry::new(frame);
        entry.set_writable(false);
        mm.map(vaddr, entry);
        mm.set_frame_refs(frame, refs);
        mm.fill_frame(frame, 0xab);
    }

    #[test]
    fn test_decode_error_code() {
        let fault = PageFault::new(HEAP_ADDR, P | W | U);
        assert!(fault.present() && fault.write() && fault.user());

        let fault = PageFault::new(HEAP_ADDR, U);
        assert!(!fault.present() && !fault.write() && fault.user());
    }

    #[test]
    fn test_cow_shared_frame_is_copied() {
        let mut mm = MockPlatform::new();
        shared_readonly(&mut mm, HEAP_ADDR, 0x300, 2);

        let resolution = resolve_page_fault(&mut mm, PageFault::new(HEAP_ADDR + 4, P | W | U), BRK);

        let FaultResolution::Copied { from, frame } = resolution else {
            panic!("expected copy, got {:?}", resolution);
        };
        assert_eq!(from, 0x300);
        assert_ne!(frame, 0x300);

        let entry = mm.entry(HEAP_ADDR);
        assert_eq!(entry.frame_index(), frame);
        assert!(entry.is_writable());
        assert_eq!(mm.frame_refs(0x300), 1);
        assert_eq!(mm.frame_refs(frame), 1);
        assert!(mm.frame_bytes(frame).iter().all(|&b| b == 0xab));
        assert_eq!(mm.flushed(), vec![HEAP_ADDR + 4]);
    }

    #[test]
    fn test_cow_other_owner_untouched() {
        let mut mm = MockPlatform::new();
        shared_readonly(&mut mm, HEAP_ADDR, 0x300, 2);

        resolve_page_fault(&mut mm, PageFault::new(HEAP_ADDR, P | W | U), BRK);

        // The other address space still maps frame 0x300, now its sole owner.
        assert_eq!(mm.frame_refs(0x300), 1);
        assert!(mm.frame_bytes(0x300).iter().all(|&b| b == 0xab));
    }

    #[test]
    fn test_cow_sole_owner_flips_writable_without_copy() {
        let mut mm = MockPlatform::new();
        shared_readonly(&mut mm, HEAP_ADDR, 0x300, 1);

        let resolution = resolve_page_fault(&mut mm, PageFault::new(HEAP_ADDR, P | W | U), BRK);

        assert_eq!(resolution, FaultResolution::Reclaimed { frame: 0x300 });
        let entry = mm.entry(HEAP_ADDR);
        assert_eq!(entry.frame_index(), 0x300);
        assert!(entry.is_writable());
        assert_eq!(mm.frame_refs(0x300), 1);
        assert_eq!(mm.copies(), 0);
    }

    #[test]
    fn test_lazy_allocation_inside_heap() {
        let mut mm = MockPlatform::new();
        let vaddr = HEAP_ADDR + 0x123;

        let resolution = resolve_page_fault(&mut mm, PageFault::new(vaddr, U | W), BRK);

        assert_eq!(resolution, FaultResolution::Allocated { page: HEAP_ADDR });
        let entry = mm.entry(HEAP_ADDR);
        assert!(entry.is_present());
        assert!(mm.frame_bytes(entry.frame_index()).iter().all(|&b| b == 0));
        // A retried access finds the page mapped and would not fault again.
        assert!(mm.is_mapped(vaddr));
    }

    #[test]
    fn test_lazy_allocation_inside_stack() {
        let mut mm = MockPlatform::new();
        let vaddr = USER_STACK_TOP - 8;

        let resolution = resolve_page_fault(&mut mm, PageFault::new(vaddr, U | W), BRK);
        assert_eq!(resolution, FaultResolution::Allocated { page: USER_STACK_TOP - 0x1000 });
    }

    #[test]
    #[should_panic(expected = "Page Fault!!!")]
    fn test_gap_between_heap_and_stack_is_fatal() {
        let mut mm = MockPlatform::new();
        resolve_page_fault(&mut mm, PageFault::new(BRK + 0x1000, U), BRK);
    }

    #[test]
    #[should_panic(expected = "Page Fault!!!")]
    fn test_kernel_mode_not_present_is_fatal() {
        let mut mm = MockPlatform::new();
        resolve_page_fault(&mut mm, PageFault::new(HEAP_ADDR, W), BRK);
    }

    #[test]
    #[should_panic(expected = "outside user space")]
    fn test_fault_in_kernel_region_is_fatal() {
        let mut mm = MockPlatform::new();
        resolve_page_fault(&mut mm, PageFault::new(0x1000, U), BRK);
    }
}
