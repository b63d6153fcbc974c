//! Program break.
//!
//! Heap pages are not mapped here: the page-fault resolver maps them lazily
//! on first touch below the break.

use crate::config::{KERNEL_MEMORY_SIZE, USER_STACK_BOTTOM};
use crate::hal::Platform;
use crate::kernel::Kernel;
use crate::memory::page_align_down;
use crate::syscalls::dispatcher::{SyscallError, SyscallResult};

/// Change data segment size. `0` queries the current break.
pub fn sys_brk<P: Platform>(kernel: &mut Kernel<P>, addr: usize) -> SyscallResult {
    let current = kernel.scheduler().task(kernel.current()).brk();
    if addr == 0 {
        return Ok(current as usize);
    }

    let addr = u32::try_from(addr).map_err(|_| SyscallError::NoMemory)?;
    if addr != page_align_down(addr) || addr < KERNEL_MEMORY_SIZE {
        return Err(SyscallError::InvalidArgument);
    }
    // The heap may not run into the stack region.
    if addr >= USER_STACK_BOTTOM {
        return Err(SyscallError::NoMemory);
    }

    kernel.set_brk(addr);
    Ok(addr as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::kernel;

    #[test]
    fn test_query_then_move_break() {
        let mut k = kernel();
        assert_eq!(sys_brk(&mut k, 0), Ok(0));
        assert_eq!(sys_brk(&mut k, 0x0090_0000), Ok(0x0090_0000));
        assert_eq!(sys_brk(&mut k, 0), Ok(0x0090_0000));
    }

    #[test]
    fn test_rejects_bad_breaks() {
        let mut k = kernel();
        assert_eq!(sys_brk(&mut k, 0x0090_0010), Err(SyscallError::InvalidArgument));
        assert_eq!(sys_brk(&mut k, 0x1000), Err(SyscallError::InvalidArgument));
        assert_eq!(sys_brk(&mut k, USER_STACK_BOTTOM as usize), Err(SyscallError::NoMemory));
        assert_eq!(sys_brk(&mut k, 0), Ok(0));
    }
}
