use crate::hal::Platform;
use crate::kernel::Kernel;
use crate::syscalls::dispatcher::SyscallResult;

/// Liveness probe for the gate itself
pub fn sys_test<P: Platform>(_kernel: &mut Kernel<P>) -> SyscallResult {
    klog!("syscall test...");
    Ok(255)
}

/// Give up the rest of the time slice
pub fn sys_yield<P: Platform>(kernel: &mut Kernel<P>) -> SyscallResult {
    kernel.task_yield();
    Ok(0)
}

/// Task-table slot of the caller
pub fn sys_getpid<P: Platform>(kernel: &mut Kernel<P>) -> SyscallResult {
    Ok(kernel.current().as_usize())
}
