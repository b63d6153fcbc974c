//! # Time System Call Handlers
//!
//! ## Timer Resolution
//!
//! Sleeps are rounded up to whole timer ticks (`KernelConfig::jiffy_ms`).
//! The caller is parked on the sleeping queue, not busy-waiting.

use crate::hal::Platform;
use crate::kernel::Kernel;
use crate::syscalls::dispatcher::{SyscallError, SyscallResult};

/// Sleep for specified milliseconds
pub fn sys_sleep<P: Platform>(kernel: &mut Kernel<P>, milliseconds: usize) -> SyscallResult {
    let ms = u32::try_from(milliseconds).map_err(|_| SyscallError::InvalidArgument)?;
    if ms == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    kernel.task_sleep(ms);
    Ok(0)
}
