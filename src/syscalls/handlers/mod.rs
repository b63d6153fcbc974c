//! # System Call Handlers
//!
//! ## Modules
//!
//! - `process`: test, yield, getpid
//! - `time`: sleep
//! - `memory`: brk
//!
//! ## Handler Signature
//!
//! Each handler takes the kernel plus its register arguments:
//! ```ignore
//! fn sys_sleep<P: Platform>(kernel: &mut Kernel<P>, ms: usize) -> SyscallResult
//! ```

pub mod memory;
pub mod process;
pub mod time;
