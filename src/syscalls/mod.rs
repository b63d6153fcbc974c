//! # System Calls
//!
//! User code enters through the single `int 0x80` gate, the only gate with
//! DPL 3. The entry stub hands the saved registers to
//! [`Kernel::handle_syscall`](crate::Kernel::handle_syscall).

pub mod dispatcher;
pub mod handlers;
pub mod numbers;

pub use dispatcher::{SyscallContext, SyscallError, SyscallResult};
pub use numbers::SyscallNumber;
