use crate::hal::Platform;
use crate::interrupts::TrapFrame;
use crate::kernel::Kernel;
use crate::syscalls::handlers;
use crate::syscalls::numbers::SyscallNumber;

/// System call result type
pub type SyscallResult = Result<usize, SyscallError>;

/// System call errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    InvalidSyscall,
    InvalidArgument,
    NoMemory,
}

impl SyscallError {
    pub fn as_errno(self) -> isize {
        match self {
            Self::InvalidSyscall => -1,
            Self::InvalidArgument => -22, // EINVAL
            Self::NoMemory => -12,        // ENOMEM
        }
    }
}

/// System call context - the number and arguments from the saved registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallContext {
    pub syscall_num: usize,
    pub arg0: usize,
    pub arg1: usize,
    pub arg2: usize,
}

impl SyscallContext {
    /// `int 0x80` convention:
    ///   eax = syscall number
    ///   ebx = arg0
    ///   ecx = arg1
    ///   edx = arg2
    pub fn from_frame(frame: &TrapFrame) -> Self {
        Self {
            syscall_num: frame.eax as usize,
            arg0: frame.ebx as usize,
            arg1: frame.ecx as usize,
            arg2: frame.edx as usize,
        }
    }
}

impl<P: Platform> Kernel<P> {
    /// Main syscall dispatcher
    pub fn syscall(&mut self, ctx: SyscallContext) -> SyscallResult {
        let syscall = SyscallNumber::from(ctx.syscall_num);

        #[cfg(debug_assertions)]
        crate::println!("SYSCALL: {:?}({}, {}, {})", syscall, ctx.arg0, ctx.arg1, ctx.arg2);

        match syscall {
            SyscallNumber::Test => handlers::process::sys_test(self),
            SyscallNumber::Yield => handlers::process::sys_yield(self),
            SyscallNumber::GetPid => handlers::process::sys_getpid(self),
            SyscallNumber::Sleep => handlers::time::sys_sleep(self, ctx.arg0),
            SyscallNumber::Brk => handlers::memory::sys_brk(self, ctx.arg0),
            SyscallNumber::Unknown => Err(SyscallError::InvalidSyscall),
        }
    }

    /// Service the syscall gate: read the request from `frame` and leave the
    /// result (or negative errno) in its `eax`.
    pub fn handle_syscall(&mut self, frame: &mut TrapFrame) {
        let ret = match self.syscall(SyscallContext::from_frame(frame)) {
            Ok(value) => value as isize,
            Err(e) => e.as_errno(),
        };
        frame.eax = ret as u32;
    }
}
