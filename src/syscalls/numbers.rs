//! System call numbers, passed in `eax`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum SyscallNumber {
    Test = 0,
    Yield = 1,
    Sleep = 2,
    GetPid = 3,
    Brk = 4,

    // Unknown
    Unknown = usize::MAX,
}

impl From<usize> for SyscallNumber {
    fn from(num: usize) -> Self {
        match num {
            0 => Self::Test,
            1 => Self::Yield,
            2 => Self::Sleep,
            3 => Self::GetPid,
            4 => Self::Brk,
            _ => Self::Unknown,
        }
    }
}
