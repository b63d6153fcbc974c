//! # Ember Kernel Core
//!
//! Privileged core of a small preemptive-multitasking kernel for a 32-bit
//! protected-mode machine:
//!
//! - `interrupts`: gate table, 8259 controller programming, critical sections,
//!   and the common interrupt dispatch
//! - `memory`: page-fault resolution (copy-on-write and lazy allocation)
//! - `task`: task control blocks, wait queues, and the scheduler
//! - `syscalls`: the single `int 0x80` gate
//!
//! Hardware access goes through the traits in [`hal`]; the boot code supplies
//! the implementations and owns the [`Kernel`] instance.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub mod logging;

pub mod config;
pub mod hal;
pub mod interrupts;
pub mod kernel;
pub mod memory;
pub mod syscalls;
pub mod task;

#[cfg(test)]
mod testing;

pub use config::KernelConfig;
pub use hal::Platform;
pub use kernel::Kernel;
pub use task::InitThreads;
