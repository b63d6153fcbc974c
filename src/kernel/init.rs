//! Kernel boot phases

use crate::hal::{Cpu, Platform};
use crate::interrupts::EntryStubs;
use crate::task::sched::InitThreads;

use super::status::InitStatus;
use super::Kernel;

const PHASES: [&str; 2] = ["Interrupt System", "Task System"];

impl<P: Platform> Kernel<P> {
    /// Bring up the interrupt system, then the task system. Interrupts stay
    /// disabled; the caller enables them once it is ready to be preempted.
    pub fn boot(&mut self, stubs: &EntryStubs, threads: InitThreads) -> Result<(), &'static str> {
        for name in PHASES {
            self.status.register(name);
        }
        println!("╔════════════════════════════════════════╗");
        println!("║        Ember Kernel Initialization     ║");
        println!("╚════════════════════════════════════════╝\n");

        self.init_phase(1, PHASES[0], |k| k.init_interrupts(stubs))?;
        self.init_phase(2, PHASES[1], |k| k.init_tasks(threads))?;

        println!("\n✅ Kernel initialization complete!\n");
        Ok(())
    }

    fn init_phase<F>(&mut self, step: usize, name: &'static str, init_fn: F) -> Result<(), &'static str>
    where
        F: FnOnce(&mut Self) -> Result<(), &'static str>,
    {
        self.status.update(name, InitStatus::InProgress);
        println!("[{}/{}] Initializing {}...", step, PHASES.len(), name);

        match init_fn(self) {
            Ok(()) => {
                self.status.update(name, InitStatus::Completed);
                println!("    ✓ {} initialized successfully\n", name);
                Ok(())
            }
            Err(e) => {
                self.status.update(name, InitStatus::Failed(e));
                println!("    ✗ {} failed: {}\n", name, e);
                Err(e)
            }
        }
    }

    fn init_interrupts(&mut self, stubs: &EntryStubs) -> Result<(), &'static str> {
        if self.platform.irq_enabled() {
            return Err("interrupts enabled before the gate table exists");
        }

        self.interrupt_init(stubs);
        self.clock_init();
        Ok(())
    }

    fn init_tasks(&mut self, threads: InitThreads) -> Result<(), &'static str> {
        if self.sched.idle().is_some() {
            return Err("task system already initialized");
        }

        self.task_init(threads);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::KernelConfig;
    use crate::hal::Cpu;
    use crate::kernel::{InitStatus, Kernel};
    use crate::testing::{stubs, threads, MockPlatform};

    #[test]
    fn test_boot_runs_both_phases() {
        let mut k = Kernel::new(MockPlatform::new(), KernelConfig::default());
        k.boot(&stubs(), threads()).unwrap();

        assert!(k.boot_status().all_ready());
        assert!(k.platform().loaded_idt().is_some());
        assert_eq!(k.scheduler().tasks().count(), 4);
        assert!(!k.irq_enabled());
    }

    #[test]
    fn test_boot_with_interrupts_enabled_fails_first_phase() {
        let mut k = Kernel::new(MockPlatform::new(), KernelConfig::default());
        k.platform_mut().set_irq_enabled(true);

        let err = k.boot(&stubs(), threads()).unwrap_err();
        assert_eq!(err, "interrupts enabled before the gate table exists");
        assert_eq!(k.boot_status().get("Interrupt System"), Some(InitStatus::Failed(err)));
        assert_eq!(k.boot_status().get("Task System"), Some(InitStatus::NotStarted));
        assert_eq!(k.scheduler().tasks().count(), 1);
    }

    #[test]
    fn test_second_boot_fails_task_phase() {
        let mut k = Kernel::new(MockPlatform::new(), KernelConfig::default());
        k.boot(&stubs(), threads()).unwrap();

        let err = k.boot(&stubs(), threads()).unwrap_err();
        assert_eq!(err, "task system already initialized");
        assert_eq!(k.boot_status().get("Interrupt System"), Some(InitStatus::Completed));
    }
}
