use alloc::vec::Vec;
use core::fmt;

/// Boot phase status tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed(&'static str),
}

/// One boot phase and how far it got
#[derive(Debug, Clone, Copy)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: InitStatus,
}

impl ComponentStatus {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            status: InitStatus::NotStarted,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, InitStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, InitStatus::Failed(_))
    }
}

/// Registered boot phases, in registration order.
#[derive(Debug, Default)]
pub struct BootStatus {
    components: Vec<ComponentStatus>,
}

impl BootStatus {
    pub const fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Track a phase. Registering the same name twice is a no-op.
    pub fn register(&mut self, name: &'static str) {
        if self.get(name).is_none() {
            self.components.push(ComponentStatus::new(name));
        }
    }

    pub fn update(&mut self, name: &'static str, status: InitStatus) {
        if let Some(comp) = self.components.iter_mut().find(|c| c.name == name) {
            comp.status = status;
        }
    }

    pub fn get(&self, name: &str) -> Option<InitStatus> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.status)
    }

    pub fn all(&self) -> &[ComponentStatus] {
        &self.components
    }

    /// Check if every registered phase completed
    pub fn all_ready(&self) -> bool {
        !self.components.is_empty() && self.components.iter().all(|c| c.is_complete())
    }
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::NotStarted => write!(f, "Not Started"),
            InitStatus::InProgress => write!(f, "In Progress"),
            InitStatus::Completed => write!(f, "Completed"),
            InitStatus::Failed(err) => write!(f, "Failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_update() {
        let mut status = BootStatus::new();
        status.register("Interrupt System");
        status.register("Task System");
        status.register("Task System");
        assert_eq!(status.all().len(), 2);
        assert!(!status.all_ready());

        status.update("Interrupt System", InitStatus::Completed);
        status.update("Task System", InitStatus::Failed("no idle"));
        assert!(status.all()[1].is_failed());
        assert!(!status.all_ready());

        status.update("Task System", InitStatus::Completed);
        assert!(status.all_ready());
    }

    #[test]
    fn test_empty_is_not_ready() {
        assert!(!BootStatus::new().all_ready());
    }

    #[test]
    fn test_display() {
        assert_eq!(InitStatus::Failed("boom").to_string(), "Failed: boom");
        assert_eq!(InitStatus::InProgress.to_string(), "In Progress");
    }
}
