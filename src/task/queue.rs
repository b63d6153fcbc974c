//! Intrusive wait queues.
//!
//! Queues store only head and tail; the links live in each task's [`Link`].
//! A task's link names the one queue it belongs to, so double membership
//! cannot be expressed.

use super::TaskId;

/// Identity of a wait queue owned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub(crate) u8);

impl QueueId {
    /// Default queue for `task_block` callers that bring none.
    pub const BLOCKED: QueueId = QueueId(0);
    /// Sleeping tasks, ascending by wake deadline.
    pub const SLEEPING: QueueId = QueueId(1);

    pub(crate) const RESERVED: u8 = 2;

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Queue membership of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Free,
    Queued {
        queue: QueueId,
        prev: Option<TaskId>,
        next: Option<TaskId>,
    },
}

impl Link {
    pub fn queue(&self) -> Option<QueueId> {
        match *self {
            Link::Free => None,
            Link::Queued { queue, .. } => Some(queue),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Link::Free)
    }

    pub(crate) fn prev(&self) -> Option<TaskId> {
        match *self {
            Link::Free => None,
            Link::Queued { prev, .. } => prev,
        }
    }

    pub(crate) fn next(&self) -> Option<TaskId> {
        match *self {
            Link::Free => None,
            Link::Queued { next, .. } => next,
        }
    }

    pub(crate) fn set_prev(&mut self, to: Option<TaskId>) {
        if let Link::Queued { prev, .. } = self {
            *prev = to;
        }
    }

    pub(crate) fn set_next(&mut self, to: Option<TaskId>) {
        if let Link::Queued { next, .. } = self {
            *next = to;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQueue {
    pub(crate) head: Option<TaskId>,
    pub(crate) tail: Option<TaskId>,
    pub(crate) len: usize,
}

impl TaskQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn head(&self) -> Option<TaskId> {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
