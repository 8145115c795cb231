//! Task definitions.
//!
//! A task is a unit of work submitted to the scheduler: an entry point plus
//! whatever state it captures. Submission pairs it with a completion counter
//! to form a bundle, which is what actually travels through the task queue.

use crate::context::TaskContext;
use crate::counter::AtomicCounter;

/// A unit of work.
///
/// The entry point receives a [`TaskContext`] carrying the scheduler handle
/// and the opaque heap/allocator handles; the task's argument is whatever the
/// closure captures. The scheduler never interprets captured state.
pub struct Task {
    entry: Box<dyn FnOnce(&TaskContext) + Send + 'static>,
}

impl Task {
    /// Creates a task from its entry point.
    pub fn new<F>(entry: F) -> Self
    where
        F: FnOnce(&TaskContext) + Send + 'static,
    {
        Task {
            entry: Box::new(entry),
        }
    }

    pub(crate) fn invoke(self, ctx: &TaskContext) {
        (self.entry)(ctx)
    }
}

/// A task plus the counter that tracks its completion.
///
/// Every bundle sharing a counter holds its own clone, so the counter stays
/// alive until the last bundle has been executed and the submitter has
/// dropped its handle.
pub(crate) struct TaskBundle {
    pub(crate) task: Task,
    pub(crate) counter: AtomicCounter,
}

impl TaskBundle {
    /// Invokes the entry point, then decrements the counter exactly once.
    pub(crate) fn run(self, ctx: &TaskContext) {
        self.task.invoke(ctx);
        self.counter.fetch_sub(1);
    }
}
