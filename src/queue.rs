//! The shared task queue.

use crossbeam::deque::{Injector, Steal};

use crate::task::TaskBundle;

/// MPMC FIFO of task bundles.
///
/// FIFO per producer; no total order across producers. `try_dequeue` never
/// blocks; the executor treats emptiness as a signal to yield the OS thread.
pub(crate) struct TaskQueue {
    injector: Injector<TaskBundle>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        TaskQueue {
            injector: Injector::new(),
        }
    }

    pub(crate) fn enqueue(&self, bundle: TaskBundle) {
        self.injector.push(bundle);
    }

    pub(crate) fn try_dequeue(&self) -> Option<TaskBundle> {
        loop {
            match self.injector.steal() {
                Steal::Success(bundle) => return Some(bundle),
                Steal::Empty => return None,
                // Lost a race with another consumer; the queue state is
                // still unknown, so try again.
                Steal::Retry => {}
            }
        }
    }
}
