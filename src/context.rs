//! The per-invocation context handed to every task.

use std::any::Any;
use std::sync::Arc;

use crate::counter::AtomicCounter;
use crate::fiber::{FiberSwitch, FiberYielder};
use crate::scheduler::SchedulerCore;
use crate::task::Task;

/// Opaque collaborator handles threaded through every task invocation.
///
/// The scheduler never interprets these; they are passed unchanged from
/// initialization to each task, which downcasts them to whatever concrete
/// heap and allocator types the application uses.
pub struct TaskServices {
    heap: Arc<dyn Any + Send + Sync>,
    allocator: Arc<dyn Any + Send + Sync>,
}

impl TaskServices {
    pub fn new(heap: Arc<dyn Any + Send + Sync>, allocator: Arc<dyn Any + Send + Sync>) -> Self {
        TaskServices { heap, allocator }
    }

    /// Services for a scheduler run without external collaborators.
    pub fn none() -> Self {
        TaskServices {
            heap: Arc::new(()),
            allocator: Arc::new(()),
        }
    }

    pub fn heap(&self) -> &(dyn Any + Send + Sync) {
        &*self.heap
    }

    pub fn allocator(&self) -> &(dyn Any + Send + Sync) {
        &*self.allocator
    }
}

impl Default for TaskServices {
    fn default() -> Self {
        TaskServices::none()
    }
}

/// Capabilities available to a running task.
///
/// Only the executor constructs one, so holding a `&TaskContext` proves the
/// caller is inside a task on a worker fiber. That is what makes
/// [`wait_for_counter`](TaskContext::wait_for_counter) safe to offer: it
/// suspends the current fiber instead of blocking the thread.
pub struct TaskContext<'a> {
    core: &'a SchedulerCore,
    yielder: &'a FiberYielder,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(core: &'a SchedulerCore, yielder: &'a FiberYielder) -> Self {
        TaskContext { core, yielder }
    }

    /// Submits one task. Returns its completion counter, initialized to 1.
    pub fn add_task(&self, task: Task) -> AtomicCounter {
        self.core.add_task(task)
    }

    /// Submits a group of tasks sharing one completion counter, initialized
    /// to the number of tasks.
    pub fn add_tasks(&self, tasks: impl IntoIterator<Item = Task>) -> AtomicCounter {
        self.core.add_tasks(tasks)
    }

    /// Suspends the current task until `counter` reaches `value`.
    ///
    /// The worker thread does not block while this task waits: it picks up a
    /// replacement fiber from the pool and keeps executing other work. When
    /// this returns, `counter.load() == value` has held at some point no
    /// earlier than the call. The task may resume on a different worker
    /// thread than the one it suspended on.
    pub fn wait_for_counter(&self, counter: &AtomicCounter, value: isize) {
        if counter.load() == value {
            return;
        }

        // May block: with a correctly sized pool some other worker returns a
        // fiber as soon as any task completes or any waiter is promoted.
        let next = self.core.fiber_pool.wait_dequeue();
        self.yielder.suspend(FiberSwitch::Park {
            next,
            counter: counter.clone(),
            value,
        });
        // Parked; an executor resumed us because it observed the target.
    }

    /// The opaque heap handle passed at initialization.
    pub fn heap(&self) -> &(dyn Any + Send + Sync) {
        self.core.services().heap()
    }

    /// The opaque allocator handle passed at initialization.
    pub fn allocator(&self) -> &(dyn Any + Send + Sync) {
        self.core.services().allocator()
    }
}
