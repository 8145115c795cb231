//! The loop every worker fiber runs.

use std::thread;

use log::trace;

use crate::context::TaskContext;
use crate::fiber::{FiberSwitch, FiberYielder};
use crate::scheduler::SchedulerCore;

/// Runs until the scheduler's quit flag is set.
///
/// Ready waiters are strictly preferred over new tasks: as soon as any worker
/// is between tasks it promotes a satisfied waiter, which keeps the wakeup
/// latency of dependent tasks bounded by the runtime of one task per worker.
pub(crate) fn run(core: &SchedulerCore, yielder: &FiberYielder) {
    while !core.quitting() {
        if let Some(ready) = core.wait_list.take_ready() {
            trace!("promoting waiter (target {})", ready.value);
            // Switch to the waiter's fiber; this fiber is recycled into the
            // pool and control comes back here once someone dequeues it and
            // resumes it, possibly on another thread.
            yielder.suspend(FiberSwitch::Recycle { next: ready.fiber });
            continue;
        }

        match core.task_queue.try_dequeue() {
            Some(bundle) => {
                let ctx = TaskContext::new(core, yielder);
                bundle.run(&ctx);
            }
            None => thread::yield_now(),
        }
    }
}
