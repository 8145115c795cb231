//! Worker threads.
//!
//! Each worker thread is pinned to a core and runs fibers: it resumes one
//! fiber at a time and, when that fiber suspends, performs the handover the
//! fiber asked for. The handover runs here, on the thread's native stack,
//! because the suspended fiber cannot recycle itself: it would be touching
//! a stack it had already given away.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use core_affinity::CoreId;
use log::debug;

use crate::fiber::{FiberState, FiberSwitch};
use crate::scheduler::SchedulerCore;
use crate::wait_list::WaitingTask;

/// Handle to a spawned worker thread.
pub(crate) struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a worker pinned to `core_id` (when available) running the
    /// fiber-switch loop until the scheduler quits.
    pub(crate) fn spawn(
        id: usize,
        core: Arc<SchedulerCore>,
        core_id: Option<CoreId>,
    ) -> io::Result<Worker> {
        let handle = thread::Builder::new()
            .name(format!("fibertask-worker-{id}"))
            .spawn(move || {
                if let Some(core_id) = core_id {
                    core_affinity::set_for_current(core_id);
                }
                debug!("worker {id} online");
                run(&core);
                debug!("worker {id} offline");
            })?;

        Ok(Worker {
            id,
            handle: Some(handle),
        })
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Waits for the worker thread to finish. Surfaces a panic that unwound
    /// the thread (a task fault) as `Err`.
    pub(crate) fn join(&mut self) -> thread::Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

/// The switch loop: resume the current fiber, then carry out its directive.
///
/// The two directive arms are the only places a fiber changes owner while
/// the scheduler runs. Ordering matters: the outgoing fiber is made
/// reachable (pool or waiting list) only after its `resume` returned, i.e.
/// after it is fully suspended, so another thread picking it up immediately
/// is safe.
fn run(core: &SchedulerCore) {
    let mut fiber = core.fiber_pool.wait_dequeue();
    loop {
        let state = fiber.resume();
        match state {
            FiberState::Switched(FiberSwitch::Recycle { next }) => {
                core.fiber_pool.enqueue(fiber);
                fiber = next;
            }
            FiberState::Switched(FiberSwitch::Park {
                next,
                counter,
                value,
            }) => {
                core.wait_list.insert(WaitingTask {
                    fiber,
                    counter,
                    value,
                });
                fiber = next;
            }
            FiberState::Finished => break,
        }
    }
}
