//! Worker fibers and the switch directives that move them between owners.
//!
//! A fiber is a stackful execution context running the executor loop. Fibers
//! suspend by yielding a [`FiberSwitch`] directive to the worker thread that
//! resumed them; the directive names the fiber to run next and says what to
//! do with the one that just suspended (recycle it into the pool, or park it
//! in the waiting list). The bookkeeping therefore always runs on the worker
//! thread's native stack, never on the stack being handed away.

use std::io;

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};

use crate::counter::AtomicCounter;
use crate::executor;
use crate::scheduler::CorePtr;

/// Yielder handed to the executor loop; suspending through it performs a
/// fiber switch.
pub(crate) type FiberYielder = Yielder<(), FiberSwitch>;

/// What a suspending fiber asks its worker thread to do.
///
/// This is the switch-parameter record travelling with the context switch:
/// it owns the `next` fiber outright, so a directive in flight is the only
/// handle to that fiber anywhere in the system.
pub(crate) enum FiberSwitch {
    /// Recycle the suspended fiber into the fiber pool, then resume `next`.
    Recycle { next: WorkerFiber },
    /// Park the suspended fiber in the waiting list under `(counter, value)`,
    /// then resume `next`.
    Park {
        next: WorkerFiber,
        counter: AtomicCounter,
        value: isize,
    },
}

/// Outcome of resuming a fiber.
pub(crate) enum FiberState {
    /// The fiber suspended and handed over a switch directive.
    Switched(FiberSwitch),
    /// The executor loop ran to completion (the scheduler is quitting).
    Finished,
}

/// A pre-allocated user-space stack running the executor loop.
pub(crate) struct WorkerFiber {
    coroutine: Coroutine<(), FiberSwitch, (), DefaultStack>,
}

impl WorkerFiber {
    /// Creates an idle fiber with its own stack. Stack allocation may fail;
    /// the scheduler treats that as a fatal initialization error.
    pub(crate) fn new(stack_size: usize, core: CorePtr) -> io::Result<Self> {
        let stack = DefaultStack::new(stack_size)?;
        let coroutine = Coroutine::with_stack(stack, move |yielder, _: ()| {
            // SAFETY: every fiber is owned by the scheduler core (through the
            // pool, the waiting list, a worker's loop, or a directive in
            // flight), so the core outlives any running fiber.
            let core = unsafe { core.get() };
            executor::run(core, yielder);
        });
        Ok(WorkerFiber { coroutine })
    }

    /// Runs the fiber until it suspends or its executor loop finishes.
    ///
    /// A first resume starts the executor loop; later resumes continue from
    /// the suspension point, possibly on a different thread than the one the
    /// fiber suspended on.
    pub(crate) fn resume(&mut self) -> FiberState {
        match self.coroutine.resume(()) {
            CoroutineResult::Yield(switch) => FiberState::Switched(switch),
            CoroutineResult::Return(()) => FiberState::Finished,
        }
    }
}

// SAFETY: fibers migrate between worker threads by design. The executor loop
// never holds thread-affine state (thread locals, pinned references) across a
// suspension point, and a fiber is only ever resumed by the single thread
// that currently owns it.
unsafe impl Send for WorkerFiber {}

#[cfg(test)]
pub(crate) fn idle_test_fiber() -> WorkerFiber {
    // A never-resumed fiber; dropping it does not touch the core pointer.
    WorkerFiber::new(32 * 1024, CorePtr::null()).expect("test stack allocation failed")
}
