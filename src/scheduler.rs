//! The scheduler façade: lifecycle, submission, and shutdown.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::context::TaskServices;
use crate::counter::AtomicCounter;
use crate::fiber::WorkerFiber;
use crate::fiber_pool::FiberPool;
use crate::queue::TaskQueue;
use crate::task::{Task, TaskBundle};
use crate::wait_list::WaitList;
use crate::worker::Worker;

/// Stack size for worker fibers.
pub const DEFAULT_STACK_SIZE: usize = 512 * 1024;

/// Errors surfaced by scheduler initialization and shutdown.
///
/// There is no recovery path: an initialization error leaves the scheduler
/// un-started, and steady-state operation assumes correct use.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler requires at least one worker thread")]
    NoWorkers,
    #[error("fiber pool of {fibers} cannot serve {workers} worker threads")]
    PoolTooSmall { fibers: usize, workers: usize },
    #[error("failed to allocate a fiber stack")]
    FiberStack(#[source] io::Error),
    #[error("failed to spawn a worker thread")]
    SpawnThread(#[source] io::Error),
    #[error("{0} worker thread(s) panicked")]
    WorkersPanicked(usize),
}

/// State shared by the façade, the worker threads, and every fiber.
pub(crate) struct SchedulerCore {
    pub(crate) task_queue: TaskQueue,
    pub(crate) fiber_pool: FiberPool,
    pub(crate) wait_list: WaitList,
    quit: AtomicBool,
    services: TaskServices,
}

impl SchedulerCore {
    pub(crate) fn add_task(&self, task: Task) -> AtomicCounter {
        let counter = AtomicCounter::new(1);
        self.task_queue.enqueue(TaskBundle {
            task,
            counter: counter.clone(),
        });
        counter
    }

    pub(crate) fn add_tasks(&self, tasks: impl IntoIterator<Item = Task>) -> AtomicCounter {
        let tasks: Vec<Task> = tasks.into_iter().collect();
        // The counter must carry the full task count before the first bundle
        // becomes runnable, or an early completion could release waiters.
        let counter = AtomicCounter::new(tasks.len() as isize);
        for task in tasks {
            self.task_queue.enqueue(TaskBundle {
                task,
                counter: counter.clone(),
            });
        }
        counter
    }

    pub(crate) fn quitting(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    pub(crate) fn services(&self) -> &TaskServices {
        &self.services
    }
}

impl Drop for SchedulerCore {
    fn drop(&mut self) {
        // Workers are already joined. Fibers still idle in the pool may be
        // suspended mid-loop; dropping them unwinds their stacks.
        while let Some(fiber) = self.fiber_pool.try_dequeue() {
            drop(fiber);
        }
    }
}

/// Pointer to the scheduler core for fiber closures.
///
/// Fibers cannot hold an `Arc` to the core: the core owns the fiber pool and
/// the pool owns the fibers, so a strong reference from a fiber closure would
/// cycle. The raw pointer is sound because every fiber is owned by the core
/// and torn down before it.
#[derive(Clone, Copy)]
pub(crate) struct CorePtr(*const SchedulerCore);

impl CorePtr {
    fn new(core: &Arc<SchedulerCore>) -> Self {
        CorePtr(Arc::as_ptr(core))
    }

    /// # Safety
    ///
    /// The core must still be alive, which holds whenever the calling fiber
    /// is running (the core owns all fibers and drops them first).
    pub(crate) unsafe fn get<'a>(self) -> &'a SchedulerCore {
        &*self.0
    }

    #[cfg(test)]
    pub(crate) fn null() -> Self {
        CorePtr(std::ptr::null())
    }
}

// SAFETY: the pointer is only dereferenced through `get`, whose contract
// guarantees the core is alive; the core itself is Sync.
unsafe impl Send for CorePtr {}

/// Fiber-based fork-join task scheduler.
///
/// Creates a pool of worker fibers and one pinned worker thread per logical
/// core; tasks submitted here run on those fibers and may suspend mid-task
/// with [`TaskContext::wait_for_counter`](crate::TaskContext::wait_for_counter)
/// without ever blocking a worker thread.
///
/// # Example
///
/// ```no_run
/// use fibertask::{Task, TaskScheduler, TaskServices};
///
/// let scheduler = TaskScheduler::new(64, TaskServices::none()).unwrap();
///
/// let counter = scheduler.add_task(Task::new(|ctx| {
///     let nested = ctx.add_task(Task::new(|_| println!("nested")));
///     ctx.wait_for_counter(&nested, 0);
/// }));
///
/// scheduler.wait_for_counter(&counter, 0);
/// scheduler.quit().unwrap();
/// ```
pub struct TaskScheduler {
    core: Arc<SchedulerCore>,
    workers: Vec<Worker>,
}

impl TaskScheduler {
    /// Creates a scheduler with `fiber_pool_size` worker fibers and one
    /// worker thread per logical processor.
    ///
    /// `fiber_pool_size` bounds how many tasks can be suspended in
    /// `wait_for_counter` at once: the pool must hold at least one fiber per
    /// worker thread plus one per concurrent waiter, or waiting starves the
    /// pool and deadlocks. Sizing for the waiter population is the caller's
    /// responsibility; only the per-thread minimum is checked here.
    pub fn new(fiber_pool_size: usize, services: TaskServices) -> Result<Self, SchedulerError> {
        let num_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        TaskScheduler::with_threads(fiber_pool_size, num_threads, services)
    }

    /// Creates a scheduler with an explicit worker-thread count.
    pub fn with_threads(
        fiber_pool_size: usize,
        num_threads: usize,
        services: TaskServices,
    ) -> Result<Self, SchedulerError> {
        if num_threads == 0 {
            return Err(SchedulerError::NoWorkers);
        }
        if fiber_pool_size < num_threads {
            return Err(SchedulerError::PoolTooSmall {
                fibers: fiber_pool_size,
                workers: num_threads,
            });
        }

        let core = Arc::new(SchedulerCore {
            task_queue: TaskQueue::new(),
            fiber_pool: FiberPool::new(),
            wait_list: WaitList::new(),
            quit: AtomicBool::new(false),
            services,
        });

        let core_ptr = CorePtr::new(&core);
        for _ in 0..fiber_pool_size {
            let fiber = WorkerFiber::new(DEFAULT_STACK_SIZE, core_ptr)
                .map_err(SchedulerError::FiberStack)?;
            core.fiber_pool.enqueue(fiber);
        }
        debug!("created {fiber_pool_size} worker fibers");

        let core_ids = core_affinity::get_core_ids().unwrap_or_default();
        let mut workers = Vec::with_capacity(num_threads);
        for id in 0..num_threads {
            let core_id = if core_ids.is_empty() {
                None
            } else {
                Some(core_ids[id % core_ids.len()])
            };
            match Worker::spawn(id, Arc::clone(&core), core_id) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    // Unwind the partially constructed pool of threads.
                    core.request_quit();
                    for mut worker in workers {
                        let _ = worker.join();
                    }
                    return Err(SchedulerError::SpawnThread(err));
                }
            }
        }
        debug!("spawned {num_threads} worker threads");

        Ok(TaskScheduler { core, workers })
    }

    /// Submits one task. Returns its completion counter, initialized to 1
    /// and decremented when the task returns.
    pub fn add_task(&self, task: Task) -> AtomicCounter {
        self.core.add_task(task)
    }

    /// Submits a group of tasks sharing one completion counter, initialized
    /// to the number of tasks.
    pub fn add_tasks(&self, tasks: impl IntoIterator<Item = Task>) -> AtomicCounter {
        self.core.add_tasks(tasks)
    }

    /// Waits until `counter` reaches `value` by polling with exponential
    /// backoff.
    ///
    /// This is the wait for threads that are not workers (typically the
    /// thread that created the scheduler). Tasks must use
    /// [`TaskContext::wait_for_counter`](crate::TaskContext::wait_for_counter)
    /// instead, which suspends the fiber rather than sleeping.
    pub fn wait_for_counter(&self, counter: &AtomicCounter, value: isize) {
        let mut backoff_us = 1;
        const MAX_BACKOFF_US: u64 = 1000;

        while counter.load() != value {
            thread::sleep(Duration::from_micros(backoff_us));
            backoff_us = (backoff_us * 2).min(MAX_BACKOFF_US);
        }
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Shuts the scheduler down: sets the quit flag and joins every worker
    /// thread.
    ///
    /// All outstanding counters must have reached their targets before
    /// calling this; quitting with tasks still in flight or fibers still
    /// parked is a programming error and may hang. Idle fibers remaining in
    /// the pool are destroyed when the scheduler drops.
    pub fn quit(mut self) -> Result<(), SchedulerError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if self.workers.is_empty() {
            return Ok(());
        }

        self.core.request_quit();
        debug!(
            "quit: joining {} workers ({} fibers idle in pool)",
            self.workers.len(),
            self.core.fiber_pool.len()
        );

        let mut panicked = 0;
        for worker in &mut self.workers {
            let id = worker.id();
            if worker.join().is_err() {
                panicked += 1;
                warn!("worker {id} panicked during execution");
            }
        }
        self.workers.clear();

        if panicked > 0 {
            Err(SchedulerError::WorkersPanicked(panicked))
        } else {
            Ok(())
        }
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &SchedulerCore {
        &self.core
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
