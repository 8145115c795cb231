//! # fibertask - fiber-based fork-join task scheduler
//!
//! A task scheduler for fork-join parallelism on multi-core hardware. User
//! code submits small units of work ("tasks"), groups them by a shared
//! completion counter, and waits on that counter *from within another task*
//! without blocking an operating-system thread: the waiting task's fiber (a
//! user-space stack) is suspended and the worker thread picks up some other
//! ready fiber, so a thread always has work to do as long as ready work
//! exists anywhere in the system.
//!
//! ## Architecture
//!
//! - **Worker threads**: one OS thread per logical core, pinned by affinity.
//! - **Worker fibers**: a pool of pre-allocated user-space stacks, each
//!   running the executor loop; fibers migrate freely between threads.
//! - **Counters**: atomic integers shared between submitters and task
//!   bundles; the rendezvous points of the system.
//! - **Waiting list**: suspended fibers parked on a `(counter, value)`
//!   condition until some worker observes the condition and resumes them.
//!
//! ## Example
//!
//! ```no_run
//! use fibertask::{Task, TaskScheduler, TaskServices};
//!
//! let scheduler = TaskScheduler::new(64, TaskServices::none()).unwrap();
//!
//! let counter = scheduler.add_tasks((0..100).map(|i| {
//!     Task::new(move |_ctx| {
//!         println!("task {i}");
//!     })
//! }));
//!
//! scheduler.wait_for_counter(&counter, 0);
//! scheduler.quit().unwrap();
//! ```

mod context;
mod counter;
mod executor;
mod fiber;
mod fiber_pool;
mod queue;
mod scheduler;
mod task;
mod wait_list;
mod worker;

pub use context::{TaskContext, TaskServices};
pub use counter::AtomicCounter;
pub use scheduler::{SchedulerError, TaskScheduler, DEFAULT_STACK_SIZE};
pub use task::Task;
