//! Pool sizing under many concurrent waiters.
//!
//! Fibers are returned to the pool whenever a task finishes or a waiter is
//! promoted, so the scheduler stays live as long as the pool holds at least
//! one fiber per worker thread plus one per concurrently parked waiter.
//! These tests pin that bound down from both sides.

use std::thread;

use fibertask::{AtomicCounter, Task, TaskScheduler, TaskServices};

fn worker_count() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[test]
fn test_many_waiters_with_sized_pool() {
    let workers = worker_count();
    let waiters = 10 * workers;

    // Pool bound: one fiber per worker plus one per parked waiter.
    let pool_size = workers + waiters + 4;
    let scheduler =
        TaskScheduler::with_threads(pool_size, workers, TaskServices::none()).unwrap();

    let gates: Vec<AtomicCounter> = (0..waiters).map(|_| AtomicCounter::new(1)).collect();

    // Every parent parks until a task submitted *after* it opens its gate.
    let parents = scheduler.add_tasks(gates.iter().map(|gate| {
        let gate = gate.clone();
        Task::new(move |ctx| {
            ctx.wait_for_counter(&gate, 0);
        })
    }));

    let children = scheduler.add_tasks(gates.iter().map(|gate| {
        let gate = gate.clone();
        Task::new(move |_ctx| {
            gate.fetch_sub(1);
        })
    }));

    scheduler.wait_for_counter(&parents, 0);
    scheduler.wait_for_counter(&children, 0);

    for gate in &gates {
        assert_eq!(gate.load(), 0);
    }
    scheduler.quit().unwrap();
}

// With the pool at the validation minimum (one fiber per worker), the first
// task to park has no replacement fiber to hand its thread: `wait_for_counter`
// blocks in the pool dequeue and no fiber ever comes back. This is the
// documented sizing error, kept here as an always-skipped demonstration that
// the bound in `test_many_waiters_with_sized_pool` is tight.
#[test]
#[ignore = "deadlocks by design: pool below workers + concurrent waiters"]
fn test_pool_below_waiter_bound_deadlocks() {
    let workers = worker_count();
    let scheduler = TaskScheduler::with_threads(workers, workers, TaskServices::none()).unwrap();

    let gate = AtomicCounter::new(1);
    let gate_clone = gate.clone();
    let parent = scheduler.add_task(Task::new(move |ctx| {
        ctx.wait_for_counter(&gate_clone, 0);
    }));
    let opener = scheduler.add_task(Task::new(move |_ctx| {
        gate.fetch_sub(1);
    }));

    scheduler.wait_for_counter(&parent, 0);
    scheduler.wait_for_counter(&opener, 0);
    scheduler.quit().unwrap();
}
