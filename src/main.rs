use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fibertask::{Task, TaskScheduler, TaskServices};

fn main() {
    env_logger::init();

    println!("fibertask - fiber-based fork-join task scheduler\n");

    let scheduler =
        TaskScheduler::new(160, TaskServices::none()).expect("scheduler initialization failed");
    println!(
        "Initialized scheduler with {} worker threads\n",
        scheduler.num_workers()
    );

    // Example 1: one task
    println!("Example 1: single task");
    let counter = scheduler.add_task(Task::new(|_ctx| {
        println!("  hello from a fiber task");
    }));
    scheduler.wait_for_counter(&counter, 0);
    println!("  task completed\n");

    // Example 2: fan-out over one shared counter
    println!("Example 2: fan-out");
    let sum = Arc::new(AtomicUsize::new(0));
    let num_tasks = 1000;

    let start = Instant::now();
    let counter = scheduler.add_tasks((0..num_tasks).map(|i| {
        let sum = sum.clone();
        Task::new(move |_ctx| {
            sum.fetch_add(i, Ordering::Relaxed);
        })
    }));
    scheduler.wait_for_counter(&counter, 0);

    let expected: usize = (0..num_tasks).sum();
    println!(
        "  {} tasks in {:?}, sum {} (expected {})\n",
        num_tasks,
        start.elapsed(),
        sum.load(Ordering::Relaxed),
        expected
    );

    // Example 3: a task that forks children and waits on them mid-task
    println!("Example 3: nested fork-join");
    let counter = scheduler.add_task(Task::new(|ctx| {
        let children = ctx.add_tasks((0..4).map(|i| {
            Task::new(move |_ctx| {
                println!("  child {i} running");
            })
        }));
        ctx.wait_for_counter(&children, 0);
        println!("  all children finished before their parent returned");
    }));
    scheduler.wait_for_counter(&counter, 0);

    println!("\nShutting down...");
    match scheduler.quit() {
        Ok(()) => println!("Done!"),
        Err(err) => eprintln!("Shutdown error: {err}"),
    }
}
