//! The pool of idle worker fibers.

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::fiber::WorkerFiber;

/// MPMC FIFO of idle fibers.
///
/// `wait_dequeue` is the one place the scheduler accepts blocking on a
/// synchronization primitive: a task that needs a replacement fiber has
/// nothing to run until some other worker returns one to the pool.
pub(crate) struct FiberPool {
    tx: Sender<WorkerFiber>,
    rx: Receiver<WorkerFiber>,
}

impl FiberPool {
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        FiberPool { tx, rx }
    }

    pub(crate) fn enqueue(&self, fiber: WorkerFiber) {
        // Both channel ends live in this struct, so the send cannot fail.
        self.tx.send(fiber).expect("fiber pool channel closed");
    }

    /// Dequeues an idle fiber, blocking until one is available.
    pub(crate) fn wait_dequeue(&self) -> WorkerFiber {
        self.rx.recv().expect("fiber pool channel closed")
    }

    /// Non-blocking dequeue; used when draining the pool at teardown.
    pub(crate) fn try_dequeue(&self) -> Option<WorkerFiber> {
        self.rx.try_recv().ok()
    }

    /// Number of idle fibers currently in the pool.
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::idle_test_fiber;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_try_dequeue_on_empty_pool() {
        let pool = FiberPool::new();
        assert!(pool.try_dequeue().is_none());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_enqueue_then_dequeue() {
        let pool = FiberPool::new();
        pool.enqueue(idle_test_fiber());
        pool.enqueue(idle_test_fiber());
        assert_eq!(pool.len(), 2);

        assert!(pool.try_dequeue().is_some());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_wait_dequeue_blocks_until_enqueue() {
        let pool = std::sync::Arc::new(FiberPool::new());

        let producer = {
            let pool = pool.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                pool.enqueue(idle_test_fiber());
            })
        };

        // Blocks until the producer thread delivers a fiber.
        let _fiber = pool.wait_dequeue();
        producer.join().unwrap();
    }
}
