//! Atomic counters for tracking task completion.
//!
//! A counter is the rendezvous point between a group of tasks and anything
//! waiting on them: it starts at the number of submitted tasks, each task
//! decrements it once on completion, and a waiter resumes when the counter
//! reaches its target value.

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

/// A shared atomic counter.
///
/// Cloning a counter shares the same underlying integer; the submitter holds
/// one clone to wait on and every in-flight task bundle holds another so the
/// executor can decrement it. The integer is freed when the last clone drops.
#[derive(Clone)]
pub struct AtomicCounter {
    inner: Arc<AtomicIsize>,
}

impl AtomicCounter {
    /// Creates a counter with the specified initial value.
    pub fn new(initial: isize) -> Self {
        AtomicCounter {
            inner: Arc::new(AtomicIsize::new(initial)),
        }
    }

    /// Stores a new value.
    pub fn store(&self, value: isize) {
        self.inner.store(value, Ordering::Release);
    }

    /// Returns the current value.
    ///
    /// Acquire-ordered: a load that observes a task's decrement also observes
    /// every write that task made before finishing.
    pub fn load(&self) -> isize {
        self.inner.load(Ordering::Acquire)
    }

    /// Decrements the counter by `n`, returning the previous value.
    pub fn fetch_sub(&self, n: isize) -> isize {
        self.inner.fetch_sub(n, Ordering::AcqRel)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        AtomicCounter::new(0)
    }
}

impl std::fmt::Debug for AtomicCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicCounter").field(&self.load()).finish()
    }
}
