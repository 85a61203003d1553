//! Completion tracking for a generation of rollup tasks.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Counts {
    outstanding: usize,
    completed: usize,
}

/// Counts the tasks of one generation that have yet to finish
///
/// The scheduler sizes the context up front, or increments it as it submits
/// tasks, and every task decrements it exactly once however it ends. Waiters
/// are woken when the count reaches zero.
pub struct ExecutionContext {
    counts: Mutex<Counts>,
    done: Condvar,
}

impl Default for ExecutionContext {
    fn default() -> ExecutionContext {
        ExecutionContext::new(0)
    }
}

impl ExecutionContext {
    /// A context expecting `outstanding` tasks.
    pub fn new(outstanding: usize) -> ExecutionContext {
        ExecutionContext {
            counts: Mutex::new(Counts {
                outstanding: outstanding,
                completed: 0,
            }),
            done: Condvar::new(),
        }
    }

    fn counts(&self) -> MutexGuard<Counts> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Expect one more task.
    pub fn increment(&self) {
        self.counts().outstanding += 1;
    }

    /// Signal that one task has finished
    ///
    /// A decrement with nothing outstanding is an accounting bug somewhere
    /// upstream. It is logged and otherwise ignored.
    pub fn decrement(&self) {
        let mut counts = self.counts();
        if counts.outstanding == 0 {
            error!("[INTERNAL ERROR] execution context decremented below zero");
            return;
        }
        counts.outstanding -= 1;
        counts.completed += 1;
        if counts.outstanding == 0 {
            self.done.notify_all();
        }
    }

    /// Tasks yet to finish.
    pub fn outstanding(&self) -> usize {
        self.counts().outstanding
    }

    /// Tasks finished so far.
    pub fn completed(&self) -> usize {
        self.counts().completed
    }

    /// Has every expected task finished?
    pub fn is_done(&self) -> bool {
        self.outstanding() == 0
    }

    /// Block until every expected task has finished.
    pub fn wait(&self) {
        let mut counts = self.counts();
        while counts.outstanding > 0 {
            counts = self.done.wait(counts).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until every expected task has finished or `timeout` passes.
    /// Returns whether the generation finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut counts = self.counts();
        while counts.outstanding > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            counts = self.done
                .wait_timeout(counts, deadline - now)
                .map(|(c, _)| c)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_down_to_done() {
        let ctx = ExecutionContext::new(2);
        assert!(!ctx.is_done());
        ctx.decrement();
        ctx.increment();
        ctx.decrement();
        ctx.decrement();
        assert!(ctx.is_done());
        assert_eq!(3, ctx.completed());
    }

    #[test]
    fn decrement_at_zero_is_refused() {
        let ctx = ExecutionContext::new(1);
        ctx.decrement();
        ctx.decrement();
        assert_eq!(0, ctx.outstanding());
        assert_eq!(1, ctx.completed());
    }

    #[test]
    fn wait_times_out() {
        let ctx = ExecutionContext::new(1);
        assert!(!ctx.wait_timeout(Duration::from_millis(10)));
        ctx.decrement();
        assert!(ctx.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn waiters_wake_on_completion() {
        let ctx = Arc::new(ExecutionContext::new(16));
        let mut joins = Vec::new();
        for _ in 0..16 {
            let ctx = Arc::clone(&ctx);
            joins.push(thread::spawn(move || ctx.decrement()));
        }
        ctx.wait();
        for join in joins {
            join.join().unwrap();
        }
        assert_eq!(16, ctx.completed());
        assert!(ctx.is_done());
    }
}
