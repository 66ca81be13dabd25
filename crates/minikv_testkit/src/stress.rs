//! Concurrent load drivers.
//!
//! The drivers are generic over the operation so the same load runs against
//! the engine directly or through the C ABI.

use std::fmt::Display;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Operations attempted.
    pub total_ops: usize,
    /// Operations that failed.
    pub failed_ops: usize,
    /// First few failure messages.
    pub failures: Vec<String>,
    /// Wall-clock time.
    pub duration: Duration,
}

impl StressResult {
    /// Returns true when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed_ops == 0
    }

    /// Operations per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }
}

/// Shape of a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Concurrent threads.
    pub threads: usize,
    /// Operations per thread.
    pub ops_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops_per_thread: 1_000,
        }
    }
}

/// The key thread `thread` writes on step `step`. Distinct across threads.
pub fn distinct_key(thread: usize, step: usize) -> String {
    format!("t{thread}-k{step}")
}

/// Runs `op(thread, step)` from `config.threads` threads released together.
pub fn run_concurrent<F, E>(config: &StressConfig, op: F) -> StressResult
where
    F: Fn(usize, usize) -> Result<(), E> + Send + Sync + 'static,
    E: Display,
{
    const KEPT_FAILURES: usize = 8;

    let op = Arc::new(op);
    let barrier = Arc::new(Barrier::new(config.threads));
    let failures = Arc::new(Mutex::new((0usize, Vec::new())));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|thread| {
            let op = Arc::clone(&op);
            let barrier = Arc::clone(&barrier);
            let failures = Arc::clone(&failures);
            let ops = config.ops_per_thread;
            thread::spawn(move || {
                barrier.wait();
                for step in 0..ops {
                    if let Err(e) = op(thread, step) {
                        let mut failures = failures.lock().expect("failure log poisoned");
                        failures.0 += 1;
                        if failures.1.len() < KEPT_FAILURES {
                            failures.1.push(format!("thread {thread} step {step}: {e}"));
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("stress thread panicked");
    }

    let (failed_ops, failures) = std::mem::take(&mut *failures.lock().expect("failure log poisoned"));
    StressResult {
        total_ops: config.threads * config.ops_per_thread,
        failed_ops,
        failures,
        duration: start.elapsed(),
    }
}
