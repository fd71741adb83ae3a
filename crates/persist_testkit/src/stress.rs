//! Stress runs for concurrent engines.
//!
//! These runs drive several engines over one store from separate threads.
//! Every engine owns its own store handle and lock token, so the runs
//! exercise the token-file locking rather than any in-process sharing.

use crate::fixtures::{phone_book_schema, TestStore};
use persist_core::RecordEngine;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    fn merge(results: impl IntoIterator<Item = (usize, usize)>, duration: Duration) -> Self {
        let (ok, failed) = results
            .into_iter()
            .fold((0, 0), |(a, b), (ok, failed)| (a + ok, b + failed));
        Self::new(ok, failed, duration)
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent engines, one per thread.
    pub threads: usize,
    /// Distinct people each thread cycles through.
    pub people_per_thread: usize,
    /// Percentage of operations that write.
    pub write_percent: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            threads: 4,
            people_per_thread: 10,
            write_percent: 50,
        }
    }
}

/// Runs writers and readers concurrently, one engine per thread.
///
/// Thread `t` owns the household `T<t>` and alternates `save` with
/// restores and household queries. Reads of a household must always see
/// whole records written by its owner.
pub fn stress_concurrent_engines(store: &TestStore, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let results: Vec<(usize, usize)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let engine = store.engine(phone_book_schema());
                scope.spawn(move || run_household(engine, t, config))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Stress thread panicked"))
            .collect()
    });
    StressTestResult::merge(results, start.elapsed())
}

fn run_household(mut engine: RecordEngine, thread: usize, config: &StressConfig) -> (usize, usize) {
    let household = format!("T{thread}");
    let mut ok = 0usize;
    let mut failed = 0usize;

    for op in 0..config.operations {
        let member = format!("M{}", op % config.people_per_thread.max(1));
        let outcome = if op * 100 / config.operations.max(1) % 100 < config.write_percent
            || op < config.people_per_thread
        {
            write_member(&mut engine, &household, &member, op)
        } else if op % 2 == 0 {
            engine
                .restore(&[household.as_str().into(), member.as_str().into()])
                .map(|_| ())
        } else {
            read_household(&mut engine, &household)
        };
        match outcome {
            Ok(()) => ok += 1,
            Err(e) => {
                warn!(thread, op, error = %e, "stress operation failed");
                failed += 1;
            }
        }
    }
    debug!(thread, ok, failed, "stress thread finished");
    (ok, failed)
}

fn write_member(
    engine: &mut RecordEngine,
    household: &str,
    member: &str,
    op: usize,
) -> persist_core::CoreResult<()> {
    // start from the stored entry so save rewrites it in place
    let id = [household.into(), member.into()];
    if !engine.restore(&id)? {
        engine.clear();
        engine.set("lastname", household)?;
        engine.set("firstname", member)?;
    }
    engine.set("telnum", format!("555-{:04}", op % 10_000))?;
    engine.set("age", op as f64)?;
    engine.save()?;
    Ok(())
}

fn read_household(engine: &mut RecordEngine, household: &str) -> persist_core::CoreResult<()> {
    engine.restore_where(&format!("lastname = '{household}'"), "firstname")?;
    while engine.restore_next()? {
        let telnum = engine.get("telnum")?.as_text().unwrap_or_default().to_string();
        assert!(
            telnum.len() == 8 && telnum.starts_with("555-"),
            "torn record in {household}: {telnum:?}"
        );
    }
    Ok(())
}
