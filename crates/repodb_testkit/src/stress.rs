//! Stress helpers for RepoDB.
//!
//! These helpers drive many contexts over one shared store from several
//! threads at once.

use crate::entities::Person;
use repodb_core::{Config, Context, CoreError, SnapshotStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

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
    /// Number of commits per thread.
    pub operations: usize,
    /// Number of concurrent threads, one context each.
    pub threads: usize,
    /// Entities staged per commit.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            batch_size: 1,
        }
    }
}

fn open(store: &Arc<SnapshotStore>) -> Context {
    Context::new(
        Arc::clone(store),
        Config::default().database_name("stress").log_entries(false),
    )
    .expect("Failed to open context")
}

/// Commits people with generated identities from every thread at once.
///
/// Each successful entity counts as one operation.
pub fn stress_concurrent_identity_inserts(
    store: Arc<SnapshotStore>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let ctx = open(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;
            let batch_size = config.batch_size;

            thread::spawn(move || {
                for i in 0..operations {
                    for b in 0..batch_size {
                        ctx.add(Person::new(&format!("t{t}-{i}-{b}"), 30));
                    }
                    match ctx.save_changes() {
                        Ok(n) => {
                            successful.fetch_add(n, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(batch_size, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Races every thread to add the same explicit identities.
///
/// For each identity exactly one add should succeed; the others must fail
/// with `DuplicateKey`. Any other error is counted as a failure too, so
/// callers can tell the two apart through [`StressTestResult::failed_ops`]
/// and the returned duplicate count.
pub fn stress_duplicate_races(
    store: Arc<SnapshotStore>,
    config: &StressConfig,
) -> (StressTestResult, usize) {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let duplicates = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let ctx = open(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let duplicates = Arc::clone(&duplicates);
            let operations = config.operations;

            thread::spawn(move || {
                for i in 0..operations {
                    let id = i as i64 + 1;
                    ctx.add(Person::with_id(id, &format!("t{t}"), 30));
                    match ctx.save_changes() {
                        Ok(n) => {
                            successful.fetch_add(n, Ordering::Relaxed);
                        }
                        Err(CoreError::DuplicateKey { .. }) => {
                            duplicates.fetch_add(1, Ordering::Relaxed);
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let result = StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );
    (result, duplicates.load(Ordering::Relaxed))
}

/// Reads committed people from every thread while one thread keeps
/// committing.
pub fn stress_reads_during_writes(
    store: Arc<SnapshotStore>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let writer = {
        let ctx = open(&store);
        let operations = config.operations;
        thread::spawn(move || {
            for i in 0..operations {
                ctx.add(Person::new(&format!("w{i}"), 40));
                // Readers verify counts; a failed write shows up there.
                let _ = ctx.save_changes();
            }
        })
    };

    let readers: Vec<_> = (0..config.threads)
        .map(|_| {
            let ctx = open(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            thread::spawn(move || {
                let mut last = 0usize;
                for _ in 0..operations {
                    let seen = ctx.find_all::<Person>().count();
                    // Only inserts happen, so counts never go down.
                    if seen >= last {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    last = seen;
                }
            })
        })
        .collect();

    writer.join().expect("Writer panicked");
    for handle in readers {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_concurrent_identity_inserts() {
        let store = Arc::new(SnapshotStore::new());
        let config = StressConfig {
            operations: 100,
            threads: 4,
            batch_size: 3,
        };

        let result = stress_concurrent_identity_inserts(Arc::clone(&store), &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_200);

        let ctx = open(&store);
        let ids: HashSet<i64> = ctx.find_all::<Person>().iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=1_200).collect::<HashSet<i64>>());
    }

    #[test]
    fn test_duplicate_races() {
        let store = Arc::new(SnapshotStore::new());
        let config = StressConfig {
            operations: 50,
            threads: 4,
            batch_size: 1,
        };

        let (result, duplicates) = stress_duplicate_races(Arc::clone(&store), &config);
        assert_eq!(result.successful_ops, 50);
        assert_eq!(duplicates, 150);
        assert_eq!(result.failed_ops, duplicates);
    }

    #[test]
    fn test_reads_during_writes() {
        let store = Arc::new(SnapshotStore::new());
        let config = StressConfig {
            operations: 200,
            threads: 3,
            batch_size: 1,
        };

        let result = stress_reads_during_writes(Arc::clone(&store), &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(open(&store).count::<Person>(), 200);
    }
}
