//! Stress helpers for concurrent registry access.

use colseg_core::{CoreError, SegmentFileRegistry, SegmentId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a registration race on one segment id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOutcome {
    /// Calls that registered the segment.
    pub successes: usize,
    /// Calls rejected as duplicates.
    pub duplicates: usize,
    /// Calls that failed for any other reason.
    pub other_errors: usize,
}

/// Starts `threads` concurrent `register_unsorted(id)` calls at once.
pub fn race_register_unsorted(
    registry: &Arc<SegmentFileRegistry>,
    id: &SegmentId,
    threads: usize,
) -> RaceOutcome {
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(registry);
            let barrier = Arc::clone(&barrier);
            let id = id.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.register_unsorted(&id).map(|_| ())
            })
        })
        .collect();

    let mut outcome = RaceOutcome {
        successes: 0,
        duplicates: 0,
        other_errors: 0,
    };
    for handle in handles {
        match handle.join().expect("registration thread panicked") {
            Ok(()) => outcome.successes += 1,
            Err(CoreError::DuplicateSegment { .. }) => outcome.duplicates += 1,
            Err(_) => outcome.other_errors += 1,
        }
    }
    outcome
}

/// Configuration for lifecycle stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Writer threads; each flushes and compacts its own segments.
    pub writers: usize,
    /// Reader threads checking the registry while writers run.
    pub readers: usize,
    /// Segments per writer.
    pub segments_per_writer: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            writers: 4,
            readers: 2,
            segments_per_writer: 250,
        }
    }
}

/// Result of a lifecycle stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Segments that went through register + upgrade.
    pub upgraded: usize,
    /// Reader observations where a segment looked unsorted after it had
    /// already been seen sorted. Must be zero.
    pub violations: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Upgraded segments: {}", self.upgraded);
        println!("Violations: {}", self.violations);
        println!("Duration: {:?}", self.duration);
    }
}

/// Flushes and compacts segments from several writers while readers watch.
///
/// Writer `w` owns table `w`, so writers never collide. Readers walk every
/// id and record a violation if a segment they saw sorted later shows an
/// unsorted file again.
pub fn stress_lifecycle(registry: Arc<SegmentFileRegistry>, config: &StressConfig) -> StressTestResult {
    let ids: Arc<Vec<SegmentId>> = Arc::new(
        (0..config.writers as u64)
            .flat_map(|w| {
                (0..config.segments_per_writer as u64).map(move |s| SegmentId::new(w, 0, "stress", s))
            })
            .collect(),
    );
    let upgraded = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let writers: Vec<_> = (0..config.writers)
        .map(|w| {
            let registry = Arc::clone(&registry);
            let ids = Arc::clone(&ids);
            let upgraded = Arc::clone(&upgraded);
            let done = Arc::clone(&done);
            let per_writer = config.segments_per_writer;
            thread::spawn(move || {
                for id in &ids[w * per_writer..(w + 1) * per_writer] {
                    if registry.register_unsorted(id).is_ok() && registry.upgrade(id).is_ok() {
                        upgraded.fetch_add(1, Ordering::Relaxed);
                    }
                }
                done.fetch_add(1, Ordering::Release);
            })
        })
        .collect();

    let readers: Vec<_> = (0..config.readers)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let ids = Arc::clone(&ids);
            let violations = Arc::clone(&violations);
            let done = Arc::clone(&done);
            let writer_count = config.writers;
            thread::spawn(move || {
                let mut seen_sorted = vec![false; ids.len()];
                loop {
                    let finished = done.load(Ordering::Acquire) == writer_count;
                    for (i, id) in ids.iter().enumerate() {
                        if registry.get_sorted(id).is_some() {
                            seen_sorted[i] = true;
                        }
                        if seen_sorted[i] && registry.get_unsorted(id).is_some() {
                            violations.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    if finished {
                        break;
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("stress thread panicked");
    }

    StressTestResult {
        upgraded: upgraded.load(Ordering::Relaxed),
        violations: violations.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_registry;

    #[test]
    fn race_has_exactly_one_winner() {
        let registry = Arc::new(mock_registry());
        let id = SegmentId::new(9, 0, "race", 1);

        let outcome = race_register_unsorted(&registry, &id, 32);
        assert_eq!(
            outcome,
            RaceOutcome {
                successes: 1,
                duplicates: 31,
                other_errors: 0,
            }
        );
        assert_eq!(registry.unsorted_count(), 1);
    }

    #[test]
    fn repeated_races_are_deterministic() {
        let registry = Arc::new(mock_registry());
        for n in 0..20 {
            let id = SegmentId::new(9, 0, "race", n);
            let outcome = race_register_unsorted(&registry, &id, 8);
            assert_eq!(outcome.successes, 1);
            assert_eq!(outcome.duplicates, 7);
        }
        assert_eq!(registry.unsorted_count(), 20);
    }

    #[test]
    fn lifecycle_under_contention() {
        let registry = Arc::new(mock_registry());
        let config = StressConfig {
            writers: 4,
            readers: 2,
            segments_per_writer: 100,
        };

        let result = stress_lifecycle(Arc::clone(&registry), &config);
        assert_eq!(result.upgraded, 400);
        assert_eq!(result.violations, 0);
        assert_eq!(registry.sorted_count(), 400);
        assert_eq!(registry.unsorted_count(), 0);
    }
}
