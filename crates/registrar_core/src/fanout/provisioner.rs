//! Concurrent batch provisioning.
//!
//! # Invariants
//! - Each sequence is handed to exactly one unit invocation, or skipped.
//! - `created` is sorted by sequence regardless of completion order.
//! - A batch is not atomic: successes before or alongside a failure stay
//!   committed and are returned to the caller.

use crate::fanout::{worker_count, worker_limit};
use crate::sequence::Sequence;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One failed unit of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure<E> {
    pub sequence: Sequence,
    pub error: E,
}

#[derive(Debug)]
pub struct BatchOutcome<T, E> {
    /// Successful units, sorted by sequence.
    pub created: Vec<(Sequence, T)>,
    /// First failure observed.
    pub failure: Option<UnitFailure<E>>,
    /// Failures of units that were already running when the first one failed.
    pub other_failures: Vec<UnitFailure<E>>,
    /// Sequences never started because the batch was cancelled.
    pub skipped: Vec<Sequence>,
}

impl<T, E> BatchOutcome<T, E> {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Created values without their sequences.
    pub fn into_created(self) -> Vec<T> {
        self.created.into_iter().map(|(_, value)| value).collect()
    }
}

/// Runs per-sequence units on a bounded pool of scoped threads.
#[derive(Debug, Clone, Copy)]
pub struct BatchProvisioner {
    max_workers: NonZeroUsize,
}

impl BatchProvisioner {
    /// `max_workers` of zero is treated as one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: worker_limit(max_workers),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers.get()
    }

    /// Runs `unit` once per sequence and waits for all started units.
    ///
    /// Workers pull sequences in order from a shared cursor. Once a unit
    /// fails, no worker claims another sequence; the unclaimed rest is
    /// reported in `skipped`.
    pub fn provision<I, T, E, F>(&self, sequences: I, unit: F) -> BatchOutcome<T, E>
    where
        I: IntoIterator<Item = Sequence>,
        T: Send,
        E: Send,
        F: Fn(Sequence) -> Result<T, E> + Sync,
    {
        let sequences: Vec<Sequence> = sequences.into_iter().collect();
        let cursor = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);
        let created = Mutex::new(Vec::with_capacity(sequences.len()));
        let failures = Mutex::new(Vec::new());

        let workers = worker_count(self.max_workers, sequences.len());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if cancelled.load(Ordering::Acquire) {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::AcqRel);
                    let Some(&sequence) = sequences.get(index) else {
                        break;
                    };
                    match unit(sequence) {
                        Ok(value) => created.lock().push((sequence, value)),
                        Err(error) => {
                            cancelled.store(true, Ordering::Release);
                            failures.lock().push(UnitFailure { sequence, error });
                        }
                    }
                });
            }
        });

        let claimed = cursor.into_inner().min(sequences.len());
        let mut created = created.into_inner();
        created.sort_by_key(|(sequence, _)| *sequence);

        let mut failures = failures.into_inner().into_iter();
        let failure = failures.next();

        BatchOutcome {
            created,
            failure,
            other_failures: failures.collect(),
            skipped: sequences[claimed..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BatchProvisioner;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn all_units_succeed_in_sequence_order() {
        let provisioner = BatchProvisioner::new(3);
        let outcome = provisioner.provision(1..=5, |sequence| {
            std::thread::sleep(Duration::from_millis(u64::from(6 - sequence)));
            Ok::<_, String>(format!("class-{sequence:02}"))
        });

        assert!(outcome.is_complete());
        assert!(outcome.skipped.is_empty());
        assert_eq!(
            outcome.into_created(),
            vec!["class-01", "class-02", "class-03", "class-04", "class-05"]
        );
    }

    #[test]
    fn failure_is_reported_with_partial_success() {
        let provisioner = BatchProvisioner::new(5);
        let outcome = provisioner.provision(1..=5, |sequence| {
            if sequence == 3 {
                Err("store unavailable")
            } else {
                Ok(sequence)
            }
        });

        let failure = outcome.failure.as_ref().expect("unit 3 fails");
        assert_eq!(failure.sequence, 3);
        assert_eq!(failure.error, "store unavailable");
        assert!(outcome.created.len() <= 4);
        assert!(outcome.created.iter().all(|(sequence, _)| *sequence != 3));
        assert_eq!(
            outcome.created.len() + outcome.skipped.len() + 1 + outcome.other_failures.len(),
            5
        );
    }

    #[test]
    fn single_worker_cancels_remaining_units() {
        let calls = AtomicUsize::new(0);
        let outcome = BatchProvisioner::new(1).provision(1..=5, |sequence| {
            calls.fetch_add(1, Ordering::SeqCst);
            if sequence == 2 {
                Err(())
            } else {
                Ok(())
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.skipped, vec![3, 4, 5]);
    }

    #[test]
    fn concurrency_never_exceeds_limit() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let outcome = BatchProvisioner::new(2).provision(1..=8, |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        });

        assert_eq!(outcome.created.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn zero_workers_is_clamped_and_empty_batch_is_noop() {
        let provisioner = BatchProvisioner::new(0);
        assert_eq!(provisioner.max_workers(), 1);

        let outcome = provisioner.provision(Vec::new(), |_| Ok::<_, ()>(()));
        assert!(outcome.created.is_empty());
        assert!(outcome.is_complete());
    }
}
