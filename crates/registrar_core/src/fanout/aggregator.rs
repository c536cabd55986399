//! Concurrent row resolution into an ordered table.
//!
//! # Invariants
//! - `output[i]` is always derived from `rows[i]`.
//! - The slot table is split into disjoint contiguous chunks before any
//!   worker starts; each worker writes only its own chunk.

use crate::fanout::{worker_count, worker_limit};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError<E> {
    /// Resolving row `index` failed.
    Row { index: usize, error: E },
    /// Slot `index` was left unfilled.
    Incomplete { index: usize },
}

impl<E: Display> Display for AggregateError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Row { index, error } => write!(f, "row {index} failed: {error}"),
            Self::Incomplete { index } => write!(f, "row {index} was not resolved"),
        }
    }
}

impl<E: Error + 'static> Error for AggregateError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Row { error, .. } => Some(error),
            Self::Incomplete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportAggregator {
    max_workers: NonZeroUsize,
}

impl ReportAggregator {
    /// `max_workers` of zero is treated as one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: worker_limit(max_workers),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers.get()
    }

    /// Resolves every row, aborting on the first failure.
    ///
    /// When several rows fail before cancellation takes effect, the lowest
    /// failing index is reported.
    pub fn aggregate<R, T, E, F>(&self, rows: &[R], resolve: F) -> Result<Vec<T>, AggregateError<E>>
    where
        R: Sync,
        T: Send,
        E: Send,
        F: Fn(&R) -> Result<T, E> + Sync,
    {
        let cancelled = AtomicBool::new(false);
        let first_error: Mutex<Option<(usize, E)>> = Mutex::new(None);

        let slots = self.fill_slots(rows, |index, row| {
            if cancelled.load(Ordering::Acquire) {
                return None;
            }
            match resolve(row) {
                Ok(value) => Some(value),
                Err(error) => {
                    cancelled.store(true, Ordering::Release);
                    let mut first = first_error.lock();
                    if first.as_ref().map_or(true, |(seen, _)| index < *seen) {
                        *first = Some((index, error));
                    }
                    None
                }
            }
        });

        if let Some((index, error)) = first_error.into_inner() {
            return Err(AggregateError::Row { index, error });
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(AggregateError::Incomplete { index }))
            .collect()
    }

    /// Resolves every row and keeps per-row outcomes; nothing is cancelled.
    pub fn aggregate_each<R, T, E, F>(&self, rows: &[R], resolve: F) -> Vec<Result<T, E>>
    where
        R: Sync,
        T: Send,
        E: Send,
        F: Fn(&R) -> Result<T, E> + Sync,
    {
        let slots = self.fill_slots(rows, |_, row| Some(resolve(row)));
        // Without cancellation every slot is filled.
        slots.into_iter().flatten().collect()
    }

    fn fill_slots<R, V, F>(&self, rows: &[R], resolve: F) -> Vec<Option<V>>
    where
        R: Sync,
        V: Send,
        F: Fn(usize, &R) -> Option<V> + Sync,
    {
        let mut slots: Vec<Option<V>> = std::iter::repeat_with(|| None).take(rows.len()).collect();
        let workers = worker_count(self.max_workers, rows.len());
        if workers == 0 {
            return slots;
        }

        let chunk_len = rows.len().div_ceil(workers);
        let resolve = &resolve;
        std::thread::scope(|scope| {
            for (chunk_index, (slot_chunk, row_chunk)) in slots
                .chunks_mut(chunk_len)
                .zip(rows.chunks(chunk_len))
                .enumerate()
            {
                let base = chunk_index * chunk_len;
                scope.spawn(move || {
                    for (offset, (slot, row)) in slot_chunk.iter_mut().zip(row_chunk).enumerate() {
                        *slot = resolve(base + offset, row);
                    }
                });
            }
        });

        slots
    }
}
