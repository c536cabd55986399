//! Bounded fan-out/fan-in over scoped worker threads.
//!
//! # Responsibility
//! - `provisioner`: run one unit of work per class sequence, collect the
//!   successes and the first failure.
//! - `aggregator`: resolve report rows in parallel into an index-addressed
//!   table.
//!
//! # Invariants
//! - Never more than `max_workers` threads per call; callers block until
//!   every worker has finished.
//! - After the first failure no new work starts. Work already running is
//!   allowed to finish.

pub mod aggregator;
pub mod provisioner;

pub use aggregator::{AggregateError, ReportAggregator};
pub use provisioner::{BatchOutcome, BatchProvisioner, UnitFailure};

use std::num::NonZeroUsize;

/// Clamps a configured worker limit to at least one thread.
pub(crate) fn worker_limit(max_workers: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_workers).unwrap_or(NonZeroUsize::MIN)
}

/// Threads actually spawned for `items` work items.
pub(crate) fn worker_count(limit: NonZeroUsize, items: usize) -> usize {
    items.min(limit.get())
}
