//! Core domain logic for the school registrar.
//!
//! Records departments, subjects, instructors, classes, students,
//! enrollments and grades, and owns every rule that ties them together.
//! Concurrent work lives in two places: batch provisioning of a cohort's
//! classes and parallel aggregation of the grade report.

pub mod config;
pub mod db;
pub mod fanout;
pub mod ident;
pub mod invariants;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sequence;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use fanout::{AggregateError, BatchOutcome, BatchProvisioner, ReportAggregator, UnitFailure};
pub use ident::{IdAllocator, IdAllocatorError};
pub use invariants::InvariantViolation;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use repo::{RecordStore, RepoError, RepoResult, SqliteStore};
pub use sequence::{plan_sequence, CohortKey, SequenceError, SequencePlan};
pub use service::{Registrar, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
