//! Repository contracts and the SQLite-backed record store.
//!
//! # Responsibility
//! - Define find/create/update/delete contracts per aggregate
//!   (catalog, classes, enrollment).
//! - Isolate SQL details from invariant checks and service orchestration.
//!
//! # Invariants
//! - Every contract is safe to call from several threads at once; the
//!   combined `RecordStore` bound requires `Send + Sync`.
//! - Unique-index failures surface as `RepoError::Conflict`, never as a raw
//!   SQLite error, so callers can retry identifier collisions.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_repo;
pub mod class_repo;
pub mod enrollment_repo;
pub mod sqlite_store;

pub use catalog_repo::CatalogRepository;
pub use class_repo::ClassRepository;
pub use enrollment_repo::{EnrollmentRepository, GradeListQuery};
pub use sqlite_store::SqliteStore;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Update/delete target does not exist.
    NotFound { entity: &'static str, id: String },
    /// A unique or primary key constraint rejected the write.
    ///
    /// `constraint` lists the offending columns as `table.column`.
    Conflict { constraint: String },
    /// Persisted row cannot be mapped to a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl RepoError {
    /// Returns whether this is a uniqueness conflict on `table.column`.
    pub fn is_conflict_on(&self, column: &str) -> bool {
        match self {
            Self::Conflict { constraint } => constraint.split(", ").any(|c| c == column),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict { constraint } => write!(f, "unique constraint failed: {constraint}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Everything the services need from persistence, shareable across threads.
pub trait RecordStore:
    CatalogRepository + ClassRepository + EnrollmentRepository + Send + Sync
{
}

impl<T> RecordStore for T where
    T: CatalogRepository + ClassRepository + EnrollmentRepository + Send + Sync
{
}
