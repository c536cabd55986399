//! Core use-case services.
//!
//! # Responsibility
//! - Load the records each rule needs, run the invariant checks, then write.
//! - Allocate ids and retry collisions a bounded number of times.
//!
//! # Invariants
//! - No write happens before every check of the operation has passed.
//! - Services receive their store through the constructor; none of them
//!   opens a connection on its own.

use crate::config::CoreConfig;
use crate::ident::IdAllocator;
use crate::invariants::InvariantViolation;
use crate::model::ClassId;
use crate::repo::{RecordStore, RepoResult};
use log::warn;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

pub mod catalog_service;
pub mod class_service;
pub mod enrollment_service;
pub mod error;
pub mod report_service;
pub mod student_service;

pub use catalog_service::{
    CatalogService, InstructorUpdate, NewInstructor, NewSubject, SubjectUpdate,
};
pub use class_service::{ClassService, ClassUpdate, ProvisionClassesRequest};
pub use enrollment_service::{EnrollmentService, NewGrade};
pub use error::{ServiceError, ServiceResult};
pub use report_service::{
    GradeReport, GradeReportRow, ReportScope, ReportService, GRADE_REPORT_HEADERS,
};
pub use student_service::{NewStudent, StudentService, StudentUpdate};

/// Every service over one shared store.
///
/// Class and student services share one per-class lock table, so capacity
/// changes and enrollments of the same class never interleave.
pub struct Registrar<S: RecordStore> {
    pub catalog: CatalogService<S>,
    pub classes: ClassService<S>,
    pub students: StudentService<S>,
    pub enrollment: EnrollmentService<S>,
    pub reports: ReportService<S>,
}

impl<S: RecordStore> Registrar<S> {
    pub fn new(store: Arc<S>, config: &CoreConfig) -> Self {
        let class_locks = Arc::new(KeyedLocks::new());
        Self {
            catalog: CatalogService::new(Arc::clone(&store), config),
            classes: ClassService::with_class_locks(
                Arc::clone(&store),
                config,
                Arc::clone(&class_locks),
            ),
            students: StudentService::with_class_locks(Arc::clone(&store), config, class_locks),
            enrollment: EnrollmentService::new(Arc::clone(&store)),
            reports: ReportService::new(store, config),
        }
    }
}

/// Per-key mutex table for read-check-write sequences.
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

pub(crate) type ClassLocks = KeyedLocks<ClassId>;

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the mutex of `key`; callers hold its guard for the sequence.
    pub(crate) fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Drops the entry of a key whose record is gone. Holders of the old
    /// mutex keep it until they release it.
    pub(crate) fn remove(&self, key: &K) {
        self.locks.lock().remove(key);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Current time as Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Writes a record under a freshly allocated id, retrying id collisions.
///
/// `write` receives each candidate id. Only a uniqueness failure on
/// `id_column` is retried; every other error is returned as is.
pub(crate) fn insert_with_fresh_id<T>(
    allocator: &IdAllocator,
    scope: &str,
    attempts: u32,
    entity: &'static str,
    id_column: &str,
    mut write: impl FnMut(String) -> RepoResult<T>,
) -> ServiceResult<T> {
    for attempt in 1..=attempts {
        let id = allocator.allocate(scope)?;
        match write(id.clone()) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_conflict_on(id_column) => {
                warn!(
                    "event=id_collision module=service status=retry entity={} id={} attempt={}",
                    entity, id, attempt
                );
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(InvariantViolation::DuplicateIdentifier { entity, attempts }.into())
}

#[cfg(test)]
mod tests {
    use super::{insert_with_fresh_id, KeyedLocks, ServiceError};
    use crate::ident::IdAllocator;
    use crate::invariants::InvariantViolation;
    use crate::repo::RepoError;

    fn id_conflict() -> RepoError {
        RepoError::Conflict {
            constraint: "classes.id".to_string(),
        }
    }

    #[test]
    fn keyed_locks_share_one_mutex_per_key() {
        let locks = KeyedLocks::new();
        let first = locks.lock_for(&(1u8, 2024));
        let again = locks.lock_for(&(1u8, 2024));
        let other = locks.lock_for(&(1u8, 2025));
        assert!(std::sync::Arc::ptr_eq(&first, &again));
        assert!(!std::sync::Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn removed_key_gets_a_fresh_mutex() {
        let locks = KeyedLocks::new();
        let held = locks.lock_for(&"C1".to_string());
        let _guard = held.lock();
        locks.lock_for(&"C2".to_string());

        locks.remove(&"C1".to_string());
        assert_eq!(locks.len(), 1);

        let fresh = locks.lock_for(&"C1".to_string());
        assert!(!std::sync::Arc::ptr_eq(&held, &fresh));
        assert!(fresh.try_lock().is_some());
    }

    #[test]
    fn retries_id_collisions_until_success() {
        let mut calls = 0;
        let id = insert_with_fresh_id(&IdAllocator::class(), "01", 5, "class", "classes.id", |id| {
            calls += 1;
            if calls < 3 {
                Err(id_conflict())
            } else {
                Ok(id)
            }
        })
        .expect("third attempt succeeds");

        assert_eq!(calls, 3);
        assert!(id.starts_with("LH01"));
    }

    #[test]
    fn gives_up_after_limit() {
        let mut calls = 0;
        let error = insert_with_fresh_id(&IdAllocator::class(), "01", 4, "class", "classes.id", |_| {
            calls += 1;
            Err::<(), _>(id_conflict())
        })
        .expect_err("every attempt collides");

        assert_eq!(calls, 4);
        assert!(matches!(
            error,
            ServiceError::Conflict(InvariantViolation::DuplicateIdentifier {
                entity: "class",
                attempts: 4,
            })
        ));
    }

    #[test]
    fn other_conflicts_are_not_retried() {
        let mut calls = 0;
        let error = insert_with_fresh_id(&IdAllocator::class(), "01", 4, "class", "classes.id", |_| {
            calls += 1;
            Err::<(), _>(RepoError::Conflict {
                constraint: "classes.name".to_string(),
            })
        })
        .expect_err("name conflict is final");

        assert_eq!(calls, 1);
        assert!(matches!(error, ServiceError::ConstraintConflict { .. }));
    }
}
