//! Class use-cases, including batch provisioning of a cohort.
//!
//! # Responsibility
//! - Plan and create a contiguous block of classes for one department
//!   cohort, one concurrent unit per class.
//! - Guard capacity and host instructor changes.
//!
//! # Invariants
//! - Planning and provisioning for one (department, year) cohort run under
//!   that cohort's lock; concurrent requests never share a sequence.
//! - A batch is not atomic. On failure the classes already created stay
//!   committed and are reported in `ServiceError::PartialBatch`;
//!   `cohort_classes` lists the cohort for reconciliation.

use crate::config::CoreConfig;
use crate::fanout::{BatchOutcome, BatchProvisioner};
use crate::ident::{department_scope, IdAllocator};
use crate::invariants::{
    check_batch_size, check_capacity_update, check_class_empty, check_host_instructor,
};
use crate::model::{Class, ClassRoster, Department, DepartmentId, InstructorId};
use crate::repo::RecordStore;
use crate::sequence::{plan_sequence, CohortKey, Sequence};
use crate::service::{
    insert_with_fresh_id, now_epoch_ms, ClassLocks, KeyedLocks, ServiceError, ServiceResult,
};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Batch input: how many classes to open for one department cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionClassesRequest {
    pub department_id: DepartmentId,
    pub academic_year: i32,
    pub count: u8,
    pub max_students: u32,
}

/// Full replacement of a class's editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassUpdate {
    pub max_students: u32,
    pub host_instructor_id: Option<InstructorId>,
}

pub struct ClassService<S: RecordStore> {
    store: Arc<S>,
    provisioner: BatchProvisioner,
    id_retry_limit: u32,
    cohort_locks: KeyedLocks<(DepartmentId, i32)>,
    class_locks: Arc<ClassLocks>,
}

impl<S: RecordStore> ClassService<S> {
    pub fn new(store: Arc<S>, config: &CoreConfig) -> Self {
        Self::with_class_locks(store, config, Arc::new(KeyedLocks::new()))
    }

    pub(crate) fn with_class_locks(
        store: Arc<S>,
        config: &CoreConfig,
        class_locks: Arc<ClassLocks>,
    ) -> Self {
        Self {
            store,
            provisioner: BatchProvisioner::new(config.max_workers),
            id_retry_limit: config.id_retry_limit,
            cohort_locks: KeyedLocks::new(),
            class_locks,
        }
    }

    /// Creates `count` classes named after the next free cohort sequences.
    ///
    /// Returns the created classes in sequence order. The block is cut at
    /// sequence 99, so fewer than `count` classes may be created.
    ///
    /// # Errors
    /// - `Validation` for a zero or oversized batch or a zero capacity.
    /// - `NotFound` for an unknown department.
    /// - `RangeExhausted` when the cohort already used sequence 99.
    /// - `PartialBatch` when a unit failed; carries the created classes.
    pub fn provision_classes(&self, request: ProvisionClassesRequest) -> ServiceResult<Vec<Class>> {
        let started_at = Instant::now();
        let batch_id = Uuid::new_v4();

        check_batch_size(request.count, request.max_students)?;
        let department = self
            .store
            .get_department(request.department_id)?
            .ok_or_else(|| ServiceError::not_found("department", request.department_id))?;
        let cohort = CohortKey::new(&department.symbol, request.academic_year);

        let cohort_lock = self
            .cohort_locks
            .lock_for(&(department.id, request.academic_year));
        let _cohort_guard = cohort_lock.lock();

        let existing = self
            .store
            .list_cohort_classes(department.id, request.academic_year)?;
        let plan = plan_sequence(
            &cohort,
            existing.iter().map(|class| class.name.as_str()),
            request.count,
        )
        .map_err(|err| {
            warn!(
                "event=class_provision module=class status=error batch_id={} department={} cohort={} error={}",
                batch_id, department.id, request.academic_year, err
            );
            ServiceError::from(err)
        })?;
        info!(
            "event=class_provision module=class status=start batch_id={} department={} cohort={} range={:02}..={:02} workers={}",
            batch_id,
            department.id,
            request.academic_year,
            plan.start,
            plan.end,
            self.provisioner.max_workers()
        );

        let BatchOutcome {
            created,
            failure,
            other_failures,
            skipped,
        } = self.provisioner.provision(plan.sequences(), |sequence| {
            self.create_class_unit(&department, &cohort, &request, sequence)
        });
        let created: Vec<Class> = created.into_iter().map(|(_, class)| class).collect();

        match failure {
            None => {
                info!(
                    "event=class_provision module=class status=ok batch_id={} created={} duration_ms={}",
                    batch_id,
                    created.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(created)
            }
            Some(failure) => {
                warn!(
                    "event=class_provision module=class status=partial batch_id={} created={} failed_sequence={:02} other_failures={} skipped={} duration_ms={} error={}",
                    batch_id,
                    created.len(),
                    failure.sequence,
                    other_failures.len(),
                    skipped.len(),
                    started_at.elapsed().as_millis(),
                    failure.error
                );
                Err(ServiceError::PartialBatch {
                    created,
                    failed_sequence: failure.sequence,
                    source: Box::new(failure.error),
                })
            }
        }
    }

    fn create_class_unit(
        &self,
        department: &Department,
        cohort: &CohortKey,
        request: &ProvisionClassesRequest,
        sequence: Sequence,
    ) -> ServiceResult<Class> {
        let now = now_epoch_ms();
        insert_with_fresh_id(
            &IdAllocator::class(),
            &department_scope(department.id),
            self.id_retry_limit,
            "class",
            "classes.id",
            |id| {
                let class = Class {
                    id,
                    name: cohort.class_name(sequence),
                    max_students: request.max_students,
                    academic_year: request.academic_year,
                    department_id: department.id,
                    host_instructor_id: None,
                    created_at: now,
                    updated_at: now,
                };
                self.store.insert_class(&class).map(|()| class)
            },
        )
    }

    /// Changes capacity and host instructor.
    ///
    /// Capacity may not drop below the current roster; the host must belong
    /// to the class's department.
    pub fn update_class(&self, id: &str, update: ClassUpdate) -> ServiceResult<Class> {
        let class_lock = self.class_locks.lock_for(&id.to_string());
        let _class_guard = class_lock.lock();

        let roster = self.roster(id)?;
        check_capacity_update(update.max_students, roster.enrolled())?;
        if let Some(host_id) = update.host_instructor_id.as_deref() {
            let host = self
                .store
                .get_instructor(host_id)?
                .ok_or_else(|| ServiceError::not_found("instructor", host_id))?;
            check_host_instructor(&roster.class, &host)?;
        }

        let mut class = roster.class;
        class.max_students = update.max_students;
        class.host_instructor_id = update.host_instructor_id;
        class.updated_at = now_epoch_ms();
        self.store.update_class(&class)?;
        Ok(class)
    }

    pub fn class(&self, id: &str) -> ServiceResult<Class> {
        self.store
            .get_class(id)?
            .ok_or_else(|| ServiceError::not_found("class", id))
    }

    pub fn roster(&self, id: &str) -> ServiceResult<ClassRoster> {
        self.store
            .get_class_roster(id)?
            .ok_or_else(|| ServiceError::not_found("class", id))
    }

    /// Classes of one cohort ordered by name.
    ///
    /// After a `PartialBatch` this shows what the store actually holds.
    pub fn cohort_classes(
        &self,
        department_id: DepartmentId,
        academic_year: i32,
    ) -> ServiceResult<Vec<Class>> {
        Ok(self
            .store
            .list_cohort_classes(department_id, academic_year)?)
    }

    /// Deletes a class with an empty roster.
    pub fn delete_class(&self, id: &str) -> ServiceResult<()> {
        let class_lock = self.class_locks.lock_for(&id.to_string());
        let _class_guard = class_lock.lock();

        let roster = self.roster(id)?;
        check_class_empty(&roster)?;
        self.store.delete_class(id)?;
        self.class_locks.remove(&roster.class.id);
        info!(
            "event=class_delete module=class status=ok class={}",
            roster.class.id
        );
        Ok(())
    }
}
