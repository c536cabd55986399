//! Student use-cases.
//!
//! # Invariants
//! - A student joins a class only when the class has a host instructor and a
//!   free seat, and shares the class's department and cohort year.
//! - Enrollment checks and the write run under the target class's lock, so
//!   concurrent enrollments cannot overfill a class.
//! - Email and phone stay unique among students.

use crate::config::CoreConfig;
use crate::ident::{student_scope, IdAllocator};
use crate::invariants::{check_birth_day, check_contact_unique, check_student_enrollment};
use crate::model::{ClassId, DepartmentId, Student};
use crate::repo::RecordStore;
use crate::service::{insert_with_fresh_id, ClassLocks, KeyedLocks, ServiceError, ServiceResult};
use chrono::{Datelike, Local, NaiveDate};
use log::{debug, info};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_day: NaiveDate,
    pub academic_year: i32,
    pub class_id: ClassId,
    pub department_id: DepartmentId,
}

/// Full replacement of a student's editable fields.
///
/// Department and academic year are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_day: NaiveDate,
    pub class_id: ClassId,
}

pub struct StudentService<S: RecordStore> {
    store: Arc<S>,
    id_retry_limit: u32,
    class_locks: Arc<ClassLocks>,
}

impl<S: RecordStore> StudentService<S> {
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
            id_retry_limit: config.id_retry_limit,
            class_locks,
        }
    }

    /// Enrolls a new student into `request.class_id`.
    pub fn create_student(&self, request: NewStudent) -> ServiceResult<Student> {
        let today = Local::now().date_naive();
        check_birth_day(request.birth_day, today)?;

        let class_lock = self.class_locks.lock_for(&request.class_id);
        let _class_guard = class_lock.lock();

        let roster = self
            .store
            .get_class_roster(&request.class_id)?
            .ok_or_else(|| ServiceError::not_found("class", &request.class_id))?;
        let mut student = Student {
            id: String::new(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            birth_day: request.birth_day,
            academic_year: request.academic_year,
            class_id: request.class_id,
            department_id: request.department_id,
        };
        if let Err(violation) = check_student_enrollment(&student, &roster, today.year()) {
            debug!(
                "event=student_enroll module=student status=rejected class={} reason={}",
                roster.class.id, violation
            );
            return Err(violation.into());
        }
        self.check_contact(&student.email, &student.phone, None)?;

        let student = insert_with_fresh_id(
            &IdAllocator::student(),
            &student_scope(student.department_id, student.academic_year),
            self.id_retry_limit,
            "student",
            "students.id",
            |id| {
                student.id = id;
                self.store.insert_student(&student).map(|()| student.clone())
            },
        )?;
        info!(
            "event=student_enroll module=student status=ok student={} class={} enrolled={}",
            student.id,
            student.class_id,
            roster.enrolled() + 1
        );
        Ok(student)
    }

    /// Replaces a student's editable fields, re-checking enrollment rules
    /// when the student moves to another class.
    pub fn update_student(&self, id: &str, update: StudentUpdate) -> ServiceResult<Student> {
        let today = Local::now().date_naive();
        check_birth_day(update.birth_day, today)?;

        let class_lock = self.class_locks.lock_for(&update.class_id);
        let _class_guard = class_lock.lock();

        let mut student = self.student(id)?;
        let moving = student.class_id != update.class_id;
        student.first_name = update.first_name;
        student.last_name = update.last_name;
        student.email = update.email;
        student.phone = update.phone;
        student.birth_day = update.birth_day;
        student.class_id = update.class_id;

        if moving {
            let roster = self
                .store
                .get_class_roster(&student.class_id)?
                .ok_or_else(|| ServiceError::not_found("class", &student.class_id))?;
            if let Err(violation) = check_student_enrollment(&student, &roster, today.year()) {
                debug!(
                    "event=student_enroll module=student status=rejected class={} reason={}",
                    roster.class.id, violation
                );
                return Err(violation.into());
            }
        }
        self.check_contact(&student.email, &student.phone, Some(id))?;

        self.store.update_student(&student)?;
        Ok(student)
    }

    pub fn delete_student(&self, id: &str) -> ServiceResult<()> {
        self.store.delete_student(id)?;
        info!("event=student_delete module=student status=ok student={}", id);
        Ok(())
    }

    pub fn student(&self, id: &str) -> ServiceResult<Student> {
        self.store
            .get_student(id)?
            .ok_or_else(|| ServiceError::not_found("student", id))
    }

    /// Students of a department across all its classes, ordered by id.
    pub fn department_students(&self, department_id: DepartmentId) -> ServiceResult<Vec<Student>> {
        if self.store.get_department(department_id)?.is_none() {
            return Err(ServiceError::not_found("department", department_id));
        }
        Ok(self.store.list_department_students(department_id)?)
    }

    fn check_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> ServiceResult<()> {
        let holder = self.store.find_student_by_contact(email, phone, exclude_id)?;
        check_contact_unique(
            "student",
            email,
            phone,
            holder
                .as_ref()
                .map(|other| (other.email.as_str(), other.phone.as_str())),
        )?;
        Ok(())
    }
}
