//! Catalog use-cases: departments, subjects, instructors.
//!
//! # Invariants
//! - Department ids are user-chosen (`1..=99`); subject and instructor ids
//!   are allocated under the owning department's scope.
//! - Subject weights always sum to 100.
//! - Instructor email and phone stay unique among instructors.
//! - A department is deleted only when empty; an instructor only when
//!   hosting no class.

use crate::config::CoreConfig;
use crate::ident::{department_scope, IdAllocator};
use crate::invariants::{
    check_contact_unique, check_department_id, check_department_symbol, check_department_unique,
    check_department_unused, check_instructor_not_hosting, check_subject_weights,
};
use crate::model::{Department, DepartmentId, GradeWeights, Instructor, Subject};
use crate::repo::RecordStore;
use crate::service::{insert_with_fresh_id, ServiceError, ServiceResult};
use log::info;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
    pub credits: u8,
    pub weights: GradeWeights,
    pub department_id: DepartmentId,
}

/// Full replacement of a subject's editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectUpdate {
    pub name: String,
    pub credits: u8,
    pub weights: GradeWeights,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstructor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub degree: String,
    pub department_id: DepartmentId,
}

/// Full replacement of an instructor's editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub degree: String,
}

pub struct CatalogService<S: RecordStore> {
    store: Arc<S>,
    id_retry_limit: u32,
}

impl<S: RecordStore> CatalogService<S> {
    pub fn new(store: Arc<S>, config: &CoreConfig) -> Self {
        Self {
            store,
            id_retry_limit: config.id_retry_limit,
        }
    }

    pub fn create_department(
        &self,
        id: DepartmentId,
        symbol: &str,
        name: &str,
    ) -> ServiceResult<Department> {
        check_department_id(id)?;
        let department = Department::new(id, symbol, name);
        check_department_symbol(&department.symbol)?;
        let existing = self
            .store
            .find_department_by_id_or_symbol(id, &department.symbol)?;
        check_department_unique(&department, existing.as_ref())?;

        self.store.insert_department(&department)?;
        info!(
            "event=department_create module=catalog status=ok department={} symbol={}",
            department.id, department.symbol
        );
        Ok(department)
    }

    pub fn rename_department(&self, id: DepartmentId, name: &str) -> ServiceResult<Department> {
        self.store.rename_department(id, name)?;
        self.department(id)
    }

    pub fn department(&self, id: DepartmentId) -> ServiceResult<Department> {
        self.store
            .get_department(id)?
            .ok_or_else(|| ServiceError::not_found("department", id))
    }

    /// Deletes a department that no subject, instructor, class or student
    /// still belongs to.
    pub fn delete_department(&self, id: DepartmentId) -> ServiceResult<()> {
        self.department(id)?;
        let usage = self.store.department_usage(id)?;
        check_department_unused(id, &usage)?;

        self.store.delete_department(id)?;
        info!(
            "event=department_delete module=catalog status=ok department={}",
            id
        );
        Ok(())
    }

    pub fn department_subjects(&self, department_id: DepartmentId) -> ServiceResult<Vec<Subject>> {
        self.department(department_id)?;
        Ok(self.store.list_department_subjects(department_id)?)
    }

    pub fn department_instructors(
        &self,
        department_id: DepartmentId,
    ) -> ServiceResult<Vec<Instructor>> {
        self.department(department_id)?;
        Ok(self.store.list_department_instructors(department_id)?)
    }

    pub fn create_subject(&self, request: NewSubject) -> ServiceResult<Subject> {
        check_subject_weights(&request.weights)?;
        let department = self.department(request.department_id)?;

        let subject = insert_with_fresh_id(
            &IdAllocator::subject(),
            &department_scope(department.id),
            self.id_retry_limit,
            "subject",
            "subjects.id",
            |id| {
                let subject = Subject {
                    id,
                    name: request.name.clone(),
                    credits: request.credits,
                    weights: request.weights,
                    department_id: department.id,
                };
                self.store.insert_subject(&subject).map(|()| subject)
            },
        )?;
        info!(
            "event=subject_create module=catalog status=ok subject={} department={}",
            subject.id, subject.department_id
        );
        Ok(subject)
    }

    pub fn update_subject(&self, id: &str, update: SubjectUpdate) -> ServiceResult<Subject> {
        check_subject_weights(&update.weights)?;
        let mut subject = self.subject(id)?;
        subject.name = update.name;
        subject.credits = update.credits;
        subject.weights = update.weights;

        self.store.update_subject(&subject)?;
        Ok(subject)
    }

    pub fn subject(&self, id: &str) -> ServiceResult<Subject> {
        self.store
            .get_subject(id)?
            .ok_or_else(|| ServiceError::not_found("subject", id))
    }

    /// Deletes a subject together with its assignments, registrations and
    /// grades.
    pub fn delete_subject(&self, id: &str) -> ServiceResult<()> {
        self.store.delete_subject(id)?;
        info!("event=subject_delete module=catalog status=ok subject={}", id);
        Ok(())
    }

    pub fn create_instructor(&self, request: NewInstructor) -> ServiceResult<Instructor> {
        let department = self.department(request.department_id)?;
        self.check_instructor_contact(&request.email, &request.phone, None)?;

        let instructor = insert_with_fresh_id(
            &IdAllocator::instructor(),
            &department_scope(department.id),
            self.id_retry_limit,
            "instructor",
            "instructors.id",
            |id| {
                let instructor = Instructor {
                    id,
                    first_name: request.first_name.clone(),
                    last_name: request.last_name.clone(),
                    email: request.email.clone(),
                    phone: request.phone.clone(),
                    degree: request.degree.clone(),
                    department_id: department.id,
                };
                self.store.insert_instructor(&instructor).map(|()| instructor)
            },
        )?;
        info!(
            "event=instructor_create module=catalog status=ok instructor={} department={}",
            instructor.id, instructor.department_id
        );
        Ok(instructor)
    }

    pub fn update_instructor(
        &self,
        id: &str,
        update: InstructorUpdate,
    ) -> ServiceResult<Instructor> {
        let mut instructor = self.instructor(id)?;
        self.check_instructor_contact(&update.email, &update.phone, Some(id))?;

        instructor.first_name = update.first_name;
        instructor.last_name = update.last_name;
        instructor.email = update.email;
        instructor.phone = update.phone;
        instructor.degree = update.degree;
        self.store.update_instructor(&instructor)?;
        Ok(instructor)
    }

    pub fn instructor(&self, id: &str) -> ServiceResult<Instructor> {
        self.store
            .get_instructor(id)?
            .ok_or_else(|| ServiceError::not_found("instructor", id))
    }

    /// Deletes an instructor together with their assignments and the grades
    /// they recorded.
    ///
    /// # Errors
    /// - `Validation` while the instructor still hosts a class.
    pub fn delete_instructor(&self, id: &str) -> ServiceResult<()> {
        self.instructor(id)?;
        let hosted = self.store.list_hosted_classes(id)?;
        check_instructor_not_hosting(id, &hosted)?;

        self.store.delete_instructor(id)?;
        info!(
            "event=instructor_delete module=catalog status=ok instructor={}",
            id
        );
        Ok(())
    }

    fn check_instructor_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> ServiceResult<()> {
        let holder = self
            .store
            .find_instructor_by_contact(email, phone, exclude_id)?;
        check_contact_unique(
            "instructor",
            email,
            phone,
            holder
                .as_ref()
                .map(|other| (other.email.as_str(), other.phone.as_str())),
        )?;
        Ok(())
    }
}
