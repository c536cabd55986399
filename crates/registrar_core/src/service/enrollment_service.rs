//! Assignments, registrations and grades.
//!
//! # Invariants
//! - Assignment and registration pairs are unique and stay inside one
//!   department.
//! - A grade exists only for a registered student, is given by an
//!   instructor assigned to the subject, and is unique per pair.
//! - A pair backing a recorded grade is neither removed nor re-pointed.

use crate::invariants::{
    check_grade_prerequisites, check_grade_scores, check_pair_absent, check_pair_without_grades,
    check_same_department, PairKind,
};
use crate::model::{
    Assignment, DepartmentId, Grade, GradeScores, Instructor, Registration, Student, Subject,
};
use crate::repo::{GradeListQuery, RecordStore};
use crate::service::{now_epoch_ms, ServiceError, ServiceResult};
use log::info;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct NewGrade {
    pub subject_id: String,
    pub student_id: String,
    pub instructor_id: String,
    pub scores: GradeScores,
}

pub struct EnrollmentService<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> EnrollmentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_assignment(
        &self,
        subject_id: &str,
        instructor_id: &str,
    ) -> ServiceResult<Assignment> {
        self.check_assignment_pair(subject_id, instructor_id, None)?;
        let assignment = self.store.insert_assignment(subject_id, instructor_id)?;
        info!(
            "event=assignment_create module=enrollment status=ok assignment={} subject={} instructor={}",
            assignment.id, subject_id, instructor_id
        );
        Ok(assignment)
    }

    /// Re-points an assignment to another subject/instructor pair.
    ///
    /// # Errors
    /// - `Validation` when the current pair is changed while grades given
    ///   under it exist.
    pub fn update_assignment(
        &self,
        id: i64,
        subject_id: &str,
        instructor_id: &str,
    ) -> ServiceResult<Assignment> {
        let mut assignment = self.assignment(id)?;
        if assignment.subject_id != subject_id || assignment.instructor_id != instructor_id {
            self.check_assignment_ungraded(&assignment)?;
        }
        self.check_assignment_pair(subject_id, instructor_id, Some(id))?;

        assignment.subject_id = subject_id.to_string();
        assignment.instructor_id = instructor_id.to_string();
        self.store.update_assignment(&assignment)?;
        Ok(assignment)
    }

    /// Removes an assignment no recorded grade was given under.
    pub fn delete_assignment(&self, id: i64) -> ServiceResult<()> {
        let assignment = self.assignment(id)?;
        self.check_assignment_ungraded(&assignment)?;
        self.store.delete_assignment(id)?;
        info!(
            "event=assignment_delete module=enrollment status=ok assignment={}",
            id
        );
        Ok(())
    }

    pub fn assignment(&self, id: i64) -> ServiceResult<Assignment> {
        self.store
            .get_assignment(id)?
            .ok_or_else(|| ServiceError::not_found("assignment", id))
    }

    pub fn create_registration(
        &self,
        subject_id: &str,
        student_id: &str,
    ) -> ServiceResult<Registration> {
        self.check_registration_pair(subject_id, student_id, None)?;
        let registration = self.store.insert_registration(subject_id, student_id)?;
        info!(
            "event=registration_create module=enrollment status=ok registration={} subject={} student={}",
            registration.id, subject_id, student_id
        );
        Ok(registration)
    }

    /// Re-points a registration to another subject/student pair.
    ///
    /// # Errors
    /// - `Validation` when the current pair is changed while it is graded.
    pub fn update_registration(
        &self,
        id: i64,
        subject_id: &str,
        student_id: &str,
    ) -> ServiceResult<Registration> {
        let mut registration = self.registration(id)?;
        if registration.subject_id != subject_id || registration.student_id != student_id {
            self.check_registration_ungraded(&registration)?;
        }
        self.check_registration_pair(subject_id, student_id, Some(id))?;

        registration.subject_id = subject_id.to_string();
        registration.student_id = student_id.to_string();
        self.store.update_registration(&registration)?;
        Ok(registration)
    }

    /// Removes a registration that has no grade yet.
    pub fn delete_registration(&self, id: i64) -> ServiceResult<()> {
        let registration = self.registration(id)?;
        self.check_registration_ungraded(&registration)?;
        self.store.delete_registration(id)?;
        info!(
            "event=registration_delete module=enrollment status=ok registration={}",
            id
        );
        Ok(())
    }

    pub fn registration(&self, id: i64) -> ServiceResult<Registration> {
        self.store
            .get_registration(id)?
            .ok_or_else(|| ServiceError::not_found("registration", id))
    }

    /// Records the grade of a registered student.
    ///
    /// # Errors
    /// - `NotFound` for an unknown subject, student or instructor.
    /// - `Validation` when the registration or the grader's assignment is
    ///   missing, or a score is off the 0-10 scale.
    /// - `Conflict` when the pair already has a grade.
    pub fn create_grade(&self, request: NewGrade) -> ServiceResult<Grade> {
        check_grade_scores(&request.scores)?;
        self.subject(&request.subject_id)?;
        self.student(&request.student_id)?;
        self.instructor(&request.instructor_id)?;

        let registration = self
            .store
            .find_registration(&request.subject_id, &request.student_id)?;
        let assignment = self
            .store
            .find_assignment(&request.subject_id, &request.instructor_id)?;
        check_grade_prerequisites(
            &request.subject_id,
            &request.student_id,
            &request.instructor_id,
            registration.as_ref(),
            assignment.as_ref(),
        )?;
        let existing = self
            .store
            .find_grade(&request.subject_id, &request.student_id)?;
        check_pair_absent(
            PairKind::Grade,
            &request.subject_id,
            &request.student_id,
            existing.as_ref(),
        )?;

        let now = now_epoch_ms();
        let grade = self.store.insert_grade(&Grade {
            id: 0,
            scores: request.scores,
            subject_id: request.subject_id,
            student_id: request.student_id,
            by_instructor_id: request.instructor_id,
            created_at: now,
            updated_at: now,
        })?;
        info!(
            "event=grade_create module=enrollment status=ok grade={} subject={} student={}",
            grade.id, grade.subject_id, grade.student_id
        );
        Ok(grade)
    }

    pub fn update_grade_scores(&self, id: i64, scores: GradeScores) -> ServiceResult<Grade> {
        check_grade_scores(&scores)?;
        let mut grade = self.grade(id)?;
        grade.scores = scores;
        grade.updated_at = now_epoch_ms();
        self.store.update_grade(&grade)?;
        Ok(grade)
    }

    pub fn delete_grade(&self, id: i64) -> ServiceResult<()> {
        self.store.delete_grade(id)?;
        Ok(())
    }

    pub fn grade(&self, id: i64) -> ServiceResult<Grade> {
        self.store
            .get_grade(id)?
            .ok_or_else(|| ServiceError::not_found("grade", id))
    }

    /// Grades of the department's subjects, oldest first.
    pub fn department_grades(&self, department_id: DepartmentId) -> ServiceResult<Vec<Grade>> {
        if self.store.get_department(department_id)?.is_none() {
            return Err(ServiceError::not_found("department", department_id));
        }
        Ok(self.store.list_grades(&GradeListQuery {
            department_id: Some(department_id),
        })?)
    }

    fn check_assignment_ungraded(&self, assignment: &Assignment) -> ServiceResult<()> {
        let grades = self
            .store
            .count_grades_by_grader(&assignment.subject_id, &assignment.instructor_id)?;
        check_pair_without_grades(
            PairKind::Assignment,
            &assignment.subject_id,
            &assignment.instructor_id,
            grades,
        )?;
        Ok(())
    }

    fn check_registration_ungraded(&self, registration: &Registration) -> ServiceResult<()> {
        let grade = self
            .store
            .find_grade(&registration.subject_id, &registration.student_id)?;
        check_pair_without_grades(
            PairKind::Registration,
            &registration.subject_id,
            &registration.student_id,
            usize::from(grade.is_some()),
        )?;
        Ok(())
    }

    fn check_assignment_pair(
        &self,
        subject_id: &str,
        instructor_id: &str,
        current_id: Option<i64>,
    ) -> ServiceResult<()> {
        let subject = self.subject(subject_id)?;
        let instructor = self.instructor(instructor_id)?;
        check_same_department("instructor", subject.department_id, instructor.department_id)?;

        let existing = self
            .store
            .find_assignment(subject_id, instructor_id)?
            .filter(|found| Some(found.id) != current_id);
        check_pair_absent(
            PairKind::Assignment,
            subject_id,
            instructor_id,
            existing.as_ref(),
        )?;
        Ok(())
    }

    fn check_registration_pair(
        &self,
        subject_id: &str,
        student_id: &str,
        current_id: Option<i64>,
    ) -> ServiceResult<()> {
        let subject = self.subject(subject_id)?;
        let student = self.student(student_id)?;
        check_same_department("student", subject.department_id, student.department_id)?;

        let existing = self
            .store
            .find_registration(subject_id, student_id)?
            .filter(|found| Some(found.id) != current_id);
        check_pair_absent(
            PairKind::Registration,
            subject_id,
            student_id,
            existing.as_ref(),
        )?;
        Ok(())
    }

    fn subject(&self, id: &str) -> ServiceResult<Subject> {
        self.store
            .get_subject(id)?
            .ok_or_else(|| ServiceError::not_found("subject", id))
    }

    fn student(&self, id: &str) -> ServiceResult<Student> {
        self.store
            .get_student(id)?
            .ok_or_else(|| ServiceError::not_found("student", id))
    }

    fn instructor(&self, id: &str) -> ServiceResult<Instructor> {
        self.store
            .get_instructor(id)?
            .ok_or_else(|| ServiceError::not_found("instructor", id))
    }
}
