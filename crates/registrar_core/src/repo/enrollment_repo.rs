//! Assignment, registration and grade persistence contracts.

use crate::model::{Assignment, DepartmentId, Grade, Registration};
use crate::repo::RepoResult;

/// Query options for listing grades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeListQuery {
    /// Restrict to grades of subjects owned by this department.
    pub department_id: Option<DepartmentId>,
}

/// Repository interface for join records.
pub trait EnrollmentRepository {
    fn insert_assignment(&self, subject_id: &str, instructor_id: &str) -> RepoResult<Assignment>;
    fn get_assignment(&self, id: i64) -> RepoResult<Option<Assignment>>;
    fn find_assignment(
        &self,
        subject_id: &str,
        instructor_id: &str,
    ) -> RepoResult<Option<Assignment>>;
    fn update_assignment(&self, assignment: &Assignment) -> RepoResult<()>;
    fn delete_assignment(&self, id: i64) -> RepoResult<()>;

    fn insert_registration(&self, subject_id: &str, student_id: &str) -> RepoResult<Registration>;
    fn get_registration(&self, id: i64) -> RepoResult<Option<Registration>>;
    fn find_registration(
        &self,
        subject_id: &str,
        student_id: &str,
    ) -> RepoResult<Option<Registration>>;
    fn update_registration(&self, registration: &Registration) -> RepoResult<()>;
    fn delete_registration(&self, id: i64) -> RepoResult<()>;

    /// Persists `grade` ignoring its `id`; returns the stored row.
    fn insert_grade(&self, grade: &Grade) -> RepoResult<Grade>;
    fn get_grade(&self, id: i64) -> RepoResult<Option<Grade>>;
    fn find_grade(&self, subject_id: &str, student_id: &str) -> RepoResult<Option<Grade>>;
    /// Counts grades of `subject_id` given by `instructor_id`.
    fn count_grades_by_grader(&self, subject_id: &str, instructor_id: &str) -> RepoResult<usize>;
    fn update_grade(&self, grade: &Grade) -> RepoResult<()>;
    fn delete_grade(&self, id: i64) -> RepoResult<()>;
    /// Lists grades ordered by id.
    fn list_grades(&self, query: &GradeListQuery) -> RepoResult<Vec<Grade>>;
}
