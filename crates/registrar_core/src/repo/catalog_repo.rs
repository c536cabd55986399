//! Department, subject and instructor persistence contracts.

use crate::model::{Department, DepartmentId, DepartmentUsage, Instructor, Subject};
use crate::repo::RepoResult;

/// Repository interface for the once-created catalog records.
pub trait CatalogRepository {
    fn insert_department(&self, department: &Department) -> RepoResult<()>;
    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>>;
    /// Finds a department clashing with either the id or the symbol.
    fn find_department_by_id_or_symbol(
        &self,
        id: DepartmentId,
        symbol: &str,
    ) -> RepoResult<Option<Department>>;
    fn rename_department(&self, id: DepartmentId, name: &str) -> RepoResult<()>;
    fn delete_department(&self, id: DepartmentId) -> RepoResult<()>;
    /// Counts the records still owned by a department.
    fn department_usage(&self, id: DepartmentId) -> RepoResult<DepartmentUsage>;

    fn insert_subject(&self, subject: &Subject) -> RepoResult<()>;
    fn get_subject(&self, id: &str) -> RepoResult<Option<Subject>>;
    fn update_subject(&self, subject: &Subject) -> RepoResult<()>;
    /// Also removes the subject's assignments, registrations and grades.
    fn delete_subject(&self, id: &str) -> RepoResult<()>;
    /// Lists one department's subjects ordered by id.
    fn list_department_subjects(&self, department_id: DepartmentId) -> RepoResult<Vec<Subject>>;

    fn insert_instructor(&self, instructor: &Instructor) -> RepoResult<()>;
    fn get_instructor(&self, id: &str) -> RepoResult<Option<Instructor>>;
    fn update_instructor(&self, instructor: &Instructor) -> RepoResult<()>;
    /// Also removes the instructor's assignments and the grades they gave.
    fn delete_instructor(&self, id: &str) -> RepoResult<()>;
    /// Lists one department's instructors ordered by id.
    fn list_department_instructors(
        &self,
        department_id: DepartmentId,
    ) -> RepoResult<Vec<Instructor>>;
    /// Finds an instructor using `email` or `phone`, ignoring `exclude_id`.
    fn find_instructor_by_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> RepoResult<Option<Instructor>>;
}
