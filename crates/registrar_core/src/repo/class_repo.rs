//! Class and student persistence contracts.

use crate::model::{Class, ClassRoster, DepartmentId, Student};
use crate::repo::RepoResult;

/// Repository interface for classes, their rosters and students.
pub trait ClassRepository {
    fn insert_class(&self, class: &Class) -> RepoResult<()>;
    fn get_class(&self, id: &str) -> RepoResult<Option<Class>>;
    /// Loads a class with the ids of every enrolled student.
    fn get_class_roster(&self, id: &str) -> RepoResult<Option<ClassRoster>>;
    fn update_class(&self, class: &Class) -> RepoResult<()>;
    fn delete_class(&self, id: &str) -> RepoResult<()>;
    /// Classes whose host is `instructor_id`, ordered by name.
    fn list_hosted_classes(&self, instructor_id: &str) -> RepoResult<Vec<Class>>;
    /// Lists one department/cohort, ordered by class name.
    fn list_cohort_classes(
        &self,
        department_id: DepartmentId,
        academic_year: i32,
    ) -> RepoResult<Vec<Class>>;

    fn insert_student(&self, student: &Student) -> RepoResult<()>;
    fn get_student(&self, id: &str) -> RepoResult<Option<Student>>;
    fn update_student(&self, student: &Student) -> RepoResult<()>;
    fn delete_student(&self, id: &str) -> RepoResult<()>;
    /// Lists one department's students ordered by id.
    fn list_department_students(&self, department_id: DepartmentId) -> RepoResult<Vec<Student>>;
    /// Finds a student using `email` or `phone`, ignoring `exclude_id`.
    fn find_student_by_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> RepoResult<Option<Student>>;
}
