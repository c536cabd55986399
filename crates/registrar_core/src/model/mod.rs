//! Academic record domain model.
//!
//! # Responsibility
//! - Define the records the registrar core reads and writes.
//! - Keep cross-entity rules out of the structs; those live in `invariants`.
//!
//! # Invariants
//! - Every record is owned by exactly one department (`department_id`).
//! - Textual ids are produced by `ident::IdAllocator`; join rows use store
//!   assigned integer ids.

pub mod class;
pub mod department;
pub mod enrollment;
pub mod instructor;
pub mod student;
pub mod subject;

pub use class::{Class, ClassId, ClassRoster};
pub use department::{
    Department, DepartmentId, DepartmentUsage, DEPARTMENT_ID_MAX, DEPARTMENT_ID_MIN,
    DEPARTMENT_SYMBOL_MAX_LEN, DEPARTMENT_SYMBOL_MIN_LEN,
};
pub use enrollment::{Assignment, Grade, GradeScores, Registration};
pub use instructor::{Instructor, InstructorId};
pub use student::{Student, StudentId};
pub use subject::{GradeWeights, Subject, SubjectId};

/// Joins first and last name the way reports and rosters display them.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}")
}
