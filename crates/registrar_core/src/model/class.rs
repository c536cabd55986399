//! Class (cohort homeroom) model.
//!
//! # Invariants
//! - `name` is derived from department symbol, cohort year and a two digit
//!   sequence number (`D24_CSE01`); see `sequence::CohortKey::class_name`.
//! - The number of enrolled students never exceeds `max_students`.

use crate::model::department::DepartmentId;
use crate::model::instructor::InstructorId;
use crate::model::student::StudentId;
use serde::{Deserialize, Serialize};

pub type ClassId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub max_students: u32,
    /// Cohort year shared by every student of the class.
    pub academic_year: i32,
    pub department_id: DepartmentId,
    /// Homeroom instructor. Students cannot join a class without one.
    pub host_instructor_id: Option<InstructorId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

/// A class together with the ids of its currently enrolled students.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRoster {
    pub class: Class,
    pub student_ids: Vec<StudentId>,
}

impl ClassRoster {
    pub fn enrolled(&self) -> usize {
        self.student_ids.len()
    }

    /// Returns whether `student_id` currently sits in this class.
    pub fn contains(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|id| id == student_id)
    }
}
