//! Join records: instructor assignments, student registrations and grades.
//!
//! # Invariants
//! - At most one assignment per (subject, instructor) pair.
//! - At most one registration and one grade per (subject, student) pair.
//! - A grade requires both a registration of its student and an assignment
//!   of its grading instructor to the same subject.

use crate::model::instructor::InstructorId;
use crate::model::student::StudentId;
use crate::model::subject::SubjectId;
use serde::{Deserialize, Serialize};

/// Instructor teaches subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub subject_id: SubjectId,
    pub instructor_id: InstructorId,
}

/// Student takes subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub subject_id: SubjectId,
    pub student_id: StudentId,
}

/// Component scores on the 0–10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeScores {
    pub process: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub scores: GradeScores,
    pub subject_id: SubjectId,
    pub student_id: StudentId,
    pub by_instructor_id: InstructorId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}
