//! Subject model and its grading weights.

use crate::model::department::DepartmentId;
use serde::{Deserialize, Serialize};

pub type SubjectId = String;

/// Percentage weights of the three graded components.
///
/// Only weights summing to exactly 100 may be persisted; see
/// `invariants::check_subject_weights`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeWeights {
    pub process: u8,
    pub midterm: u8,
    pub final_exam: u8,
}

impl GradeWeights {
    pub fn new(process: u8, midterm: u8, final_exam: u8) -> Self {
        Self {
            process,
            midterm,
            final_exam,
        }
    }

    /// Sum of all weights, widened so out-of-range input cannot wrap.
    pub fn total(&self) -> u16 {
        u16::from(self.process) + u16::from(self.midterm) + u16::from(self.final_exam)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub credits: u8,
    pub weights: GradeWeights,
    pub department_id: DepartmentId,
}
