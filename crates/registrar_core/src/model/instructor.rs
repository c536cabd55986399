//! Instructor model.

use crate::model::department::DepartmentId;
use serde::{Deserialize, Serialize};

pub type InstructorId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all instructors.
    pub email: String,
    /// Unique across all instructors.
    pub phone: String,
    pub degree: String,
    pub department_id: DepartmentId,
}

impl Instructor {
    pub fn full_name(&self) -> String {
        super::full_name(&self.first_name, &self.last_name)
    }
}
