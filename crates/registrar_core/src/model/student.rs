//! Student model.

use crate::model::class::ClassId;
use crate::model::department::DepartmentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type StudentId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all students.
    pub email: String,
    /// Unique across all students.
    pub phone: String,
    pub birth_day: NaiveDate,
    /// Enrollment (cohort) year. Must equal the class cohort year.
    pub academic_year: i32,
    pub class_id: ClassId,
    pub department_id: DepartmentId,
}

impl Student {
    pub fn full_name(&self) -> String {
        super::full_name(&self.first_name, &self.last_name)
    }
}
