//! Department model.

use serde::{Deserialize, Serialize};

/// User-chosen department number. Valid values are `1..=99`.
pub type DepartmentId = u8;

pub const DEPARTMENT_ID_MIN: DepartmentId = 1;
pub const DEPARTMENT_ID_MAX: DepartmentId = 99;

pub const DEPARTMENT_SYMBOL_MIN_LEN: usize = 2;
pub const DEPARTMENT_SYMBOL_MAX_LEN: usize = 10;

/// Top-level owner of subjects, instructors, classes and students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    /// Short code used inside class names, stored upper-cased.
    pub symbol: String,
    pub name: String,
}

impl Department {
    /// Builds a department, normalizing `symbol` to upper case.
    pub fn new(id: DepartmentId, symbol: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            id,
            symbol: normalize_symbol(symbol.as_ref()),
            name: name.into(),
        }
    }
}

/// Canonical symbol form: trimmed, ASCII upper case.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Records still owned by a department.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepartmentUsage {
    pub subjects: usize,
    pub instructors: usize,
    pub classes: usize,
    pub students: usize,
}

impl DepartmentUsage {
    pub fn is_empty(&self) -> bool {
        self.subjects == 0 && self.instructors == 0 && self.classes == 0 && self.students == 0
    }
}
