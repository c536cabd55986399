//! Entity code allocation.
//!
//! # Responsibility
//! - Produce fixed-length textual ids: `<prefix><scope><random digits>`.
//! - Provide the per-entity id schemes used by the services.
//!
//! # Invariants
//! - Every allocated id has exactly `total_len` ASCII characters.
//! - At least one random digit is always appended; schemes that cannot fit
//!   one are rejected at construction.
//! - Randomness is not cryptographic. Collisions are possible and are
//!   resolved by the caller retrying with a fresh id.

use crate::model::DepartmentId;
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdAllocatorError {
    /// Scheme leaves no room for random digits.
    SuffixTooShort {
        prefix: String,
        max_scope_len: usize,
        total_len: usize,
    },
    /// Scope code longer than the scheme allows.
    ScopeTooLong { scope: String, max_scope_len: usize },
}

impl Display for IdAllocatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuffixTooShort {
                prefix,
                max_scope_len,
                total_len,
            } => write!(
                f,
                "id scheme `{prefix}` with scope up to {max_scope_len} chars leaves no random suffix within {total_len} chars"
            ),
            Self::ScopeTooLong {
                scope,
                max_scope_len,
            } => write!(
                f,
                "scope code `{scope}` exceeds {max_scope_len} chars"
            ),
        }
    }
}

impl Error for IdAllocatorError {}

/// Fixed-length id scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    prefix: &'static str,
    max_scope_len: usize,
    total_len: usize,
}

const ID_LEN: usize = 10;

impl IdAllocator {
    /// Builds a scheme.
    ///
    /// # Errors
    /// - `SuffixTooShort` when `total_len <= prefix.len() + max_scope_len`.
    pub fn new(
        prefix: &'static str,
        max_scope_len: usize,
        total_len: usize,
    ) -> Result<Self, IdAllocatorError> {
        if total_len <= prefix.len() + max_scope_len {
            return Err(IdAllocatorError::SuffixTooShort {
                prefix: prefix.to_string(),
                max_scope_len,
                total_len,
            });
        }
        Ok(Self {
            prefix,
            max_scope_len,
            total_len,
        })
    }

    /// `LH` + department code, 10 chars.
    pub const fn class() -> Self {
        Self::preset("LH", 2)
    }

    /// `MH` + department code, 10 chars.
    pub const fn subject() -> Self {
        Self::preset("MH", 2)
    }

    /// `GV` + department code, 10 chars.
    pub const fn instructor() -> Self {
        Self::preset("GV", 2)
    }

    /// `SV` + department code + two-digit cohort year, 10 chars.
    pub const fn student() -> Self {
        Self::preset("SV", 4)
    }

    // Presets are checked by `presets_leave_random_suffix`.
    const fn preset(prefix: &'static str, max_scope_len: usize) -> Self {
        Self {
            prefix,
            max_scope_len,
            total_len: ID_LEN,
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Allocates an id using the thread-local RNG.
    pub fn allocate(&self, scope: &str) -> Result<String, IdAllocatorError> {
        self.allocate_with(scope, &mut rand::thread_rng())
    }

    /// Allocates an id drawing digits from `rng`.
    pub fn allocate_with<R: Rng + ?Sized>(
        &self,
        scope: &str,
        rng: &mut R,
    ) -> Result<String, IdAllocatorError> {
        if scope.len() > self.max_scope_len {
            return Err(IdAllocatorError::ScopeTooLong {
                scope: scope.to_string(),
                max_scope_len: self.max_scope_len,
            });
        }

        let mut id = String::with_capacity(self.total_len);
        id.push_str(self.prefix);
        id.push_str(scope);
        while id.len() < self.total_len {
            let digit = rng.gen_range(0..10u8);
            id.push(char::from(b'0' + digit));
        }
        Ok(id)
    }
}

/// Scope code of department-owned ids: the zero-padded department number.
pub fn department_scope(department_id: DepartmentId) -> String {
    format!("{department_id:02}")
}

/// Scope code of student ids: department number followed by cohort `yy`.
pub fn student_scope(department_id: DepartmentId, academic_year: i32) -> String {
    format!(
        "{department_id:02}{:02}",
        academic_year.rem_euclid(100)
    )
}
