//! Class sequence planning per department cohort.
//!
//! # Responsibility
//! - Derive class names `D<yy>_<SYMBOL><NN>` from a cohort and a sequence.
//! - Compute the next contiguous block of sequences after the highest one
//!   already used by the cohort.
//!
//! # Invariants
//! - Sequences live in `1..=99`; a plan never exceeds `MAX_SEQUENCE`.
//! - A plan starts right after the highest existing sequence. Gaps left by
//!   deleted classes are never refilled.
//! - Planning is not atomic with provisioning; callers serialize both per
//!   cohort.

use crate::model::department::normalize_symbol;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

pub type Sequence = u8;

pub const MAX_SEQUENCE: Sequence = 99;

static CLASS_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^D(?P<year>\d{2})_(?P<symbol>.+)(?P<seq>\d{2})$").expect("valid class name regex")
});

/// Department cohort a class belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CohortKey {
    department_symbol: String,
    cohort_year: i32,
}

impl CohortKey {
    pub fn new(department_symbol: &str, cohort_year: i32) -> Self {
        Self {
            department_symbol: normalize_symbol(department_symbol),
            cohort_year,
        }
    }

    pub fn department_symbol(&self) -> &str {
        &self.department_symbol
    }

    pub fn cohort_year(&self) -> i32 {
        self.cohort_year
    }

    /// Two-digit cohort year.
    pub fn short_year(&self) -> i32 {
        self.cohort_year.rem_euclid(100)
    }

    /// `D24_CSE` for symbol `CSE` and cohort 2024.
    pub fn name_prefix(&self) -> String {
        format!("D{:02}_{}", self.short_year(), self.department_symbol)
    }

    pub fn class_name(&self, sequence: Sequence) -> String {
        format!("{}{sequence:02}", self.name_prefix())
    }

    /// Extracts the sequence of `name` when it belongs to this cohort.
    pub fn sequence_of(&self, name: &str) -> Option<Sequence> {
        let captures = CLASS_NAME_RE.captures(name)?;
        let year: i32 = captures["year"].parse().ok()?;
        if year != self.short_year() || &captures["symbol"] != self.department_symbol {
            return None;
        }
        let sequence: Sequence = captures["seq"].parse().ok()?;
        (1..=MAX_SEQUENCE).contains(&sequence).then_some(sequence)
    }
}

/// Contiguous, inclusive block of sequences claimed by one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePlan {
    pub start: Sequence,
    pub end: Sequence,
}

impl SequencePlan {
    pub fn sequences(&self) -> RangeInclusive<Sequence> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// A plan always holds at least one sequence.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Zero classes requested.
    EmptyRequest,
    /// Cohort already used sequence 99.
    CohortExhausted { prefix: String, last: Sequence },
}

impl Display for SequenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRequest => write!(f, "at least one class must be requested"),
            Self::CohortExhausted { prefix, last } => write!(
                f,
                "cohort `{prefix}` has no sequence left after {last:02} (max {MAX_SEQUENCE})"
            ),
        }
    }
}

impl Error for SequenceError {}

/// Plans the next `requested` sequences for `cohort`.
///
/// Names outside the cohort are ignored. The plan is truncated at
/// `MAX_SEQUENCE`, so it may hold fewer than `requested` sequences.
///
/// # Errors
/// - `EmptyRequest` when `requested` is zero.
/// - `CohortExhausted` when the cohort already reached `MAX_SEQUENCE`.
pub fn plan_sequence<'a, I>(
    cohort: &CohortKey,
    existing_names: I,
    requested: u8,
) -> Result<SequencePlan, SequenceError>
where
    I: IntoIterator<Item = &'a str>,
{
    if requested == 0 {
        return Err(SequenceError::EmptyRequest);
    }

    let last = existing_names
        .into_iter()
        .filter_map(|name| cohort.sequence_of(name))
        .max()
        .unwrap_or(0);
    if last >= MAX_SEQUENCE {
        return Err(SequenceError::CohortExhausted {
            prefix: cohort.name_prefix(),
            last,
        });
    }

    let start = last + 1;
    let end = (u16::from(start) + u16::from(requested) - 1).min(u16::from(MAX_SEQUENCE));
    Ok(SequencePlan {
        start,
        // `end` is capped at MAX_SEQUENCE above.
        end: end as Sequence,
    })
}
