//! Cross-entity invariant checks.
//!
//! # Responsibility
//! - Decide whether a write may proceed, given records already loaded by
//!   the caller.
//! - Name the violated rule precisely enough for the caller to report it.
//!
//! # Invariants
//! - Every check is a pure function: no I/O, no clock, no shared state.
//!   Callers pass "today" explicitly where a rule depends on it.
//! - Checks run before any write of the operation they guard.

use crate::model::{
    Assignment, Class, ClassRoster, Department, DepartmentId, DepartmentUsage, GradeScores,
    GradeWeights, Instructor, Registration, Student, DEPARTMENT_ID_MAX, DEPARTMENT_ID_MIN,
    DEPARTMENT_SYMBOL_MAX_LEN, DEPARTMENT_SYMBOL_MIN_LEN,
};
use crate::sequence::MAX_SEQUENCE;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Join records that must be unique per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    /// (subject, instructor)
    Assignment,
    /// (subject, student)
    Registration,
    /// (subject, student)
    Grade,
}

impl PairKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Registration => "registration",
            Self::Grade => "grade",
        }
    }
}

pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    SubjectWeights {
        total: u16,
    },
    DepartmentIdOutOfRange {
        id: DepartmentId,
    },
    InvalidDepartmentSymbol {
        symbol: String,
    },
    DuplicateDepartment {
        id: DepartmentId,
        symbol: String,
    },
    DepartmentInUse {
        id: DepartmentId,
        usage: DepartmentUsage,
    },
    InstructorHostsClasses {
        instructor_id: String,
        classes: usize,
    },
    DuplicateContact {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    DepartmentMismatch {
        subject: &'static str,
        expected: DepartmentId,
        actual: DepartmentId,
    },
    CohortMismatch {
        class_year: i32,
        student_year: i32,
    },
    AcademicYearInFuture {
        year: i32,
        current_year: i32,
    },
    BirthDayInFuture {
        birth_day: NaiveDate,
    },
    ClassWithoutHost {
        class_id: String,
    },
    ClassFull {
        class_id: String,
        max_students: u32,
    },
    CapacityBelowEnrollment {
        max_students: u32,
        enrolled: usize,
    },
    InvalidCapacity {
        max_students: u32,
    },
    InvalidBatchSize {
        count: u8,
    },
    ClassNotEmpty {
        class_id: String,
        enrolled: usize,
    },
    DuplicatePair {
        kind: PairKind,
        subject_id: String,
        member_id: String,
    },
    ScoreOutOfRange {
        component: &'static str,
        value: f64,
    },
    MissingRegistration {
        subject_id: String,
        student_id: String,
    },
    MissingAssignment {
        subject_id: String,
        instructor_id: String,
    },
    /// The pair is the prerequisite of recorded grades.
    PairHasGrades {
        kind: PairKind,
        subject_id: String,
        member_id: String,
        grades: usize,
    },
    /// Every freshly allocated id collided with an existing record.
    DuplicateIdentifier {
        entity: &'static str,
        attempts: u32,
    },
}

impl InvariantViolation {
    /// Uniqueness rules; everything else is a validation failure.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateDepartment { .. }
                | Self::DuplicateContact { .. }
                | Self::DuplicatePair { .. }
                | Self::DuplicateIdentifier { .. }
        )
    }
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubjectWeights { total } => {
                write!(f, "grade weights must sum to 100, got {total}")
            }
            Self::DepartmentIdOutOfRange { id } => write!(
                f,
                "department id {id} outside {DEPARTMENT_ID_MIN}..={DEPARTMENT_ID_MAX}"
            ),
            Self::InvalidDepartmentSymbol { symbol } => write!(
                f,
                "department symbol `{symbol}` must be {DEPARTMENT_SYMBOL_MIN_LEN}..={DEPARTMENT_SYMBOL_MAX_LEN} ASCII letters or digits"
            ),
            Self::DepartmentInUse { id, usage } => write!(
                f,
                "department {id} still has {} subjects, {} instructors, {} classes and {} students",
                usage.subjects, usage.instructors, usage.classes, usage.students
            ),
            Self::InstructorHostsClasses {
                instructor_id,
                classes,
            } => write!(f, "instructor {instructor_id} hosts {classes} classes"),
            Self::DuplicateDepartment { id, symbol } => {
                write!(f, "department id {id} or symbol `{symbol}` already exists")
            }
            Self::DuplicateContact {
                entity,
                field,
                value,
            } => write!(f, "{entity} {field} `{value}` already in use"),
            Self::DepartmentMismatch {
                subject,
                expected,
                actual,
            } => write!(
                f,
                "{subject} belongs to department {actual}, expected {expected}"
            ),
            Self::CohortMismatch {
                class_year,
                student_year,
            } => write!(
                f,
                "student academic year {student_year} differs from class cohort {class_year}"
            ),
            Self::AcademicYearInFuture { year, current_year } => write!(
                f,
                "academic year {year} is after the current year {current_year}"
            ),
            Self::BirthDayInFuture { birth_day } => {
                write!(f, "birth day {birth_day} is in the future")
            }
            Self::ClassWithoutHost { class_id } => {
                write!(f, "class {class_id} has no host instructor")
            }
            Self::ClassFull {
                class_id,
                max_students,
            } => write!(f, "class {class_id} is full ({max_students} students)"),
            Self::CapacityBelowEnrollment {
                max_students,
                enrolled,
            } => write!(
                f,
                "capacity {max_students} is below the {enrolled} enrolled students"
            ),
            Self::InvalidCapacity { max_students } => {
                write!(f, "class capacity must be positive, got {max_students}")
            }
            Self::InvalidBatchSize { count } => write!(
                f,
                "batch size must be within 1..={MAX_SEQUENCE}, got {count}"
            ),
            Self::ClassNotEmpty { class_id, enrolled } => {
                write!(f, "class {class_id} still has {enrolled} students")
            }
            Self::DuplicatePair {
                kind,
                subject_id,
                member_id,
            } => write!(
                f,
                "{} for subject {subject_id} and {member_id} already exists",
                kind.as_str()
            ),
            Self::ScoreOutOfRange { component, value } => {
                write!(f, "{component} score {value} outside 0..={MAX_SCORE}")
            }
            Self::MissingRegistration {
                subject_id,
                student_id,
            } => write!(
                f,
                "student {student_id} is not registered for subject {subject_id}"
            ),
            Self::MissingAssignment {
                subject_id,
                instructor_id,
            } => write!(
                f,
                "instructor {instructor_id} is not assigned to subject {subject_id}"
            ),
            Self::PairHasGrades {
                kind,
                subject_id,
                member_id,
                grades,
            } => write!(
                f,
                "{} for subject {subject_id} and {member_id} backs {grades} grades",
                kind.as_str()
            ),
            Self::DuplicateIdentifier { entity, attempts } => write!(
                f,
                "no free {entity} id after {attempts} attempts"
            ),
        }
    }
}

impl Error for InvariantViolation {}

pub type CheckResult = Result<(), InvariantViolation>;

pub fn check_department_id(id: DepartmentId) -> CheckResult {
    if !(DEPARTMENT_ID_MIN..=DEPARTMENT_ID_MAX).contains(&id) {
        return Err(InvariantViolation::DepartmentIdOutOfRange { id });
    }
    Ok(())
}

/// Symbols are stored upper-cased and end up inside class names, so they
/// must be plain ASCII letters or digits.
pub fn check_department_symbol(symbol: &str) -> CheckResult {
    let length_ok =
        (DEPARTMENT_SYMBOL_MIN_LEN..=DEPARTMENT_SYMBOL_MAX_LEN).contains(&symbol.len());
    if !length_ok || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(InvariantViolation::InvalidDepartmentSymbol {
            symbol: symbol.to_string(),
        });
    }
    Ok(())
}

/// A department is deleted only once nothing refers to it.
pub fn check_department_unused(id: DepartmentId, usage: &DepartmentUsage) -> CheckResult {
    if !usage.is_empty() {
        return Err(InvariantViolation::DepartmentInUse { id, usage: *usage });
    }
    Ok(())
}

/// An instructor hosting a class cannot be removed; the class would lose
/// its host while keeping its students.
pub fn check_instructor_not_hosting(instructor_id: &str, hosted: &[Class]) -> CheckResult {
    if !hosted.is_empty() {
        return Err(InvariantViolation::InstructorHostsClasses {
            instructor_id: instructor_id.to_string(),
            classes: hosted.len(),
        });
    }
    Ok(())
}

/// Rejects removing or re-pointing a pair that recorded grades depend on.
pub fn check_pair_without_grades(
    kind: PairKind,
    subject_id: &str,
    member_id: &str,
    grades: usize,
) -> CheckResult {
    if grades > 0 {
        return Err(InvariantViolation::PairHasGrades {
            kind,
            subject_id: subject_id.to_string(),
            member_id: member_id.to_string(),
            grades,
        });
    }
    Ok(())
}

/// `existing` is any department sharing the candidate's id or symbol.
pub fn check_department_unique(
    candidate: &Department,
    existing: Option<&Department>,
) -> CheckResult {
    match existing {
        Some(_) => Err(InvariantViolation::DuplicateDepartment {
            id: candidate.id,
            symbol: candidate.symbol.clone(),
        }),
        None => Ok(()),
    }
}

pub fn check_subject_weights(weights: &GradeWeights) -> CheckResult {
    let total = weights.total();
    if total != 100 {
        return Err(InvariantViolation::SubjectWeights { total });
    }
    Ok(())
}

/// `holder` is the `(email, phone)` of another record of the same kind that
/// shares either value, if one was found.
pub fn check_contact_unique(
    entity: &'static str,
    email: &str,
    phone: &str,
    holder: Option<(&str, &str)>,
) -> CheckResult {
    let Some((held_email, held_phone)) = holder else {
        return Ok(());
    };
    let (field, value) = if held_email == email {
        ("email", email)
    } else if held_phone == phone {
        ("phone", phone)
    } else {
        return Ok(());
    };
    Err(InvariantViolation::DuplicateContact {
        entity,
        field,
        value: value.to_string(),
    })
}

/// `subject` names the record whose department is `actual`.
pub fn check_same_department(
    subject: &'static str,
    expected: DepartmentId,
    actual: DepartmentId,
) -> CheckResult {
    if expected != actual {
        return Err(InvariantViolation::DepartmentMismatch {
            subject,
            expected,
            actual,
        });
    }
    Ok(())
}

pub fn check_host_instructor(class: &Class, host: &Instructor) -> CheckResult {
    check_same_department("host instructor", class.department_id, host.department_id)
}

/// Capacity change rule: positive and not below the current roster.
pub fn check_capacity_update(max_students: u32, enrolled: usize) -> CheckResult {
    if max_students == 0 {
        return Err(InvariantViolation::InvalidCapacity { max_students });
    }
    if usize::try_from(max_students).map_or(false, |max| max < enrolled) {
        return Err(InvariantViolation::CapacityBelowEnrollment {
            max_students,
            enrolled,
        });
    }
    Ok(())
}

/// Rules for placing `student` into the class described by `roster`.
///
/// A student already on the roster does not count against capacity again.
pub fn check_student_enrollment(
    student: &Student,
    roster: &ClassRoster,
    current_year: i32,
) -> CheckResult {
    let class = &roster.class;
    if student.academic_year > current_year {
        return Err(InvariantViolation::AcademicYearInFuture {
            year: student.academic_year,
            current_year,
        });
    }
    if class.host_instructor_id.is_none() {
        return Err(InvariantViolation::ClassWithoutHost {
            class_id: class.id.clone(),
        });
    }
    check_same_department("student", class.department_id, student.department_id)?;
    if student.academic_year != class.academic_year {
        return Err(InvariantViolation::CohortMismatch {
            class_year: class.academic_year,
            student_year: student.academic_year,
        });
    }

    let enrolled = roster.enrolled();
    let is_member = roster.contains(&student.id);
    let max = usize::try_from(class.max_students).unwrap_or(usize::MAX);
    if !is_member && enrolled >= max {
        return Err(InvariantViolation::ClassFull {
            class_id: class.id.clone(),
            max_students: class.max_students,
        });
    }
    Ok(())
}

pub fn check_birth_day(birth_day: NaiveDate, today: NaiveDate) -> CheckResult {
    if birth_day > today {
        return Err(InvariantViolation::BirthDayInFuture { birth_day });
    }
    Ok(())
}

/// Rejects a pair that already has a record of `kind`.
pub fn check_pair_absent<T>(
    kind: PairKind,
    subject_id: &str,
    member_id: &str,
    existing: Option<&T>,
) -> CheckResult {
    if existing.is_some() {
        return Err(InvariantViolation::DuplicatePair {
            kind,
            subject_id: subject_id.to_string(),
            member_id: member_id.to_string(),
        });
    }
    Ok(())
}

/// Every component score must be a finite value on the 0-10 scale.
pub fn check_grade_scores(scores: &GradeScores) -> CheckResult {
    for (component, value) in [
        ("process", scores.process),
        ("midterm", scores.midterm),
        ("final", scores.final_exam),
    ] {
        if !(0.0..=MAX_SCORE).contains(&value) {
            return Err(InvariantViolation::ScoreOutOfRange { component, value });
        }
    }
    Ok(())
}

/// A grade needs the student registered and the grader assigned.
pub fn check_grade_prerequisites(
    subject_id: &str,
    student_id: &str,
    instructor_id: &str,
    registration: Option<&Registration>,
    assignment: Option<&Assignment>,
) -> CheckResult {
    if registration.is_none() {
        return Err(InvariantViolation::MissingRegistration {
            subject_id: subject_id.to_string(),
            student_id: student_id.to_string(),
        });
    }
    if assignment.is_none() {
        return Err(InvariantViolation::MissingAssignment {
            subject_id: subject_id.to_string(),
            instructor_id: instructor_id.to_string(),
        });
    }
    Ok(())
}

pub fn check_batch_size(count: u8, max_students: u32) -> CheckResult {
    if count == 0 || count > MAX_SEQUENCE {
        return Err(InvariantViolation::InvalidBatchSize { count });
    }
    if max_students == 0 {
        return Err(InvariantViolation::InvalidCapacity { max_students });
    }
    Ok(())
}

pub fn check_class_empty(roster: &ClassRoster) -> CheckResult {
    if roster.enrolled() > 0 {
        return Err(InvariantViolation::ClassNotEmpty {
            class_id: roster.class.id.clone(),
            enrolled: roster.enrolled(),
        });
    }
    Ok(())
}
