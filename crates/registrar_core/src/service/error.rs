//! Service-level error taxonomy.

use crate::ident::IdAllocatorError;
use crate::invariants::InvariantViolation;
use crate::model::Class;
use crate::repo::RepoError;
use crate::sequence::{Sequence, SequenceError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Input breaks a domain rule; nothing was written.
    Validation(InvariantViolation),
    /// A referenced record does not exist.
    NotFound { entity: &'static str, id: String },
    /// A uniqueness rule rejected the write.
    Conflict(InvariantViolation),
    /// The store rejected a write that raced past the pre-write checks.
    ConstraintConflict { constraint: String },
    /// The cohort has no class sequence left.
    RangeExhausted(SequenceError),
    /// Misconfigured id scheme or scope.
    Identifier(IdAllocatorError),
    /// Store failure.
    Infrastructure(RepoError),
    /// A batch stopped part-way. `created` stays committed.
    PartialBatch {
        created: Vec<Class>,
        failed_sequence: Sequence,
        source: Box<ServiceError>,
    },
    /// Report output could not be written.
    Output(csv::Error),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::ConstraintConflict { .. })
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(violation) => write!(f, "validation failed: {violation}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(violation) => write!(f, "conflict: {violation}"),
            Self::ConstraintConflict { constraint } => {
                write!(f, "conflict: unique constraint failed on {constraint}")
            }
            Self::RangeExhausted(err) => write!(f, "{err}"),
            Self::Identifier(err) => write!(f, "{err}"),
            Self::Infrastructure(err) => write!(f, "store failure: {err}"),
            Self::PartialBatch {
                created,
                failed_sequence,
                source,
            } => write!(
                f,
                "batch stopped at sequence {failed_sequence:02} after creating {} classes: {source}",
                created.len()
            ),
            Self::Output(err) => write!(f, "report output failed: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(violation) | Self::Conflict(violation) => Some(violation),
            Self::RangeExhausted(err) => Some(err),
            Self::Identifier(err) => Some(err),
            Self::Infrastructure(err) => Some(err),
            Self::PartialBatch { source, .. } => Some(source.as_ref()),
            Self::Output(err) => Some(err),
            Self::NotFound { .. } | Self::ConstraintConflict { .. } => None,
        }
    }
}

impl From<InvariantViolation> for ServiceError {
    fn from(value: InvariantViolation) -> Self {
        if value.is_conflict() {
            Self::Conflict(value)
        } else {
            Self::Validation(value)
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict { constraint } => Self::ConstraintConflict { constraint },
            other => Self::Infrastructure(other),
        }
    }
}

impl From<SequenceError> for ServiceError {
    fn from(value: SequenceError) -> Self {
        match value {
            SequenceError::EmptyRequest => {
                Self::Validation(InvariantViolation::InvalidBatchSize { count: 0 })
            }
            exhausted @ SequenceError::CohortExhausted { .. } => Self::RangeExhausted(exhausted),
        }
    }
}

impl From<IdAllocatorError> for ServiceError {
    fn from(value: IdAllocatorError) -> Self {
        Self::Identifier(value)
    }
}

impl From<csv::Error> for ServiceError {
    fn from(value: csv::Error) -> Self {
        Self::Output(value)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::Output(csv::Error::from(value))
    }
}
