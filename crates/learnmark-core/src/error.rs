//! Domain error types.
//!
//! Every failure in the engine is a local, synchronous logic error. The
//! variants separate bad arguments from illegal state transitions and from
//! lookups that miss, so callers can map them without string matching.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the completion and scoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An argument violated a precondition (range, emptiness, membership).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation is not allowed in the aggregate's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A child id does not exist in its parent collection.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },
}

/// Coarse classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InvalidOperation,
    NotFound,
}

impl DomainError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into())
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        DomainError::InvalidOperation(message.into())
    }

    pub(crate) fn not_found(kind: &'static str, id: Uuid) -> Self {
        DomainError::NotFound { kind, id }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Returns `true` if this error reports a missing child entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }
}

/// Result alias used throughout the engine.
pub type DomainResult<T> = Result<T, DomainError>;
