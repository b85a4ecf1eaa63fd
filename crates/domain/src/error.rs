//! Domain error types.

use thiserror::Error;

/// Input validation failures.
///
/// These are raised before any store is touched, so they never trigger
/// compensation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The learning path identifier is not a valid UUID.
    #[error("invalid learning path id '{0}'")]
    InvalidIdentifier(String),

    /// A required field was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// A text field contained a NUL character, which the relational store rejects.
    #[error("{field} must not contain NUL characters")]
    NulCharacter { field: &'static str },

    /// An update request carried no mutable fields.
    #[error("update must set at least one of: title, description")]
    EmptyUpdate,
}
