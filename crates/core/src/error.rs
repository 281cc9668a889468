//! Errors for malformed identifiers and references.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Raised when caller-supplied ids or entity references do not parse.
///
/// Everything here is a 400-class problem; storage and model failures have
/// their own error types in the crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
