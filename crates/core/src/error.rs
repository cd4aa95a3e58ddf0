//! Domain and storage error model.

use thiserror::Error;

/// Domain-level error.
///
/// Keep this focused on deterministic input failures. Authorization and
/// storage failures have their own types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
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

/// Failure reported by a persistence adapter.
///
/// Opaque to callers: it is never mapped to an authorization outcome and
/// always surfaces as an internal failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached (pool closed, timeout, IO).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A schema constraint rejected the statement.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
