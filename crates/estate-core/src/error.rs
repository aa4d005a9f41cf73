//! # Error Taxonomy
//!
//! Structured error types built with `thiserror`.
//!
//! [`DomainError`] is the closed set of failure kinds produced by the
//! session manager, the access gate and the listing/seller services. The
//! HTTP boundary maps each variant to a stable status and machine-readable
//! code without inspecting messages.
//!
//! [`ValidationError`] covers malformed input to domain constructors.

use thiserror::Error;

/// Failure kinds surfaced by the core services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No credential was presented on a route that requires one.
    #[error("authentication required")]
    Unauthenticated,

    /// The presented token is malformed, expired, or carries a bad signature.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// Login failed: unknown email or password mismatch.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The caller is authenticated but not permitted to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness rule was violated (duplicate email, second linked profile).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The mutation is malformed or lost a race with a concurrent writer.
    #[error("invalid mutation: {0}")]
    Invalid(String),

    /// Store or infrastructure failure. Never rendered to clients verbatim.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Shorthand for [`DomainError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for [`DomainError::Forbidden`].
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }
}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        Self::Invalid(err.to_string())
    }
}

/// Validation errors for identifiers, enums and record fields.
///
/// Each variant carries the offending input so operators can diagnose a bad
/// request or a corrupt row without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifiers are positive integers.
    #[error("{kind} must be a positive integer, got {value}")]
    NonPositiveId {
        /// Which identifier type rejected the value.
        kind: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// An identifier string did not parse as an integer.
    #[error("{kind} is not a valid integer: \"{input}\"")]
    UnparseableId {
        /// Which identifier type rejected the value.
        kind: &'static str,
        /// The rejected input.
        input: String,
    },

    /// Role string outside `admin | seller | buyer`.
    #[error("unknown role: \"{0}\" (expected admin, seller or buyer)")]
    UnknownRole(String),

    /// Sort expression outside the accepted grammar.
    #[error("invalid sort \"{input}\" (expected {expected})")]
    InvalidSort {
        /// The rejected input.
        input: String,
        /// Human-readable accepted grammar.
        expected: &'static str,
    },

    /// A record field violates its constraint.
    #[error("{field}: {reason}")]
    Field {
        /// The field name as it appears on the wire.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ValidationError {
    /// Build a [`ValidationError::Field`].
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Field {
            field,
            reason: reason.into(),
        }
    }
}
