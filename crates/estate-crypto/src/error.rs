//! Errors from hashing and token handling.

use thiserror::Error;

/// Failures raised by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Hashing parameters were rejected or hashing itself failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// A stored hash is not a parseable PHC string.
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    /// Signature, algorithm or encoding check failed.
    #[error("token rejected: {0}")]
    Token(String),

    /// The token's `exp` is at or before the verification time.
    #[error("token expired")]
    Expired,

    /// Signature is valid but the payload does not describe a session.
    #[error("token payload malformed: {0}")]
    Malformed(String),

    /// Signing key or lifetime is unusable.
    #[error("token configuration: {0}")]
    Config(String),
}
