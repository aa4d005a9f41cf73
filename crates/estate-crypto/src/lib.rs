//! # estate-crypto: Credential Primitives
//!
//! - **Password hashing**: Argon2id behind the [`PasswordHasher`] trait.
//!   The contract is "plaintext in, PHC string out" and "plaintext plus
//!   stored hash in, boolean match out". Callers never see salts or
//!   parameters.
//! - **Session tokens**: HS256 JWTs issued and verified by [`TokenSigner`],
//!   carrying a [`SessionClaim`](estate_core::SessionClaim).
//!
//! ## Crate Policy
//!
//! - Depends only on `estate-core` internally.
//! - Secrets are zeroized on drop and never appear in `Debug` output.
//! - Verification takes an explicit `now`; nothing here reads the clock
//!   except the convenience wrappers.

pub mod error;
pub mod password;
pub mod token;

pub use error::CryptoError;
pub use password::{Argon2Hasher, PasswordCost, PasswordHasher};
pub use token::{random_secret, TokenSigner};
