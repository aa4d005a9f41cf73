//! # Password Hashing
//!
//! Argon2id with a fresh random salt per hash. Stored values are PHC
//! strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so the cost
//! parameters travel with each hash and old hashes keep verifying after
//! the defaults change.

use argon2::password_hash::{
    Error as PhcError, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::OsRng;

use crate::error::CryptoError;

/// One-way password hashing.
///
/// Implementations are CPU-bound and synchronous. Async callers should move
/// them off the executor (`tokio::task::spawn_blocking`).
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` into a self-describing string.
    fn hash(&self, password: &str) -> Result<String, CryptoError>;

    /// Whether `password` matches `stored`.
    ///
    /// A mismatch is `Ok(false)`. `Err` means `stored` could not be used.
    fn verify(&self, password: &str, stored: &str) -> Result<bool, CryptoError>;
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCost {
    /// Memory in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for PasswordCost {
    /// OWASP baseline for Argon2id: 19 MiB, 2 passes, 1 lane.
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordCost {
    /// Smallest parameters argon2 accepts. Tests only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

/// Argon2id [`PasswordHasher`].
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Build a hasher, rejecting parameters argon2 considers invalid.
    pub fn new(cost: PasswordCost) -> Result<Self, CryptoError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| CryptoError::Hash(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CryptoError::Hash(e.to_string()))
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, CryptoError> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| CryptoError::MalformedHash(e.to_string()))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(e) => Err(CryptoError::MalformedHash(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::new(PasswordCost::minimal()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let stored = h.hash("password123").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(h.verify("password123", &stored).unwrap());
        assert!(!h.verify("password124", &stored).unwrap());
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let stored = hasher().hash("correct horse battery").unwrap();
        assert!(!stored.contains("correct horse battery"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let h = hasher();
        assert_ne!(h.hash("same").unwrap(), h.hash("same").unwrap());
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        assert!(matches!(
            hasher().verify("x", "not-a-phc-string"),
            Err(CryptoError::MalformedHash(_))
        ));
    }

    #[test]
    fn hashes_verify_across_cost_changes() {
        let stored = hasher().hash("rotate-me").unwrap();
        let stronger = Argon2Hasher::new(PasswordCost {
            memory_kib: 64,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(stronger.verify("rotate-me", &stored).unwrap());
    }

    #[test]
    fn invalid_cost_is_rejected() {
        let err = Argon2Hasher::new(PasswordCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        });
        assert!(err.is_err());
    }
}
