//! # Identity & Session Manager
//!
//! Registers accounts, exchanges credentials for signed session tokens, and
//! resolves presented tokens back into a [`SessionClaim`].
//!
//! A seller's token normally embeds its seller id. Tokens issued before the
//! seller profile existed (or carrying an unusable hint) are hydrated on
//! resolve from the seller row linked to the account. A missing profile is
//! not an error; ownership checks simply deny that caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use estate_core::{Account, AccountId, DomainError, NewAccount, Role, SellerId, SessionClaim};
use estate_crypto::{CryptoError, PasswordHasher, TokenSigner};
use zeroize::Zeroizing;

use crate::db::{Store, StoreError};

/// Input to [`SessionManager::register`].
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: Zeroizing<String>,
    pub role: Option<Role>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Account view plus the caller's resolved seller profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub account: Account,
    pub seller_id: Option<SellerId>,
}

/// Credential verification and token lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
    hasher: Arc<dyn PasswordHasher>,
    signer: Arc<TokenSigner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn PasswordHasher>,
        signer: Arc<TokenSigner>,
    ) -> Self {
        Self {
            store,
            hasher,
            signer,
        }
    }

    /// Create an account. Role defaults to `buyer`.
    pub async fn register(&self, reg: Registration) -> Result<AccountId, DomainError> {
        if self.store.account_by_email(&reg.email).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "email {} is already registered",
                reg.email
            )));
        }

        let password_hash = self.hash(reg.password).await?;
        let role = reg.role.unwrap_or_default();
        let id = self
            .store
            .insert_account(&NewAccount {
                name: reg.name,
                email: reg.email.clone(),
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    DomainError::Conflict(format!("email {} is already registered", reg.email))
                }
                other => other.into(),
            })?;

        tracing::info!(account_id = %id, role = %role, "account registered");
        Ok(id)
    }

    /// Exchange credentials for a signed token.
    pub async fn authenticate(
        &self,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<String, DomainError> {
        let Some(account) = self.store.account_by_email(email).await? else {
            tracing::debug!("login for unknown email");
            return Err(DomainError::InvalidCredentials);
        };

        if !self.verify(password, account.password_hash.clone()).await? {
            tracing::debug!(account_id = %account.id, "login with wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        let seller_id = self
            .store
            .seller_by_account(account.id)
            .await?
            .map(|s| s.id);

        let claim = SessionClaim {
            account_id: account.id,
            role: account.role,
            email: account.email,
            seller_id,
        };
        let token = self
            .signer
            .issue(&claim)
            .map_err(|e| DomainError::Internal(format!("token issuance failed: {e}")))?;

        tracing::info!(account_id = %claim.account_id, role = %claim.role, "session issued");
        Ok(token)
    }

    /// Resolve a presented token against the current time.
    pub async fn resolve(&self, token: Option<&str>) -> Result<SessionClaim, DomainError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve a presented token as of `now`.
    pub async fn resolve_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionClaim, DomainError> {
        let token = token.ok_or(DomainError::Unauthenticated)?;
        let mut claim = self
            .signer
            .verify_at(token, now)
            .map_err(|e| DomainError::InvalidToken(token_reason(&e)))?;

        if claim.needs_seller_hydration() {
            claim.seller_id = self
                .store
                .seller_by_account(claim.account_id)
                .await?
                .map(|s| s.id);
            tracing::debug!(
                account_id = %claim.account_id,
                hydrated = claim.seller_id.is_some(),
                "seller id hydrated"
            );
        }
        Ok(claim)
    }

    /// The caller's account, re-read from the store.
    pub async fn profile(&self, claim: &SessionClaim) -> Result<Profile, DomainError> {
        let account = self
            .store
            .account_by_id(claim.account_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("account {}", claim.account_id)))?;
        Ok(Profile {
            account,
            seller_id: claim.seller_id,
        })
    }

    async fn hash(&self, password: Zeroizing<String>) -> Result<String, DomainError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| DomainError::Internal(e.to_string()))
    }

    async fn verify(
        &self,
        password: Zeroizing<String>,
        stored: String,
    ) -> Result<bool, DomainError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| DomainError::Internal(format!("verification task failed: {e}")))?
            .map_err(|e| DomainError::Internal(e.to_string()))
    }
}

fn token_reason(err: &CryptoError) -> String {
    match err {
        CryptoError::Expired => "token expired".into(),
        CryptoError::Malformed(_) => "malformed token payload".into(),
        _ => "signature verification failed".into(),
    }
}
