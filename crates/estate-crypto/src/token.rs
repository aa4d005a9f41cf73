//! # Session Tokens
//!
//! HS256 JWTs. The payload is
//!
//! ```json
//! { "uid": 15, "email": "a@b.co", "role": "seller", "sid": 7, "iat": 1700000000, "exp": 1700003600 }
//! ```
//!
//! `sid` is optional and read leniently: a positive number or a numeric
//! string becomes a [`SellerId`], anything else is treated as absent so the
//! caller can hydrate it. Every other field is strict.
//!
//! Expiry is checked here rather than by `jsonwebtoken`, against an
//! explicit `now`, with no leeway: a token is valid while `now < exp`.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use estate_core::{AccountId, Role, SellerId, SessionClaim};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::CryptoError;

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    uid: i64,
    email: String,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sid: Option<Value>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens with one shared secret.
pub struct TokenSigner {
    secret: Zeroizing<Vec<u8>>,
    ttl: Duration,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer. The secret must be non-empty and the lifetime positive.
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Result<Self, CryptoError> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(CryptoError::Config("signing secret is empty".into()));
        }
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .filter(|s| *s > 0)
            .and_then(Duration::try_seconds)
            .ok_or_else(|| CryptoError::Config(format!("invalid token lifetime: {ttl_secs}s")))?;
        Ok(Self { secret, ttl })
    }

    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `claim` that expires `ttl` after now.
    pub fn issue(&self, claim: &SessionClaim) -> Result<String, CryptoError> {
        self.issue_at(claim, Utc::now())
    }

    /// Issue a token for `claim` as if the current time were `now`.
    pub fn issue_at(&self, claim: &SessionClaim, now: DateTime<Utc>) -> Result<String, CryptoError> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(self.ttl.num_seconds())
            .ok_or_else(|| CryptoError::Config("token expiry overflows".into()))?;
        let wire = WireClaims {
            uid: claim.account_id.get(),
            email: claim.email.clone(),
            role: claim.role.as_str().to_string(),
            sid: claim.seller_id.map(|s| Value::from(s.get())),
            iat,
            exp,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &wire,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| CryptoError::Token(e.to_string()))
    }

    /// Verify `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<SessionClaim, CryptoError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, expiry and payload shape as of `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaim, CryptoError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        let data = jsonwebtoken::decode::<WireClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::Json(inner) => CryptoError::Malformed(inner.to_string()),
            ErrorKind::ExpiredSignature => CryptoError::Expired,
            _ => CryptoError::Token(e.to_string()),
        })?;
        let wire = data.claims;

        if now.timestamp() >= wire.exp {
            return Err(CryptoError::Expired);
        }

        let account_id =
            AccountId::new(wire.uid).map_err(|e| CryptoError::Malformed(e.to_string()))?;
        let role: Role = wire
            .role
            .parse()
            .map_err(|e: estate_core::ValidationError| CryptoError::Malformed(e.to_string()))?;

        Ok(SessionClaim {
            account_id,
            role,
            email: wire.email,
            seller_id: wire.sid.as_ref().and_then(lenient_seller_id),
        })
    }
}

fn lenient_seller_id(value: &Value) -> Option<SellerId> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| SellerId::new(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// 32 random bytes, hex encoded. Used when no secret is configured.
pub fn random_secret() -> String {
    let mut bytes = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut bytes[..]);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-0123456789", 3600).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn seller_claim() -> SessionClaim {
        SessionClaim {
            account_id: AccountId::new(15).unwrap(),
            role: Role::Seller,
            email: "seller@test.com".into(),
            seller_id: Some(SellerId::new(7).unwrap()),
        }
    }

    fn forge(payload: Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_verifies_to_the_same_claim() {
        let s = signer();
        let token = s.issue_at(&seller_claim(), t0()).unwrap();
        assert_eq!(s.verify_at(&token, t0()).unwrap(), seller_claim());
    }

    #[test]
    fn expiry_is_exact_to_the_second() {
        let s = signer();
        let token = s.issue_at(&seller_claim(), t0()).unwrap();
        assert!(s.verify_at(&token, t0() + Duration::seconds(3599)).is_ok());
        assert_eq!(
            s.verify_at(&token, t0() + Duration::seconds(3600)),
            Err(CryptoError::Expired)
        );
    }

    #[test]
    fn unusable_lifetimes_are_config_errors() {
        for ttl in [0, 10u64.pow(17), u64::MAX] {
            assert!(matches!(
                TokenSigner::new("k", ttl),
                Err(CryptoError::Config(_))
            ));
        }
        assert!(TokenSigner::new("", 60).is_err());
    }

    #[test]
    fn longest_accepted_lifetime_still_issues() {
        let max = u64::try_from(i64::MAX / 1000).unwrap();
        let s = TokenSigner::new("k", max).unwrap();
        let token = s.issue_at(&seller_claim(), t0()).unwrap();
        assert_eq!(s.verify_at(&token, t0()).unwrap(), seller_claim());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = signer().issue_at(&seller_claim(), t0()).unwrap();
        let other = TokenSigner::new("another-secret", 3600).unwrap();
        assert!(matches!(other.verify_at(&token, t0()), Err(CryptoError::Token(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            signer().verify_at("not.a.jwt", t0()),
            Err(CryptoError::Token(_)) | Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn seller_id_is_read_leniently() {
        let s = signer();
        let base = |sid: Value| {
            json!({
                "uid": 15, "email": "seller@test.com", "role": "seller",
                "sid": sid, "iat": t0().timestamp(), "exp": t0().timestamp() + 60,
            })
        };

        let claim = s.verify_at(&forge(base(json!("7")), "test-secret-0123456789"), t0()).unwrap();
        assert_eq!(claim.seller_id, Some(SellerId::new(7).unwrap()));

        for junk in [json!("abc"), json!(0), json!(-4), json!(null), json!({"x": 1})] {
            let claim = s.verify_at(&forge(base(junk), "test-secret-0123456789"), t0()).unwrap();
            assert_eq!(claim.seller_id, None);
        }
    }

    #[test]
    fn missing_seller_id_is_absent() {
        let token = forge(
            json!({
                "uid": 3, "email": "b@test.com", "role": "buyer",
                "iat": t0().timestamp(), "exp": t0().timestamp() + 60,
            }),
            "test-secret-0123456789",
        );
        let claim = signer().verify_at(&token, t0()).unwrap();
        assert_eq!(claim.role, Role::Buyer);
        assert_eq!(claim.seller_id, None);
    }

    #[test]
    fn unknown_role_or_bad_uid_is_malformed() {
        let s = signer();
        let token = forge(
            json!({"uid": 3, "email": "x@y.z", "role": "root", "iat": 0, "exp": t0().timestamp() + 60}),
            "test-secret-0123456789",
        );
        assert!(matches!(s.verify_at(&token, t0()), Err(CryptoError::Malformed(_))));

        let token = forge(
            json!({"uid": 0, "email": "x@y.z", "role": "buyer", "iat": 0, "exp": t0().timestamp() + 60}),
            "test-secret-0123456789",
        );
        assert!(matches!(s.verify_at(&token, t0()), Err(CryptoError::Malformed(_))));

        let token = forge(json!({"email": "x@y.z"}), "test-secret-0123456789");
        assert!(matches!(s.verify_at(&token, t0()), Err(CryptoError::Malformed(_))));
    }

    #[test]
    fn config_is_validated() {
        assert!(TokenSigner::new("", 3600).is_err());
        assert!(TokenSigner::new("k", 0).is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", signer());
        assert!(!rendered.contains("test-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn random_secrets_are_distinct_hex() {
        let a = random_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, random_secret());
    }
}
