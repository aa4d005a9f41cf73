//! # Application State & Configuration
//!
//! [`AppState`] is passed to every handler through axum's `State`
//! extractor. It holds the store and the three services built on it.
//!
//! [`AppConfig`] is read from the environment once at startup:
//!
//! | Variable                      | Default        |
//! |-------------------------------|----------------|
//! | `PORT`                        | `8080`         |
//! | `DATABASE_URL`                | unset: in-memory store |
//! | `JWT_SECRET`                  | unset: ephemeral random secret |
//! | `TOKEN_TTL_SECS`              | `3600`         |
//! | `AUTH_RATE_LIMIT_MAX`         | `50`           |
//! | `AUTH_RATE_LIMIT_WINDOW_SECS` | `900`          |
//! | `LOG_FORMAT`                  | `text` (`json` for structured output) |

use std::str::FromStr;
use std::sync::Arc;

use estate_crypto::{random_secret, CryptoError, PasswordHasher, TokenSigner};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::db::Store;
use crate::middleware::rate_limit::RateLimitConfig;
use crate::services::{ListingService, SellerService, SessionManager};

/// Configuration errors. Reported at startup; the server does not start.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    /// Token signer could not be built.
    #[error("token signer: {0}")]
    Signer(#[from] CryptoError),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

/// Application configuration.
///
/// Custom `Debug` redacts the signing secret and the database URL, which
/// may carry a password.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: Option<Zeroizing<String>>,
    pub token_ttl_secs: u64,
    pub auth_rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("auth_rate_limit", &self.auth_rate_limit)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            jwt_secret: None,
            token_ttl_secs: 3600,
            auth_rate_limit: RateLimitConfig::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Unset and empty variables take
    /// their defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            port: parse_var(&get, "PORT", defaults.port)?,
            database_url: get("DATABASE_URL"),
            jwt_secret: get("JWT_SECRET").map(Zeroizing::new),
            token_ttl_secs: parse_var(&get, "TOKEN_TTL_SECS", defaults.token_ttl_secs)?,
            auth_rate_limit: RateLimitConfig {
                max_requests: parse_var(
                    &get,
                    "AUTH_RATE_LIMIT_MAX",
                    defaults.auth_rate_limit.max_requests,
                )?,
                window_secs: parse_var(
                    &get,
                    "AUTH_RATE_LIMIT_WINDOW_SECS",
                    defaults.auth_rate_limit.window_secs,
                )?,
            },
            log_format: parse_var(&get, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    /// Build the token signer. Without `JWT_SECRET` a random secret is
    /// generated; tokens then stop verifying after a restart.
    pub fn signer(&self) -> Result<TokenSigner, ConfigError> {
        let signer = match &self.jwt_secret {
            Some(secret) => TokenSigner::new(secret.as_bytes().to_vec(), self.token_ttl_secs)?,
            None => {
                tracing::warn!(
                    "JWT_SECRET not set, generating ephemeral signing secret. \
                     Issued tokens will not survive a restart."
                );
                let secret = Zeroizing::new(random_secret());
                TokenSigner::new(secret.as_bytes().to_vec(), self.token_ttl_secs)?
            }
        };
        Ok(signer)
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionManager>,
    pub listings: ListingService,
    pub sellers: SellerService,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the services over `store`.
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn PasswordHasher>,
        config: AppConfig,
    ) -> Result<Self, ConfigError> {
        let signer = Arc::new(config.signer()?);
        Ok(Self {
            sessions: Arc::new(SessionManager::new(Arc::clone(&store), hasher, signer)),
            listings: ListingService::new(Arc::clone(&store)),
            sellers: SellerService::new(Arc::clone(&store)),
            store,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.token_ttl_secs, 3600);
        assert_eq!(cfg.auth_rate_limit, RateLimitConfig::default());
        assert!(cfg.database_url.is_none());
        assert!(cfg.jwt_secret.is_none());
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn values_are_parsed() {
        let cfg = AppConfig::from_vars(vars(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://u:p@db/estate"),
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_SECS", "60"),
            ("AUTH_RATE_LIMIT_MAX", "5"),
            ("AUTH_RATE_LIMIT_WINDOW_SECS", "30"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.token_ttl_secs, 60);
        assert_eq!(cfg.auth_rate_limit.max_requests, 5);
        assert_eq!(cfg.auth_rate_limit.window_secs, 30);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.jwt_secret.as_deref().map(String::as_str), Some("s3cret"));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = AppConfig::from_vars(vars(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        let err = AppConfig::from_vars(vars(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert!(err.to_string().contains("LOG_FORMAT"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = AppConfig::from_vars(vars(&[
            ("DATABASE_URL", "postgres://u:hunter2@db/estate"),
            ("JWT_SECRET", "topsecret"),
        ]))
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("topsecret"));
    }

    #[test]
    fn unusable_ttl_is_rejected_by_signer() {
        for ttl in ["0", "100000000000000000", "18446744073709551615"] {
            let cfg = AppConfig::from_vars(vars(&[("TOKEN_TTL_SECS", ttl)])).unwrap();
            assert!(matches!(cfg.signer(), Err(ConfigError::Signer(_))), "ttl {ttl}");
        }
    }
}
