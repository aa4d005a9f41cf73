//! # Session Middleware
//!
//! Resolves the `Authorization: Bearer <jwt>` header into a [`Session`]
//! before any handler runs.
//!
//! - No header: the request continues anonymously. Public routes ignore
//!   the absence; gated routes reject it with `UNAUTHENTICATED`.
//! - A header that is not a bearer token, or a token that fails signature
//!   or expiry checks: rejected here with `INVALID_TOKEN`.
//! - A valid token: the resolved claim (seller id hydrated when needed) is
//!   inserted into request extensions.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use estate_core::{DomainError, SessionClaim};

use crate::error::AppError;
use crate::services::SessionManager;

/// Verified caller identity for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session(pub SessionClaim);

/// Rejects with 401 when the middleware found no token. Use
/// `Option<Session>` on routes that also serve anonymous callers.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Domain(DomainError::Unauthenticated))
    }
}

/// Pull the bearer token out of the `Authorization` header.
///
/// `Ok(None)` when the header is absent. A present header that is not a
/// well-formed bearer credential is an error.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Result<Option<&str>, DomainError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| DomainError::InvalidToken("authorization header is not ASCII".into()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(DomainError::InvalidToken(
            "expected 'Bearer <token>' authorization".into(),
        )),
    }
}

/// Resolve the bearer token, if any, into a [`Session`].
pub async fn session_middleware(mut request: Request, next: Next) -> Response {
    let Some(sessions) = request.extensions().get::<Arc<SessionManager>>().cloned() else {
        tracing::error!("session manager missing from request extensions");
        return AppError::Domain(DomainError::Internal("session manager not configured".into()))
            .into_response();
    };

    let token = match bearer_token(request.headers()) {
        Ok(Some(token)) => token.to_owned(),
        Ok(None) => return next.run(request).await,
        Err(err) => return AppError::from(err).into_response(),
    };

    match sessions.resolve(Some(&token)).await {
        Ok(claim) => {
            request.extensions_mut().insert(Session(claim));
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "rejected session token");
            AppError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn absent_header_is_anonymous() {
        assert_eq!(bearer_token(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok(Some("abc.def.ghi")));
    }

    #[test]
    fn other_schemes_are_invalid() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer ", "bearer abc", "abc"] {
            assert!(
                matches!(bearer_token(&headers(value)), Err(DomainError::InvalidToken(_))),
                "{value}"
            );
        }
    }
}
