//! # Users API
//!
//! - `POST /api/users/register`: create an account (rate limited)
//! - `POST /api/users/login`: exchange credentials for a token (rate limited)
//! - `GET /api/users/me`: the caller's account and seller profile

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use estate_core::{validate_email, validate_name, AccountId, Role, SellerId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::auth::Session;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::CreatedResponse;
use crate::services::{Profile, Registration};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to register an account.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    /// At least 8 characters.
    pub password: String,
    /// Defaults to `buyer`.
    #[serde(default)]
    pub role: Option<Role>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name).map_err(|e| e.to_string())?;
        validate_email("email", &self.email).map_err(|e| e.to_string())?;
        validate_password(&self.password)
    }
}

/// Login credentials.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        validate_email("email", &self.email).map_err(|e| e.to_string())?;
        validate_password(&self.password)
    }
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password: must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

/// A signed session token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// The caller's account. Never includes the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Seller profile linked to this account, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<SellerId>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for AccountView {
    fn from(p: Profile) -> Self {
        Self {
            id: p.account.id,
            name: p.account.name,
            email: p.account.email,
            role: p.account.role,
            seller_id: p.seller_id,
            created_at: p.account.created_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Register and login. Mounted behind the credential rate limiter.
pub fn credentials_router() -> Router<AppState> {
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
}

/// Authenticated user routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/users/me", get(me))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /api/users/register: Create an account.
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = CreatedResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limited", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let id = state
        .sessions
        .register(Registration {
            name: req.name,
            email: req.email,
            password: Zeroizing::new(req.password),
            role: req.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.get() })))
}

/// POST /api/users/login: Exchange credentials for a session token.
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limited", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let token = state
        .sessions
        .authenticate(&req.email, Zeroizing::new(req.password))
        .await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /api/users/me: The caller's own account.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Caller's account", body = AccountView),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
async fn me(
    State(state): State<AppState>,
    Session(claim): Session,
) -> Result<Json<AccountView>, AppError> {
    let profile = state.sessions.profile(&claim).await?;
    Ok(Json(profile.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    #[test]
    fn register_rules() {
        assert!(register_req("Ana", "ana@test.com", "password123").validate().is_ok());
        assert!(register_req("A", "ana@test.com", "password123").validate().is_err());
        assert!(register_req("Ana", "ana.test.com", "password123").validate().is_err());
        assert!(register_req("Ana", "ana@test.com", "short").validate().is_err());
    }

    #[test]
    fn unknown_role_fails_to_deserialize() {
        let parsed: Result<RegisterRequest, _> = serde_json::from_str(
            r#"{"name":"Ana","email":"ana@test.com","password":"password123","role":"root"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let req = register_req("Ana", "ana@test.com", "password123");
        assert!(!format!("{req:?}").contains("password123"));
        let login = LoginRequest {
            email: "ana@test.com".into(),
            password: "password123".into(),
        };
        assert!(!format!("{login:?}").contains("password123"));
    }
}
