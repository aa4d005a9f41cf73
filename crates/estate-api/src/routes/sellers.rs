//! # Sellers API
//!
//! - `GET /api/sellers`: page of sellers sorted by name
//! - `GET /api/sellers/:id`: one seller
//! - `POST /api/sellers`: create a profile (admin, seller)
//! - `PUT /api/sellers/:id`: update a profile (admin, owning seller)
//! - `DELETE /api/sellers/:id`: delete a profile without listings (admin)
//!
//! A seller creating a profile is always linked to its own account. Only
//! an admin may set or change `accountId`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use estate_core::{
    validate_email, validate_name, AccountId, DomainError, NewSeller, Role, Seller, SellerId,
    SellerPatch, SellerQuery, SortOrder, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::access::{require_admin_for, require_role, require_seller_scope, WRITERS};
use crate::auth::Session;
use crate::error::AppError;
use crate::extractors::{extract_path, extract_validated_json, extract_validated_query, Validate};
use crate::routes::{validate_paging, CreatedResponse, SellerPage};
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a seller profile.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSellerRequest {
    pub name: String,
    pub email: String,
    /// Account to link. Admin only; a seller is linked to itself.
    #[serde(default, alias = "userId")]
    pub account_id: Option<AccountId>,
}

impl Validate for CreateSellerRequest {
    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name).map_err(|e| e.to_string())?;
        validate_email("email", &self.email).map_err(|e| e.to_string())
    }
}

/// Partial update of a seller profile. At least one field is required.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSellerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// New account link. Admin only.
    #[serde(default, alias = "userId")]
    pub account_id: Option<AccountId>,
}

impl UpdateSellerRequest {
    fn into_patch(self) -> SellerPatch {
        SellerPatch {
            name: self.name,
            email: self.email,
            account_id: self.account_id,
        }
    }
}

impl Validate for UpdateSellerRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_none() && self.email.is_none() && self.account_id.is_none() {
            return Err("at least one field must be provided".to_string());
        }
        if let Some(name) = &self.name {
            validate_name("name", name).map_err(|e| e.to_string())?;
        }
        if let Some(email) = &self.email {
            validate_email("email", email).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Seller list parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SellerListParams {
    /// `name:asc` (default) or `name:desc`.
    pub sort: Option<String>,
    /// 1-based page, default 1.
    pub page: Option<u32>,
    /// Page size, default 10, at most 100.
    pub limit: Option<u32>,
}

impl SellerListParams {
    fn order(&self) -> Result<SortOrder, String> {
        match self.sort.as_deref().map(str::trim) {
            None | Some("") => Ok(SortOrder::Asc),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "name" | "name:asc" => Ok(SortOrder::Asc),
                "name:desc" => Ok(SortOrder::Desc),
                _ => Err(format!("invalid sort \"{raw}\" (expected name:asc or name:desc)")),
            },
        }
    }

    fn into_query(self) -> Result<SellerQuery, String> {
        Ok(SellerQuery {
            order: self.order()?,
            page: self.page.unwrap_or(DEFAULT_PAGE),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

impl Validate for SellerListParams {
    fn validate(&self) -> Result<(), String> {
        self.order()?;
        validate_paging(self.page, self.limit)
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the sellers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sellers", get(list_sellers).post(create_seller))
        .route(
            "/api/sellers/:id",
            get(get_seller).put(update_seller).delete(delete_seller),
        )
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /api/sellers: Page of sellers sorted by name.
#[utoipa::path(
    get,
    path = "/api/sellers",
    params(SellerListParams),
    responses(
        (status = 200, description = "Page of sellers", body = SellerPage),
        (status = 422, description = "Invalid parameters", body = crate::error::ErrorBody),
    ),
    tag = "sellers"
)]
async fn list_sellers(
    State(state): State<AppState>,
    params: Result<Query<SellerListParams>, QueryRejection>,
) -> Result<Json<SellerPage>, AppError> {
    let query = extract_validated_query(params)?
        .into_query()
        .map_err(AppError::Validation)?;
    let page = state.sellers.list(&query).await?;
    Ok(Json(page.into()))
}

/// GET /api/sellers/:id: One seller.
#[utoipa::path(
    get,
    path = "/api/sellers/{id}",
    params(("id" = i64, Path, description = "Seller ID")),
    responses(
        (status = 200, description = "Seller found", body = Seller),
        (status = 404, description = "Seller not found", body = crate::error::ErrorBody),
    ),
    tag = "sellers"
)]
async fn get_seller(
    State(state): State<AppState>,
    id: Result<Path<SellerId>, PathRejection>,
) -> Result<Json<Seller>, AppError> {
    let id = extract_path(id)?;
    Ok(Json(state.sellers.get(id).await?))
}

/// POST /api/sellers: Create a seller profile.
#[utoipa::path(
    post,
    path = "/api/sellers",
    request_body = CreateSellerRequest,
    responses(
        (status = 201, description = "Seller created", body = CreatedResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Role not permitted", body = crate::error::ErrorBody),
        (status = 409, description = "Email or account already used", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "sellers"
)]
async fn create_seller(
    State(state): State<AppState>,
    session: Option<Session>,
    body: Result<Json<CreateSellerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let claim = require_role(session.as_ref().map(|s| &s.0), WRITERS)?;
    let req = extract_validated_json(body)?;

    let account_id = if claim.is_admin() {
        req.account_id
    } else {
        match req.account_id {
            Some(other) if other != claim.account_id => {
                return Err(DomainError::forbidden(format!(
                    "only an admin may link a profile to account {other}"
                ))
                .into());
            }
            _ => Some(claim.account_id),
        }
    };

    let id = state
        .sellers
        .create(NewSeller {
            name: req.name,
            email: req.email,
            account_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.get() })))
}

/// PUT /api/sellers/:id: Update a seller profile.
#[utoipa::path(
    put,
    path = "/api/sellers/{id}",
    params(("id" = i64, Path, description = "Seller ID")),
    request_body = UpdateSellerRequest,
    responses(
        (status = 204, description = "Seller updated"),
        (status = 403, description = "Not the owner, or accountId change by non-admin", body = crate::error::ErrorBody),
        (status = 404, description = "Seller not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "sellers"
)]
async fn update_seller(
    State(state): State<AppState>,
    session: Option<Session>,
    id: Result<Path<SellerId>, PathRejection>,
    body: Result<Json<UpdateSellerRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let claim = require_role(session.as_ref().map(|s| &s.0), WRITERS)?;
    let id = extract_path(id)?;
    require_seller_scope(claim, id)?;
    let req = extract_validated_json(body)?;
    if req.account_id.is_some() {
        require_admin_for(claim, "accountId")?;
    }

    state.sellers.update(id, req.into_patch()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/sellers/:id: Delete a seller that has no listings.
#[utoipa::path(
    delete,
    path = "/api/sellers/{id}",
    params(("id" = i64, Path, description = "Seller ID")),
    responses(
        (status = 204, description = "Seller deleted"),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
        (status = 404, description = "Seller not found", body = crate::error::ErrorBody),
        (status = 409, description = "Seller still has listings", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "sellers"
)]
async fn delete_seller(
    State(state): State<AppState>,
    session: Option<Session>,
    id: Result<Path<SellerId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    require_role(session.as_ref().map(|s| &s.0), &[Role::Admin])?;
    let id = extract_path(id)?;
    state.sellers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
