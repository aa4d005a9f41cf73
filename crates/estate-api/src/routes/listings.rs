//! # Listings API
//!
//! - `GET /api/listings`: filtered, sorted page of listings
//! - `GET /api/listings/search?q=`: substring search over title and description
//! - `GET /api/listings/with-sellers`: listings joined with seller name and email
//! - `GET /api/listings/:id`: one listing
//! - `POST /api/listings`: create (admin, seller for its own profile)
//! - `PUT /api/listings/:id`: update (admin, owning seller)
//! - `DELETE /api/listings/:id`: delete (admin, owning seller)
//!
//! Every write goes through [`ListingService`](crate::services::ListingService),
//! which keeps each seller's `listingCount` in step with the listing table.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use estate_core::{
    DomainError, Listing, ListingId, ListingPatch, ListingQuery, ListingSort, ListingWithSeller,
    NewListing, SellerId, ValidationError, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::access::{require_admin_for, require_ownership_or_admin, require_role, WRITERS};
use crate::auth::Session;
use crate::error::AppError;
use crate::extractors::{extract_path, extract_validated_json, extract_validated_query, Validate};
use crate::routes::{validate_paging, CreatedResponse, ListingPage};
use crate::state::AppState;

const MIN_SEARCH_LEN: usize = 2;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a listing.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: String,
    /// Whole currency units, greater than zero.
    pub price: i64,
    pub description: String,
    pub rooms: i32,
    pub bathrooms: i32,
    pub parking: i32,
    pub seller_id: i64,
}

impl CreateListingRequest {
    fn to_new_listing(&self) -> Result<NewListing, ValidationError> {
        let new = NewListing {
            title: self.title.clone(),
            price: self.price,
            description: self.description.clone(),
            rooms: self.rooms,
            bathrooms: self.bathrooms,
            parking: self.parking,
            seller_id: SellerId::new(self.seller_id)?,
        };
        new.validate()?;
        Ok(new)
    }
}

impl Validate for CreateListingRequest {
    fn validate(&self) -> Result<(), String> {
        self.to_new_listing().map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Partial update of a listing. At least one field is required.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub rooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub parking: Option<i32>,
    /// Reassign to another seller. Admin only.
    pub seller_id: Option<i64>,
}

impl UpdateListingRequest {
    fn to_patch(&self) -> Result<ListingPatch, ValidationError> {
        let patch = ListingPatch {
            title: self.title.clone(),
            price: self.price,
            description: self.description.clone(),
            rooms: self.rooms,
            bathrooms: self.bathrooms,
            parking: self.parking,
            seller_id: self.seller_id.map(SellerId::new).transpose()?,
        };
        patch.validate()?;
        Ok(patch)
    }
}

impl Validate for UpdateListingRequest {
    fn validate(&self) -> Result<(), String> {
        let patch = self.to_patch().map_err(|e| e.to_string())?;
        if patch.is_empty() {
            return Err("at least one field must be provided".to_string());
        }
        Ok(())
    }
}

/// Listing filters and paging.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListingListParams {
    /// Only listings of this seller.
    pub seller_id: Option<i64>,
    /// Inclusive lower price bound.
    pub min_price: Option<i64>,
    /// Inclusive upper price bound.
    pub max_price: Option<i64>,
    /// `price|title|created_at:asc|desc`.
    pub sort: Option<String>,
    /// 1-based page, default 1.
    pub page: Option<u32>,
    /// Page size, default 10, at most 100.
    pub limit: Option<u32>,
}

impl ListingListParams {
    fn to_query(&self) -> Result<ListingQuery, String> {
        let positive = |name: &str, v: Option<i64>| match v {
            Some(v) if v <= 0 => Err(format!("{name} must be a positive number")),
            _ => Ok(v),
        };
        let seller_id = positive("sellerId", self.seller_id)?
            .map(SellerId::new)
            .transpose()
            .map_err(|e| e.to_string())?;
        let min_price = positive("minPrice", self.min_price)?;
        let max_price = positive("maxPrice", self.max_price)?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err("minPrice cannot be greater than maxPrice".to_string());
            }
        }
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<ListingSort>().map_err(|e| e.to_string())?),
        };
        validate_paging(self.page, self.limit)?;

        Ok(ListingQuery {
            seller_id,
            min_price,
            max_price,
            sort,
            page: self.page.unwrap_or(DEFAULT_PAGE),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

impl Validate for ListingListParams {
    fn validate(&self) -> Result<(), String> {
        self.to_query().map(|_| ())
    }
}

/// Search term.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// At least 2 characters after trimming.
    pub q: Option<String>,
}

impl SearchParams {
    fn term(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }
}

impl Validate for SearchParams {
    fn validate(&self) -> Result<(), String> {
        if self.term().chars().count() < MIN_SEARCH_LEN {
            return Err(format!(
                "q: search term must be at least {MIN_SEARCH_LEN} characters"
            ));
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the listings router. Static segments are matched before `:id`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/listings", get(list_listings).post(create_listing))
        .route("/api/listings/search", get(search_listings))
        .route("/api/listings/with-sellers", get(listings_with_sellers))
        .route(
            "/api/listings/:id",
            get(get_listing).put(update_listing).delete(delete_listing),
        )
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /api/listings: Filtered, sorted page of listings.
#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingListParams),
    responses(
        (status = 200, description = "Page of listings", body = ListingPage),
        (status = 422, description = "Invalid parameters", body = crate::error::ErrorBody),
    ),
    tag = "listings"
)]
async fn list_listings(
    State(state): State<AppState>,
    params: Result<Query<ListingListParams>, QueryRejection>,
) -> Result<Json<ListingPage>, AppError> {
    let query = extract_validated_query(params)?
        .to_query()
        .map_err(AppError::Validation)?;
    Ok(Json(state.listings.list(&query).await?.into()))
}

/// GET /api/listings/search: Case-insensitive substring search.
#[utoipa::path(
    get,
    path = "/api/listings/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching listings", body = Vec<Listing>),
        (status = 422, description = "Search term too short", body = crate::error::ErrorBody),
    ),
    tag = "listings"
)]
async fn search_listings(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let params = extract_validated_query(params)?;
    Ok(Json(state.listings.search(params.term()).await?))
}

/// GET /api/listings/with-sellers: Listings with seller name and email.
#[utoipa::path(
    get,
    path = "/api/listings/with-sellers",
    responses(
        (status = 200, description = "Listings joined with sellers", body = Vec<ListingWithSeller>),
    ),
    tag = "listings"
)]
async fn listings_with_sellers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListingWithSeller>>, AppError> {
    Ok(Json(state.listings.list_with_sellers().await?))
}

/// GET /api/listings/:id: One listing.
#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(("id" = i64, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing found", body = Listing),
        (status = 404, description = "Listing not found", body = crate::error::ErrorBody),
    ),
    tag = "listings"
)]
async fn get_listing(
    State(state): State<AppState>,
    id: Result<Path<ListingId>, PathRejection>,
) -> Result<Json<Listing>, AppError> {
    let id = extract_path(id)?;
    Ok(Json(state.listings.find_by_id(id).await?))
}

/// POST /api/listings: Create a listing and bump its seller's counter.
#[utoipa::path(
    post,
    path = "/api/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = CreatedResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Role not permitted or foreign seller", body = crate::error::ErrorBody),
        (status = 404, description = "Seller not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "listings"
)]
async fn create_listing(
    State(state): State<AppState>,
    session: Option<Session>,
    body: Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let claim = require_role(session.as_ref().map(|s| &s.0), WRITERS)?;
    let new = extract_validated_json(body)?.to_new_listing()?;
    if !claim.is_admin() && !claim.owns_seller(new.seller_id) {
        return Err(DomainError::forbidden(format!(
            "seller {} is not linked to this account",
            new.seller_id
        ))
        .into());
    }

    let id = state.listings.create(new).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.get() })))
}

/// PUT /api/listings/:id: Update a listing; reassignment moves one count.
#[utoipa::path(
    put,
    path = "/api/listings/{id}",
    params(("id" = i64, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 204, description = "Listing updated"),
        (status = 403, description = "Not the owner, or sellerId change by non-admin", body = crate::error::ErrorBody),
        (status = 404, description = "Listing or new seller not found", body = crate::error::ErrorBody),
        (status = 409, description = "Lost a race with a concurrent writer", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "listings"
)]
async fn update_listing(
    State(state): State<AppState>,
    session: Option<Session>,
    id: Result<Path<ListingId>, PathRejection>,
    body: Result<Json<UpdateListingRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let claim = require_role(session.as_ref().map(|s| &s.0), WRITERS)?;
    let id = extract_path(id)?;
    require_ownership_or_admin(state.store.as_ref(), claim, id).await?;
    let patch = extract_validated_json(body)?.to_patch()?;
    if patch.seller_id.is_some() {
        require_admin_for(claim, "sellerId")?;
    }

    state.listings.update_as(claim, id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/listings/:id: Delete a listing and decrement its seller's counter.
#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    params(("id" = i64, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Listing not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "listings"
)]
async fn delete_listing(
    State(state): State<AppState>,
    session: Option<Session>,
    id: Result<Path<ListingId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let claim = require_role(session.as_ref().map(|s| &s.0), WRITERS)?;
    let id = extract_path(id)?;
    require_ownership_or_admin(state.store.as_ref(), claim, id).await?;
    state.listings.remove_as(claim, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
