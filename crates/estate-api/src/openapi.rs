//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Registers the `bearer` JWT scheme referenced by gated operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token from POST /api/users/login."))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Estate Listings API",
        version = "0.1.0",
        description = "Property listings and seller profiles with role-gated writes. \
                       Every listing write keeps its seller's listingCount exact.",
    ),
    paths(
        // Users
        crate::routes::users::register,
        crate::routes::users::login,
        crate::routes::users::me,
        // Sellers
        crate::routes::sellers::list_sellers,
        crate::routes::sellers::get_seller,
        crate::routes::sellers::create_seller,
        crate::routes::sellers::update_seller,
        crate::routes::sellers::delete_seller,
        // Listings
        crate::routes::listings::list_listings,
        crate::routes::listings::search_listings,
        crate::routes::listings::listings_with_sellers,
        crate::routes::listings::get_listing,
        crate::routes::listings::create_listing,
        crate::routes::listings::update_listing,
        crate::routes::listings::delete_listing,
        // Ops
        crate::middleware::metrics::metrics_handler,
    ),
    components(schemas(
        // Records
        estate_core::Listing,
        estate_core::ListingWithSeller,
        estate_core::Seller,
        estate_core::Role,
        estate_core::AccountId,
        estate_core::SellerId,
        estate_core::ListingId,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Shared responses
        crate::routes::CreatedResponse,
        crate::routes::ListingPage,
        crate::routes::SellerPage,
        // User DTOs
        crate::routes::users::RegisterRequest,
        crate::routes::users::LoginRequest,
        crate::routes::users::TokenResponse,
        crate::routes::users::AccountView,
        // Seller DTOs
        crate::routes::sellers::CreateSellerRequest,
        crate::routes::sellers::UpdateSellerRequest,
        // Listing DTOs
        crate::routes::listings::CreateListingRequest,
        crate::routes::listings::UpdateListingRequest,
        // Ops
        crate::middleware::metrics::MetricsSnapshot,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Registration, login and the caller's account"),
        (name = "sellers", description = "Seller profiles"),
        (name = "listings", description = "Property listings"),
        (name = "ops", description = "Operational counters"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let spec = ApiDoc::openapi();
        let paths = &spec.paths.paths;
        for path in [
            "/api/users/register",
            "/api/users/login",
            "/api/users/me",
            "/api/sellers",
            "/api/sellers/{id}",
            "/api/listings",
            "/api/listings/search",
            "/api/listings/with-sellers",
            "/api/listings/{id}",
            "/metrics",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("\"bearer\""));
        assert!(json.contains("JWT"));
    }
}
