//! # estate-api: Axum API Service for Estate Listings
//!
//! Property listings owned by seller profiles, seller profiles optionally
//! linked to user accounts, and role-gated writes. Every listing write runs
//! through the consistency engine in [`services::listings`], which keeps
//! each seller's `listingCount` equal to its real number of listings.
//!
//! ## API Surface
//!
//! | Prefix            | Module                 | Domain                 |
//! |-------------------|------------------------|------------------------|
//! | `/api/users/*`    | [`routes::users`]      | Accounts and sessions  |
//! | `/api/sellers/*`  | [`routes::sellers`]    | Seller profiles        |
//! | `/api/listings/*` | [`routes::listings`]   | Listings               |
//! | `/metrics`        | [`middleware::metrics`]| Request counters       |
//! | `/openapi.json`   | [`openapi`]            | Generated API document |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → SessionMiddleware → Handler
//!                                → RateLimitMiddleware → register / login
//! ```
//!
//! Health probes (`/health/*`) are mounted outside the stack.

pub mod access;
pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(state.config.auth_rate_limit);

    // Register and login: throttled per client, no session needed.
    let credentials = routes::users::credentials_router()
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware));

    // Everything else resolves the bearer token first.
    let resources = Router::new()
        .merge(routes::users::router())
        .merge(routes::sellers::router())
        .merge(routes::listings::router())
        .merge(openapi::router())
        .route("/metrics", get(middleware::metrics::metrics_handler))
        .layer(from_fn(auth::session_middleware));

    let api = Router::new()
        .merge(credentials)
        .merge(resources)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(Arc::clone(&state.sessions)))
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}
