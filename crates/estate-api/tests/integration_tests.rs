//! # Integration Tests for estate-api
//!
//! Drives the full router (session middleware, rate limiter, handlers and
//! the consistency engine) against the in-memory store: registration and
//! login, role and ownership gating, listing counter upkeep, query
//! validation, health probes and the OpenAPI document.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use zeroize::Zeroizing;

use estate_api::db::MemoryStore;
use estate_api::middleware::rate_limit::RateLimitConfig;
use estate_api::state::{AppConfig, AppState};
use estate_crypto::{Argon2Hasher, PasswordCost};

const PASSWORD: &str = "password123";

fn config() -> AppConfig {
    AppConfig {
        jwt_secret: Some(Zeroizing::new("integration-test-secret".to_string())),
        ..AppConfig::default()
    }
}

/// Helper: build the app over a fresh in-memory store.
fn test_app_with(config: AppConfig) -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    let hasher = Arc::new(Argon2Hasher::new(PasswordCost::minimal()).unwrap());
    let state = AppState::new(store, hasher, config).unwrap();
    estate_api::app(state)
}

fn test_app() -> axum::Router {
    test_app_with(config())
}

/// Helper: send a request, return status and JSON body (`Null` when the
/// body is empty or not JSON).
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn body_string(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

/// Register an account and log in; returns the token.
async fn register_and_login(app: &axum::Router, email: &str, role: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({"name": "Test User", "email": email, "password": PASSWORD, "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {email}");
    login(app, email).await
}

async fn login(app: &axum::Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({"email": email, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login {email}");
    body["token"].as_str().unwrap().to_string()
}

/// Create a seller profile as `token`; returns its id.
async fn create_seller(app: &axum::Router, token: &str, email: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/sellers",
        Some(token),
        Some(json!({"name": "Seller", "email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn create_listing(app: &axum::Router, token: &str, seller_id: i64, price: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/listings",
        Some(token),
        Some(listing_body(seller_id, price)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

fn listing_body(seller_id: i64, price: i64) -> Value {
    json!({
        "title": "Casa Parque",
        "price": price,
        "description": "Casa con patio y jardin",
        "rooms": 3,
        "bathrooms": 2,
        "parking": 1,
        "sellerId": seller_id
    })
}

async fn listing_count(app: &axum::Router, seller_id: i64) -> i64 {
    let uri = format!("/api/sellers/{seller_id}");
    let (status, body) = send(app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    body["listingCount"].as_i64().unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    assert_eq!(
        body_string(&app, "/health/liveness").await,
        (StatusCode::OK, "ok".to_string())
    );
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app();
    assert_eq!(
        body_string(&app, "/health/readiness").await,
        (StatusCode::OK, "ready".to_string())
    );
}

// -- Users ----------------------------------------------------------------------

#[tokio::test]
async fn test_register_login_and_me() {
    let app = test_app();
    let token = register_and_login(&app, "ana@test.com", "buyer").await;

    let (status, body) = send(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ana@test.com");
    assert_eq!(body["role"], "buyer");
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("sellerId").is_none());
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = test_app();
    register_and_login(&app, "ana@test.com", "buyer").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({"name": "Ana", "email": "ana@test.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = test_app();
    register_and_login(&app, "ana@test.com", "buyer").await;

    let (s1, b1) = send(
        &app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({"email": "ana@test.com", "password": "wrong-password"})),
    )
    .await;
    let (s2, b2) = send(
        &app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({"email": "nobody@test.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
    assert_eq!(error_code(&b1), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_register_validation_is_422() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({"name": "Ana", "email": "not-an-email", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/listings", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
}

#[tokio::test]
async fn test_token_from_another_secret_is_rejected() {
    let other = test_app_with(AppConfig {
        jwt_secret: Some(Zeroizing::new("some-other-secret".to_string())),
        ..AppConfig::default()
    });
    let foreign = register_and_login(&other, "ana@test.com", "buyer").await;

    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/users/me", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
}

// -- Rate Limiting ----------------------------------------------------------------

#[tokio::test]
async fn test_credential_routes_are_rate_limited_per_client() {
    let app = test_app_with(AppConfig {
        auth_rate_limit: RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
        },
        ..config()
    });

    let attempt = |client: &'static str| {
        let app = app.clone();
        async move {
            let request = Request::builder()
                .method("POST")
                .uri("/api/users/login")
                .header("content-type", "application/json")
                .header("x-forwarded-for", client)
                .body(Body::from(
                    json!({"email": "x@test.com", "password": PASSWORD}).to_string(),
                ))
                .unwrap();
            let response = app.oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap())
        }
    };

    assert_eq!(attempt("10.0.0.1").await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(attempt("10.0.0.1").await.0, StatusCode::UNAUTHORIZED);
    let (status, body) = attempt("10.0.0.1").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMITED");
    assert!(body["error"]["details"]["retryAfterSecs"].as_u64().unwrap() >= 1);

    assert_eq!(attempt("10.0.0.2").await.0, StatusCode::UNAUTHORIZED);

    // Reads are not throttled.
    for _ in 0..5 {
        assert_eq!(send(&app, "GET", "/api/listings", None, None).await.0, StatusCode::OK);
    }
}

// -- Sellers ----------------------------------------------------------------------

#[tokio::test]
async fn test_seller_profile_is_linked_to_its_creator() {
    let app = test_app();
    let token = register_and_login(&app, "x@test.com", "seller").await;
    let id = create_seller(&app, &token, "x-shop@test.com").await;

    let (_, me) = send(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(me["sellerId"], id);
    let (_, seller) = send(&app, "GET", &format!("/api/sellers/{id}"), None, None).await;
    assert_eq!(seller["accountId"], me["id"]);
    assert_eq!(seller["listingCount"], 0);
}

#[tokio::test]
async fn test_buyer_cannot_create_seller() {
    let app = test_app();
    let token = register_and_login(&app, "b@test.com", "buyer").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/sellers",
        Some(&token),
        Some(json!({"name": "Shop", "email": "shop@test.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
}

#[tokio::test]
async fn test_seller_with_listings_cannot_be_deleted() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    let seller = create_seller(&app, &admin, "shop@test.com").await;
    let listing = create_listing(&app, &admin, seller, 100_000).await;

    let uri = format!("/api/sellers/{seller}");
    let (status, _) = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let listing_uri = format!("/api/listings/{listing}");
    let (status, _) = send(&app, "DELETE", &listing_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_seller_list_is_paged_and_sorted() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    for name in ["Carla", "Ana", "Beto"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/sellers",
            Some(&admin),
            Some(json!({"name": name, "email": format!("{name}@test.com")})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", "/api/sellers?sort=name:desc&limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("Carla"), json!("Beto")]);

    let (status, _) = send(&app, "GET", "/api/sellers?sort=email:asc", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Listings: counter upkeep -------------------------------------------------------

#[tokio::test]
async fn test_create_for_missing_seller_is_404_and_counts_nothing() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    let seller = create_seller(&app, &admin, "shop@test.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/listings",
        Some(&admin),
        Some(listing_body(999, 100_000)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (_, page) = send(&app, "GET", "/api/listings", None, None).await;
    assert_eq!(page["total"], 0);
    assert_eq!(listing_count(&app, seller).await, 0);
}

#[tokio::test]
async fn test_reassignment_moves_exactly_one_count() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    let a = create_seller(&app, &admin, "a@test.com").await;
    let b = create_seller(&app, &admin, "b@test.com").await;
    let id = create_listing(&app, &admin, a, 100_000).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/listings/{id}"),
        Some(&admin),
        Some(json!({"sellerId": b})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(listing_count(&app, a).await, 0);
    assert_eq!(listing_count(&app, b).await, 1);

    // Reassigning to a missing seller changes nothing.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/listings/{id}"),
        Some(&admin),
        Some(json!({"sellerId": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(listing_count(&app, b).await, 1);
}

#[tokio::test]
async fn test_double_delete_decrements_once() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    let seller = create_seller(&app, &admin, "shop@test.com").await;
    let keep = create_listing(&app, &admin, seller, 100_000).await;
    let gone = create_listing(&app, &admin, seller, 200_000).await;
    assert_eq!(listing_count(&app, seller).await, 2);

    let uri = format!("/api/listings/{gone}");
    assert_eq!(send(&app, "DELETE", &uri, Some(&admin), None).await.0, StatusCode::NO_CONTENT);
    assert_eq!(send(&app, "DELETE", &uri, Some(&admin), None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(listing_count(&app, seller).await, 1);

    let (status, _) = send(&app, "GET", &format!("/api/listings/{keep}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

/// Seller X owns profile 7, seller Y owns profile 8. Y cannot touch X's
/// listing, admin can without moving counts, X deletes it.
#[tokio::test]
async fn test_ownership_scenario_for_sellers_seven_and_eight() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    for n in 1..=6 {
        create_seller(&app, &admin, &format!("filler{n}@test.com")).await;
    }
    let x = register_and_login(&app, "x@test.com", "seller").await;
    let y = register_and_login(&app, "y@test.com", "seller").await;
    assert_eq!(create_seller(&app, &x, "x-shop@test.com").await, 7);
    assert_eq!(create_seller(&app, &y, "y-shop@test.com").await, 8);

    // Tokens were issued before the profiles existed; the seller id is
    // hydrated on each request.
    let listing = create_listing(&app, &x, 7, 150_000).await;
    assert_eq!(listing_count(&app, 7).await, 1);

    let uri = format!("/api/listings/{listing}");
    let (status, body) = send(&app, "PUT", &uri, Some(&y), Some(json!({"price": 160_000}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");

    let (status, _) = send(&app, "PUT", &uri, Some(&admin), Some(json!({"price": 160_000}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, updated) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(updated["price"], 160_000);
    assert_eq!(listing_count(&app, 7).await, 1);
    assert_eq!(listing_count(&app, 8).await, 0);

    assert_eq!(send(&app, "DELETE", &uri, Some(&y), None).await.0, StatusCode::FORBIDDEN);
    assert_eq!(send(&app, "DELETE", &uri, Some(&x), None).await.0, StatusCode::NO_CONTENT);
    assert_eq!(listing_count(&app, 7).await, 0);
}

#[tokio::test]
async fn test_seller_cannot_list_for_another_seller_or_reassign() {
    let app = test_app();
    let x = register_and_login(&app, "x@test.com", "seller").await;
    let y = register_and_login(&app, "y@test.com", "seller").await;
    let xs = create_seller(&app, &x, "x-shop@test.com").await;
    let ys = create_seller(&app, &y, "y-shop@test.com").await;

    let body = listing_body(ys, 1_000);
    let (status, _) = send(&app, "POST", "/api/listings", Some(&x), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = create_listing(&app, &x, xs, 1_000).await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/listings/{id}"),
        Some(&x),
        Some(json!({"sellerId": ys})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(listing_count(&app, xs).await, 1);
    assert_eq!(listing_count(&app, ys).await, 0);
}

#[tokio::test]
async fn test_buyer_and_anonymous_cannot_write_listings() {
    let app = test_app();
    let buyer = register_and_login(&app, "b@test.com", "buyer").await;

    let body = listing_body(1, 1_000);
    let (status, body) = send(&app, "POST", "/api/listings", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");

    let body = listing_body(1, 1_000);
    let (status, _) = send(&app, "POST", "/api/listings", Some(&buyer), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Listings: reads and validation -----------------------------------------------

#[tokio::test]
async fn test_list_filters_sort_and_pages() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    let a = create_seller(&app, &admin, "a@test.com").await;
    let b = create_seller(&app, &admin, "b@test.com").await;
    for price in [100, 300, 200] {
        create_listing(&app, &admin, a, price).await;
    }
    create_listing(&app, &admin, b, 250).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/listings?sellerId={a}&minPrice=150&sort=price:desc"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let prices: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["price"].as_i64().unwrap())
        .collect();
    assert_eq!(prices, vec![300, 200]);
    assert_eq!(body["total"], 2);

    let (_, body) = send(&app, "GET", "/api/listings?page=2&limit=3", None, None).await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["page"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_query_validation() {
    let app = test_app();
    for uri in [
        "/api/listings?minPrice=500&maxPrice=100",
        "/api/listings?sort=rooms:asc",
        "/api/listings?limit=101",
        "/api/listings?page=0",
        "/api/listings?sellerId=-1",
    ] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(error_code(&body), "VALIDATION_ERROR");
    }

    let (status, _) = send(&app, "GET", "/api/listings?limit=ten", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_and_with_sellers() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;
    let seller = create_seller(&app, &admin, "shop@test.com").await;
    create_listing(&app, &admin, seller, 100_000).await;

    let uri = "/api/listings/search?q=%20PARQUE%20";
    let (status, hits) = send(&app, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/api/listings/search?q=a", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, joined) = send(&app, "GET", "/api/listings/with-sellers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined[0]["sellerEmail"], "shop@test.com");
    assert_eq!(joined[0]["sellerId"], seller);
}

#[tokio::test]
async fn test_bad_ids_and_bodies() {
    let app = test_app();
    let admin = register_and_login(&app, "admin@test.com", "admin").await;

    let (status, _) = send(&app, "GET", "/api/listings/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "GET", "/api/listings/0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "GET", "/api/listings/42", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let seller = create_seller(&app, &admin, "shop@test.com").await;
    let mut bad = listing_body(seller, 100);
    bad["title"] = json!("A");
    let (status, _) = send(&app, "POST", "/api/listings", Some(&admin), Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let id = create_listing(&app, &admin, seller, 100).await;
    let uri = format!("/api/listings/{id}");
    let (status, _) = send(&app, "PUT", &uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Ops ----------------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_json_is_served() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/listings/{id}"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());
}

#[tokio::test]
async fn test_metrics_count_client_errors() {
    let app = test_app();
    send(&app, "GET", "/api/listings", None, None).await;
    send(&app, "GET", "/api/listings/42", None, None).await;

    let (status, body) = send(&app, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["requests"].as_u64().unwrap() >= 2);
    assert_eq!(body["clientErrors"], 1);
    assert_eq!(body["serverErrors"], 0);
}
