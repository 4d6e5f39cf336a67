//! Integration tests for Dronshop.
//!
//! Router tests drive [`dronshop_server::routes::app`] in-process with
//! `tower::ServiceExt::oneshot`. The pool is created lazily and never
//! connects, so every request used here must be answered before a query
//! runs (auth checks, validation, rate limits, static files).
//!
//! Tests marked `#[ignore]` need a migrated `PostgreSQL` database:
//!
//! ```bash
//! DRONSHOP_TEST_DATABASE_URL=postgres://localhost/dronshop_test \
//!     cargo test -p dronshop-integration-tests -- --ignored
//! ```

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use dronshop_core::UserId;
use dronshop_server::config::ApiConfig;
use dronshop_server::routes;
use dronshop_server::state::AppState;

/// Signing secret used by every test config.
pub const TEST_SECRET: &str = "k3Yq9vT2mX8pL4wN7rB1cZ6hJ5sD0fGaE2uV9yQ";

const LAZY_DATABASE_URL: &str = "postgres://dronshop@127.0.0.1:1/dronshop_unreachable";

/// Defaults suitable for tests: no dev mode, uploads in the current dir.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig::with_defaults(
        SecretString::from(LAZY_DATABASE_URL),
        SecretString::from(TEST_SECRET),
    )
}

/// A pool that only fails once something actually queries it.
///
/// # Panics
///
/// Panics if the URL cannot be parsed.
#[must_use]
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy(LAZY_DATABASE_URL)
        .expect("lazy pool")
}

/// Full application router over a lazy pool.
#[must_use]
pub fn test_app(config: ApiConfig) -> (Router, AppState) {
    let state = AppState::new(config, lazy_pool());
    (routes::app(state.clone()), state)
}

/// `Authorization` header value for an access token with `roles`.
///
/// # Panics
///
/// Panics if signing fails.
#[must_use]
pub fn bearer(state: &AppState, user_id: i32, roles: &[&str]) -> String {
    let roles: Vec<String> = roles.iter().map(|r| (*r).to_string()).collect();
    let pair = state
        .tokens()
        .issue_pair(UserId::new(user_id), &roles)
        .expect("issue tokens");
    format!("Bearer {}", pair.access_token)
}

/// Send one request and return the status plus the JSON body (`Null` when
/// the body is empty or not JSON).
///
/// # Panics
///
/// Panics if the router fails or the body cannot be read.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// JSON request helper.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}
