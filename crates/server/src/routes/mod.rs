//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                        - Liveness
//! GET  /api/health/ready                  - Readiness (database)
//!
//! # Auth
//! POST /api/auth/request-code             - Send a verification code
//! POST /api/auth/register                 - Phone + code, creates buyer
//! POST /api/auth/login                    - Phone + code
//! POST /api/auth/refresh                  - Exchange a refresh token
//! GET  /api/auth/me                       - Current profile
//! POST /api/auth/register-password        - Phone or email + password
//! POST /api/auth/login-password           - Phone or email + password
//! POST /api/auth/dev-login                - Fixed dev accounts (dev mode only)
//!
//! # Catalog
//! GET  /api/products                      - Filtered, paginated listing
//! GET  /api/products/{id}                 - Active product
//! GET  /api/categories                    - Cached category list
//! GET  /api/products/{id}/reviews         - Approved reviews
//! POST /api/products/{id}/reviews         - Submit a review
//! POST /api/reviews/{id}/helpful          - Helpful vote
//!
//! # Orders
//! POST /api/orders                        - Checkout
//! GET  /api/orders                        - Own orders
//!
//! # Settings & content
//! GET  /api/settings/public               - Public settings map
//! *    /api/settings[/...]                - Settings CRUD (admin)
//! GET  /api/content/hero, /promo          - Static home page blocks
//!
//! # Admin (role `admin`)
//! /api/admin/{categories,products,inventory,users,orders,reviews}
//!
//! # Files
//! GET  /uploads/*                         - Uploaded images
//! ```

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod content;
pub mod health;
pub mod orders;
pub mod reviews;
pub mod settings;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::{Span, warn};

use crate::middleware::{rate_limit_middleware, request_id_middleware};
use crate::state::AppState;

/// `{"success": true}` body for mutations without a payload.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub const OK: Self = Self { success: true };
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request-code", post(auth::request_code))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
        .route("/register-password", post(auth::register_password))
        .route("/login-password", post(auth::login_password))
        .route("/dev-login", post(auth::dev_login))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/{id}", get(catalog::get_product))
        .route(
            "/products/{id}/reviews",
            get(reviews::list_for_product).post(reviews::create),
        )
        .route("/reviews/{id}/helpful", post(reviews::helpful))
        .route("/categories", get(catalog::list_categories))
}

pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::my_orders).post(orders::create))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(settings::list).post(settings::create))
        .route("/public", get(settings::public))
        .route("/batch", post(settings::batch))
        .route(
            "/{key}",
            get(settings::get).put(settings::update).delete(settings::delete),
        )
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/hero", get(content::hero))
        .route("/promo", get(content::promo))
}

/// Every `/api` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/orders", order_routes())
        .nest("/settings", settings_routes())
        .nest("/content", content_routes())
        .nest("/admin", admin::routes())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

/// The complete application: routes, static uploads and the middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);
    let uploads = ServeDir::new(state.media().root());

    Router::new()
        .nest("/api", api_routes())
        .nest_service("/uploads", uploads)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}
