//! In-process router tests that never reach the database.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use dronshop_core::roles;
use dronshop_integration_tests::{bearer, json_request, send, test_app, test_config};
use dronshop_server::config::LimitRule;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_is_ok_without_database() {
    let (app, _) = test_app(test_config());
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let (app, _) = test_app(test_config());
    let (status, _) = send(&app, get("/api/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _) = test_app(test_config());
    let (status, _) = send(&app, get("/api/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Authentication and roles
// ============================================================================

#[tokio::test]
async fn test_me_requires_token() {
    let (app, _) = test_app(test_config());
    let (status, body) = send(&app, get("/api/auth/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let (app, _) = test_app(test_config());
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token");
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate_requests() {
    let (app, state) = test_app(test_config());
    let pair = state
        .tokens()
        .issue_pair(dronshop_core::UserId::new(5), &[roles::BUYER.to_string()])
        .unwrap();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", pair.refresh_token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token type");
}

#[tokio::test]
async fn test_buyer_is_forbidden_from_admin_routes() {
    let (app, state) = test_app(test_config());
    let token = bearer(&state, 7, &[roles::BUYER]);

    for uri in [
        "/api/admin/users",
        "/api/admin/orders",
        "/api/admin/inventory",
        "/api/settings",
    ] {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, &token)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["detail"], "Forbidden");
    }
}

#[tokio::test]
async fn test_admin_routes_without_token_are_401() {
    let (app, _) = test_app(test_config());
    let (status, _) = send(&app, get("/api/admin/categories")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_validation_runs_before_database() {
    let (app, state) = test_app(test_config());
    let token = bearer(&state, 1, &[roles::ADMIN]);

    let mut request = json_request(
        "POST",
        "/api/admin/inventory/bulk-update",
        &json!({ "action": "add", "quantity": -4 }),
    );
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, token.parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "quantity cannot be negative");

    let request = Request::builder()
        .method("PATCH")
        .uri("/api/admin/users/3?action=promote")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Unsupported action");

    let request = Request::builder()
        .method("PATCH")
        .uri("/api/admin/orders/3?status=lost")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dev_login_hidden_when_disabled() {
    let (app, _) = test_app(test_config());
    let request = json_request(
        "POST",
        "/api/auth/dev-login",
        &json!({ "login": "admin", "password": "admin" }),
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// SMS codes
// ============================================================================

#[tokio::test]
async fn test_request_code_echoes_code_only_in_dev_mode() {
    let mut config = test_config();
    config.dev_login_enabled = true;
    let (app, _) = test_app(config);
    let request = json_request("POST", "/api/auth/request-code", &json!({ "phone": "+7 999 000-11-22" }));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], true);
    assert_eq!(body["debugCode"].as_str().unwrap().len(), 6);

    let (app, _) = test_app(test_config());
    let request = json_request("POST", "/api/auth/request-code", &json!({ "phone": "+79990001122" }));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("debugCode").is_none());
}

#[tokio::test]
async fn test_request_code_rejects_bad_phone() {
    let (app, _) = test_app(test_config());
    let request = json_request("POST", "/api/auth/request-code", &json!({ "phone": "12" }));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid phone"));
}

// ============================================================================
// Catalog and checkout validation
// ============================================================================

#[tokio::test]
async fn test_products_paging_validation() {
    let (app, _) = test_app(test_config());
    for uri in [
        "/api/products?page=0",
        "/api/products?page_size=500",
        "/api/products?price_min=-10",
        "/api/products?sort=rating",
    ] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["detail"].is_string());
    }
}

#[tokio::test]
async fn test_empty_cart_rejected() {
    let (app, _) = test_app(test_config());
    let request = json_request(
        "POST",
        "/api/orders",
        &json!({
            "items": [],
            "customer": {"email": "a@b.io", "firstName": "A", "lastName": "B", "phone": "+70000000009"},
            "shipping": {"method": "pickup"},
            "payment": {"method": "cash"}
        }),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Cart is empty");
}

#[tokio::test]
async fn test_malformed_json_uses_detail_shape() {
    let (app, _) = test_app(test_config());
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_review_rating_validated() {
    let (app, _) = test_app(test_config());
    let request = json_request(
        "POST",
        "/api/products/1/reviews",
        &json!({"name": "A", "email": "a@b.io", "title": "t", "content": "c", "rating": 9}),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Rating must be between 1 and 5");
}

// ============================================================================
// Middleware
// ============================================================================

#[tokio::test]
async fn test_auth_rate_limit_returns_429_with_retry_after() {
    let mut config = test_config();
    config.rate_limits.auth = LimitRule::per_minute(2);
    let (app, _) = test_app(config);

    for _ in 0..2 {
        let request = json_request("POST", "/api/auth/request-code", &json!({ "phone": "1" }));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let request = json_request("POST", "/api/auth/request-code", &json!({ "phone": "1" }));
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    // Other classes keep their own budget
    let (status, _) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let mut config = test_config();
    config.rate_limits.general = LimitRule::per_minute(1);
    let (app, _) = test_app(config);

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app, from("10.0.0.1")).await.0, StatusCode::OK);
    assert_eq!(send(&app, from("10.0.0.1")).await.0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(send(&app, from("10.0.0.2")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_round_trip() {
    let (app, _) = test_app(test_config());

    let request = Request::builder()
        .uri("/api/health")
        .header("x-request-id", "upstream-42")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "upstream-42");

    let response = tower::ServiceExt::oneshot(app, get("/api/health")).await.unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let (app, _) = test_app(test_config());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/products")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn test_uploads_served_from_media_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("products/3")).unwrap();
    std::fs::write(dir.path().join("products/3/a.png"), b"png-bytes").unwrap();

    let mut config = test_config();
    config.uploads_dir = dir.path().to_path_buf();
    let (app, _) = test_app(config);

    let response = tower::ServiceExt::oneshot(app.clone(), get("/uploads/products/3/a.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"png-bytes");

    let (status, _) = send(&app, get("/uploads/products/3/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
