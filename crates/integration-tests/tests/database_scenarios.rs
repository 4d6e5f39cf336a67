//! End-to-end flows against a real database.
//!
//! Ignored by default; run with `DRONSHOP_TEST_DATABASE_URL` set (see the
//! crate docs). Tests share one database, so every row they create carries a
//! unique name and assertions only look at those rows.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use sqlx::PgPool;

use dronshop_core::roles;
use dronshop_integration_tests::{bearer, json_request, send, test_config};
use dronshop_server::db;
use dronshop_server::routes;
use dronshop_server::services::auth::TokenKind;
use dronshop_server::state::AppState;

async fn db_app() -> (Router, AppState) {
    let url = std::env::var("DRONSHOP_TEST_DATABASE_URL")
        .expect("DRONSHOP_TEST_DATABASE_URL must be set for ignored tests");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../server/migrations").run(&pool).await.unwrap();
    db::bootstrap::run(&pool, false).await.unwrap();

    let state = AppState::new(test_config(), pool);
    (routes::app(state.clone()), state)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn with_auth(mut request: Request<Body>, authorization: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("authorization", authorization.parse().unwrap());
    request
}

/// Admin client for setting up catalog rows over HTTP.
struct Admin<'a> {
    app: &'a Router,
    authorization: String,
}

impl<'a> Admin<'a> {
    fn new(app: &'a Router, state: &AppState) -> Self {
        Self {
            app,
            authorization: bearer(state, 1, &[roles::BUYER, roles::ADMIN]),
        }
    }

    async fn call(&self, method: &str, uri: &str, body: &Value) -> Value {
        let (status, body) = send(
            self.app,
            with_auth(json_request(method, uri, body), &self.authorization),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{method} {uri}: {body}");
        body
    }

    async fn category(&self, slug: &str) -> Value {
        self.call(
            "POST",
            "/api/admin/categories",
            &json!({"slug": slug, "name": slug}),
        )
        .await["id"]
            .clone()
    }

    async fn product(&self, category_id: &Value, price: i64, active: bool) -> Value {
        self.call(
            "POST",
            "/api/admin/products",
            &json!({
                "name": unique("Drone"),
                "price": price,
                "category_id": category_id,
                "active": active
            }),
        )
        .await["id"]
            .clone()
    }

    async fn set_stock(&self, product_id: &Value, current_stock: i32) -> Value {
        self.call(
            "PUT",
            &format!("/api/admin/inventory/{product_id}"),
            &json!({"current_stock": current_stock}),
        )
        .await
    }
}

fn checkout_body(email: &str, lines: &[(&Value, i32)]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(product_id, quantity)| {
            json!({"productId": product_id, "quantity": quantity, "price": 1})
        })
        .collect();
    json!({
        "items": items,
        "customer": {
            "email": email,
            "firstName": "Ann",
            "lastName": "Lee",
            "phone": "+79990000001"
        },
        "shipping": {"method": "pickup", "address": ""},
        "payment": {"method": "cash"}
    })
}

async fn checkout(app: &Router, email: &str, lines: &[(&Value, i32)]) -> (StatusCode, Value) {
    send(
        app,
        json_request("POST", "/api/orders", &checkout_body(email, lines)),
    )
    .await
}

/// Orders placed with `email`, and items referencing any of `products`.
async fn row_counts(pool: &PgPool, email: &str, products: &[&Value]) -> (i64, i64) {
    let ids: Vec<i32> = products
        .iter()
        .map(|id| i32::try_from(id.as_i64().unwrap()).unwrap())
        .collect();
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap();
    let items: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE product_id = ANY($1)")
            .bind(&ids)
            .fetch_one(pool)
            .await
            .unwrap();
    (orders, items)
}

async fn current_stock(pool: &PgPool, product_id: &Value) -> i32 {
    sqlx::query_scalar("SELECT current_stock FROM inventory WHERE product_id = $1")
        .bind(i32::try_from(product_id.as_i64().unwrap()).unwrap())
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_two_drones_at_one_thousand() {
    let (app, state) = db_app().await;
    let admin = Admin::new(&app, &state);

    let drones = admin.category(&unique("drones")).await;
    let product_id = admin.product(&drones, 1000, true).await;
    admin.set_stock(&product_id, 5).await;

    let email = format!("{}@example.com", unique("buyer"));
    let (status, order) = checkout(&app, &email, &[(&product_id, 2)]).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["totalAmount"], 2000);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["productId"], product_id);
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["items"][0]["unitPrice"], 1000);
    assert_eq!(order["items"][0]["totalPrice"], 2000);
    assert_eq!(current_stock(state.pool(), &product_id).await, 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_checkout_uses_server_price_and_decrements_stock() {
    let (app, state) = db_app().await;
    let admin = Admin::new(&app, &state);

    let category = admin.category(&unique("fpv")).await;
    let product_id = admin.product(&category, 12_500, true).await;
    let stock = admin.set_stock(&product_id, 3).await;
    assert_eq!(stock["availableStock"], 3);

    let email = format!("{}@example.com", unique("buyer"));
    let (status, order) = checkout(&app, &email, &[(&product_id, 2)]).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["totalAmount"], 25_000);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"][0]["quantity"], 2);

    // Only one left
    let (status, body) = checkout(&app, &email, &[(&product_id, 2)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Not enough stock"));

    let inventory = admin.call("GET", "/api/admin/inventory", &Value::Null).await;
    let row = inventory
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["productId"] == product_id)
        .unwrap();
    assert_eq!(row["currentStock"], 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_rejected_checkout_leaves_no_rows() {
    let (app, state) = db_app().await;
    let admin = Admin::new(&app, &state);

    let category = admin.category(&unique("spares")).await;
    let inactive = admin.product(&category, 500, false).await;
    admin.set_stock(&inactive, 10).await;
    let plenty = admin.product(&category, 700, true).await;
    admin.set_stock(&plenty, 10).await;
    let scarce = admin.product(&category, 900, true).await;
    admin.set_stock(&scarce, 1).await;

    let email = format!("{}@example.com", unique("rejected"));
    let products = [&inactive, &plenty, &scarce];
    assert_eq!(row_counts(state.pool(), &email, &products).await, (0, 0));

    let (status, body) = checkout(&app, &email, &[(&inactive, 1)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["detail"].as_str().unwrap().contains("unavailable"));

    // First line fits, second does not.
    let (status, body) = checkout(&app, &email, &[(&plenty, 2), (&scarce, 3)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["detail"].as_str().unwrap().contains("Not enough stock"));

    assert_eq!(row_counts(state.pool(), &email, &products).await, (0, 0));
    assert_eq!(current_stock(state.pool(), &inactive).await, 10);
    assert_eq!(current_stock(state.pool(), &plenty).await, 10);
    assert_eq!(current_stock(state.pool(), &scarce).await, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_blocked_user_cannot_sign_in() {
    let (app, state) = db_app().await;
    let email = format!("{}@example.com", unique("blocked"));

    let (status, tokens) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register-password",
            &json!({
                "contact_type": "email",
                "contact_value": email,
                "password": "correct-horse-42",
                "password_confirm": "correct-horse-42"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{tokens}");

    let claims = state
        .tokens()
        .verify(tokens["accessToken"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    let user_id = claims.user_id().unwrap();

    let admin = bearer(&state, 1, &[roles::ADMIN]);
    let (status, _) = send(
        &app,
        with_auth(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/admin/users/{user_id}?action=block"))
                .body(Body::empty())
                .unwrap(),
            &admin,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let login = json!({
        "contact_type": "email",
        "contact_value": email,
        "password": "correct-horse-42"
    });
    let (status, body) = send(&app, json_request("POST", "/api/auth/login-password", &login)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "User is blocked");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/refresh",
            &json!({"refreshToken": tokens["refreshToken"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
