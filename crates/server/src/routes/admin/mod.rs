//! Admin API (`/api/admin`). Every handler requires the `admin` role.
//!
//! ```text
//! GET/POST         /categories
//! GET/PUT/DELETE   /categories/{id}
//! GET/POST         /products
//! GET/PUT/DELETE   /products/{id}
//! POST             /products/{id}/upload-image
//! DELETE           /products/{id}/images/{image_id}
//! GET              /inventory
//! PUT              /inventory/{product_id}
//! POST             /inventory/bulk-update
//! GET              /users
//! PATCH/DELETE     /users/{id}
//! GET              /orders
//! GET/PATCH        /orders/{id}
//! GET              /reviews
//! PUT/DELETE       /reviews/{id}
//! POST             /reviews/{id}/approve, /reviews/{id}/reject
//! ```

pub mod categories;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
};

use crate::state::AppState;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Categories
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        // Products
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route(
            "/products/{id}/upload-image",
            post(products::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/products/{id}/images/{image_id}",
            delete(products::delete_image),
        )
        // Inventory
        .route("/inventory", get(inventory::list))
        .route("/inventory/bulk-update", post(inventory::bulk_update))
        .route("/inventory/{product_id}", put(inventory::update))
        // Users
        .route("/users", get(users::list))
        .route("/users/{id}", patch(users::update).delete(users::delete))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::get).patch(orders::update_status))
        // Reviews
        .route("/reviews", get(reviews::list))
        .route("/reviews/{id}", put(reviews::update).delete(reviews::delete))
        .route("/reviews/{id}/approve", post(reviews::approve))
        .route("/reviews/{id}/reject", post(reviews::reject))
}
