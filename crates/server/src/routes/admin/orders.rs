//! Order processing.

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use dronshop_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, MapNotFound, OrNotFound, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{OrderAdminOut, OrderSummary};
use crate::state::AppState;

const NOT_FOUND: &str = "Order not found";

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// Every order, newest first.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(orders))
}

pub async fn get(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderAdminOut>> {
    let (order, items) = OrderRepository::new(state.pool())
        .get(id)
        .await
        .or_not_found(NOT_FOUND)?;
    Ok(Json(OrderAdminOut::new(order, items)))
}

/// Move an order to another status. Any transition is allowed and stock is
/// left as it is.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<OrderAdminOut>> {
    let status: OrderStatus = query.status.parse().map_err(AppError::BadRequest)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo.set_status(id, status).await.map_not_found(NOT_FOUND)?;
    let items = repo.items(id).await?;

    info!(order_id = %id, status = %status, admin_id = %admin.id, "Order status changed");
    Ok(Json(OrderAdminOut::new(order, items)))
}
