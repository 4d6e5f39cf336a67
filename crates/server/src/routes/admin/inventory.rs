//! Stock levels.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use dronshop_core::{CategoryId, ProductId, StockAction};

use crate::db::InventoryRepository;
use crate::error::{AppError, MapNotFound, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::InventoryOut;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InventoryUpdateForm {
    pub current_stock: i32,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateForm {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub action: StockAction,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct InventoryUpdated {
    pub success: bool,
    #[serde(flatten)]
    pub inventory: InventoryOut,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdated {
    pub success: bool,
    pub updated_count: u64,
}

fn require_non_negative(value: i32, field: &str) -> Result<()> {
    if value < 0 {
        return Err(AppError::BadRequest(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Every product with its stock; products without a stock row show zeros.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<InventoryOut>>> {
    let rows = InventoryRepository::new(state.pool()).list().await?;
    Ok(Json(rows.into_iter().map(InventoryOut::from).collect()))
}

/// Set `current_stock` for one product.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
    Json(form): Json<InventoryUpdateForm>,
) -> Result<Json<InventoryUpdated>> {
    require_non_negative(form.current_stock, "current_stock")?;

    let row = InventoryRepository::new(state.pool())
        .set_stock(product_id, form.current_stock)
        .await
        .map_not_found("Product not found")?;

    info!(product_id = %product_id, current_stock = row.current_stock, admin_id = %admin.id, "Stock set");
    Ok(Json(InventoryUpdated {
        success: true,
        inventory: row.into(),
    }))
}

/// Apply `set`, `add` or `subtract` to all stock rows, or one category's.
pub async fn bulk_update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<BulkUpdateForm>,
) -> Result<Json<BulkUpdated>> {
    require_non_negative(form.quantity, "quantity")?;

    let updated_count = InventoryRepository::new(state.pool())
        .bulk_update(form.category_id, form.action, form.quantity)
        .await?;

    info!(
        action = ?form.action,
        quantity = form.quantity,
        category_id = ?form.category_id,
        updated_count,
        admin_id = %admin.id,
        "Bulk stock update"
    );
    Ok(Json(BulkUpdated {
        success: true,
        updated_count,
    }))
}
