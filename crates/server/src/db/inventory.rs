//! Inventory repository.

use sqlx::PgPool;

use dronshop_core::{CategoryId, ProductId, StockAction};

use super::RepositoryError;
use crate::models::InventoryRow;

/// Repository for `inventory` rows.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product with its stock; products without a row report zeros.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<InventoryRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            "SELECT p.id AS product_id,
                    p.name AS product_name,
                    COALESCE(i.current_stock, 0) AS current_stock,
                    COALESCE(i.reserved_stock, 0) AS reserved_stock
             FROM products p
             LEFT JOIN inventory i ON i.product_id = p.id
             ORDER BY p.name ASC, p.id ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Set `current_stock`, creating the row if absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_stock(
        &self,
        product_id: ProductId,
        current_stock: i32,
    ) -> Result<InventoryRow, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product_name = sqlx::query_scalar::<_, String>("SELECT name FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let (current_stock, reserved_stock) = sqlx::query_as::<_, (i32, i32)>(
            "INSERT INTO inventory (product_id, current_stock, reserved_stock)
             VALUES ($1, $2, 0)
             ON CONFLICT (product_id) DO UPDATE SET current_stock = EXCLUDED.current_stock
             RETURNING current_stock, reserved_stock",
        )
        .bind(product_id)
        .bind(current_stock)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(InventoryRow {
            product_id,
            product_name,
            current_stock,
            reserved_stock,
        })
    }

    /// Apply `action` to every stock row, or to those in `category`.
    ///
    /// Rows are locked and rewritten in one transaction. Returns the number
    /// of rows updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn bulk_update(
        &self,
        category: Option<CategoryId>,
        action: StockAction,
        quantity: i32,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, (ProductId, i32)>(
            "SELECT i.product_id, i.current_stock
             FROM inventory i
             JOIN products p ON p.id = i.product_id
             WHERE $1::INTEGER IS NULL OR p.category_id = $1
             ORDER BY i.product_id
             FOR UPDATE OF i",
        )
        .bind(category)
        .fetch_all(&mut *tx)
        .await?;

        let mut updated = 0;
        for (product_id, current) in rows {
            sqlx::query("UPDATE inventory SET current_stock = $2 WHERE product_id = $1")
                .bind(product_id)
                .bind(action.apply(current, quantity))
                .execute(&mut *tx)
                .await?;
            updated += 1;
        }

        tx.commit().await?;
        Ok(updated)
    }
}
