//! Order repository.
//!
//! Read paths go through [`OrderRepository`]. The checkout path uses the
//! free functions in this module, which all run on the caller's transaction
//! so that a failure anywhere leaves no order, item or stock change behind.

use chrono::Utc;
use rand::Rng;
use sqlx::{PgConnection, PgPool};

use dronshop_core::{OrderId, OrderStatus, Price, ProductId};

use super::RepositoryError;
use crate::models::{
    Order, OrderCustomer, OrderItem, OrderPayment, OrderShipping, OrderSummary, Product,
};

const ORDER_COLUMNS: &str = "id, order_number, status, total_amount, \
     customer_first_name, customer_last_name, customer_email, customer_phone, \
     shipping_method, shipping_address, shipping_city, shipping_postal_code, shipping_comment, \
     payment_method, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, quantity, unit_price, total_price";

const SUMMARY_SELECT: &str = "SELECT o.id, o.order_number, o.status, o.total_amount, o.created_at,
            (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS items_count
     FROM orders o";

/// Customer, shipping and payment snapshot of an order being placed.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer: OrderCustomer,
    pub shipping: OrderShipping,
    pub payment: OrderPayment,
}

/// Locked stock row of a product in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub current_stock: i32,
    pub reserved_stock: i32,
}

/// Order line ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Price,
    pub total_price: Price,
}

fn placeholder_number() -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    format!("ORD-TMP-{}-{suffix:06}", Utc::now().timestamp_millis())
}

/// Customer-facing order number for a row id.
#[must_use]
pub fn order_number(id: OrderId) -> String {
    format!("ORD-{:06}", id.as_i32())
}

// =============================================================================
// Checkout steps (caller-owned transaction)
// =============================================================================

/// Insert a `pending` order with a zero total and assign its final number.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn insert_pending(
    conn: &mut PgConnection,
    draft: &OrderDraft,
) -> Result<Order, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>(
        "INSERT INTO orders (
             order_number, status, total_amount,
             customer_first_name, customer_last_name, customer_email, customer_phone,
             shipping_method, shipping_address, shipping_city, shipping_postal_code, shipping_comment,
             payment_method)
         VALUES ($1, $2, 0, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING id",
    )
    .bind(placeholder_number())
    .bind(OrderStatus::Pending)
    .bind(&draft.customer.first_name)
    .bind(&draft.customer.last_name)
    .bind(&draft.customer.email)
    .bind(&draft.customer.phone)
    .bind(&draft.shipping.method)
    .bind(&draft.shipping.address)
    .bind(&draft.shipping.city)
    .bind(&draft.shipping.postal_code)
    .bind(&draft.shipping.comment)
    .bind(&draft.payment.method)
    .fetch_one(&mut *conn)
    .await?;

    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET order_number = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(order_number(id))
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

/// Load the products referenced by a cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn load_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let rows = sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, category_id, active, created_at
         FROM products WHERE id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Lock the inventory rows of a cart, in product id order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_stock(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<StockLevel>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let rows = sqlx::query_as::<_, StockLevel>(
        "SELECT product_id, current_stock, reserved_stock
         FROM inventory WHERE product_id = ANY($1)
         ORDER BY product_id
         FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem, RepositoryError> {
    let row = sqlx::query_as::<_, OrderItem>(&format!(
        "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price, total_price)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.total_price)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn write_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    current_stock: i32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE inventory SET current_stock = $2 WHERE product_id = $1")
        .bind(product_id)
        .bind(current_stock)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Store the final total and touch `updated_at`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn finalize(
    conn: &mut PgConnection,
    order_id: OrderId,
    total: Price,
) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET total_amount = $2, updated_at = NOW() WHERE id = $1
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(total)
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reading and updating placed orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Orders whose customer phone or email matches, newest first.
    ///
    /// Returns an empty list when neither contact is known.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_contact(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        if phone.is_none() && email.is_none() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT}
             WHERE ($1::TEXT IS NOT NULL AND o.customer_phone = $1)
                OR ($2::TEXT IS NOT NULL AND o.customer_email = $2)
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(phone)
        .bind(email)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = self.items(id).await?;
        Ok(Some((order, items)))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Change the status and touch `updated_at`. Stock is not restored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
