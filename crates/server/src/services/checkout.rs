//! Checkout: turning a cart into an order.
//!
//! [`plan_order`] is pure: given the cart, the products and their locked
//! stock rows it computes the order lines, the total and the new stock
//! levels, or the first reason the cart cannot be ordered.
//! [`place_order`] wraps it in a single transaction.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use dronshop_core::{Price, ProductId};

use crate::db::RepositoryError;
use crate::db::orders::{self, NewOrderItem, OrderDraft, StockLevel};
use crate::models::{Order, OrderCustomer, OrderItem, Product, User};

/// Reasons a checkout is refused.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Quantity for product {0} must be at least 1")]
    InvalidQuantity(ProductId),

    /// Missing or inactive product.
    #[error("Product {0} is unavailable")]
    Unavailable(ProductId),

    #[error("Not enough stock for product {0}")]
    InsufficientStock(String),

    #[error("Order total is too large")]
    Overflow,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// One cart line. Client-side prices in the payload are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Result of planning a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub items: Vec<NewOrderItem>,
    pub total: Price,
    /// New `current_stock` per product that has an inventory row.
    pub stock: BTreeMap<ProductId, i32>,
}

/// Reject empty carts and non-positive quantities.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` or `CheckoutError::InvalidQuantity`.
pub fn validate_cart(lines: &[CartLine]) -> Result<(), CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if let Some(bad) = lines.iter().find(|line| line.quantity < 1) {
        return Err(CheckoutError::InvalidQuantity(bad.product_id));
    }
    Ok(())
}

/// Compute order lines, total and stock changes.
///
/// Lines for the same product are checked against the stock left by the
/// previous lines. Products without an inventory row are not stock-checked.
///
/// # Errors
///
/// Returns the first `CheckoutError` found; no partial plan is produced.
pub fn plan_order(
    lines: &[CartLine],
    products: &HashMap<ProductId, Product>,
    stock: &HashMap<ProductId, StockLevel>,
) -> Result<OrderPlan, CheckoutError> {
    validate_cart(lines)?;

    let mut remaining: BTreeMap<ProductId, StockLevel> = BTreeMap::new();
    let mut items = Vec::with_capacity(lines.len());
    let mut total = Price::ZERO;

    for line in lines {
        let product = products
            .get(&line.product_id)
            .filter(|p| p.active)
            .ok_or(CheckoutError::Unavailable(line.product_id))?;

        if let Some(level) = stock.get(&product.id) {
            let level = remaining.entry(product.id).or_insert(*level);
            let available = level.current_stock - level.reserved_stock;
            if available < line.quantity {
                return Err(CheckoutError::InsufficientStock(product.name.clone()));
            }
            level.current_stock = (level.current_stock - line.quantity).max(0);
        }

        let line_total = product
            .price
            .times(line.quantity)
            .map_err(|_| CheckoutError::Overflow)?;
        total = total
            .checked_add(line_total)
            .map_err(|_| CheckoutError::Overflow)?;

        items.push(NewOrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
            total_price: line_total,
        });
    }

    Ok(OrderPlan {
        items,
        total,
        stock: remaining
            .into_iter()
            .map(|(id, level)| (id, level.current_stock))
            .collect(),
    })
}

/// Replace the form's email/phone with the signed-in user's, when set.
#[must_use]
pub fn prefer_profile_contacts(customer: OrderCustomer, user: Option<&User>) -> OrderCustomer {
    let Some(user) = user else {
        return customer;
    };
    OrderCustomer {
        email: user.email.clone().unwrap_or(customer.email),
        phone: user.phone.clone().unwrap_or(customer.phone),
        ..customer
    }
}

/// Create the order, its items and the stock decrements in one transaction.
///
/// Any error rolls everything back.
///
/// # Errors
///
/// Returns a `CheckoutError` describing why the cart was refused, or
/// `CheckoutError::Repository` for database failures.
#[instrument(skip(pool, draft, lines), fields(lines = lines.len()))]
pub async fn place_order(
    pool: &PgPool,
    draft: &OrderDraft,
    lines: &[CartLine],
) -> Result<(Order, Vec<OrderItem>), CheckoutError> {
    validate_cart(lines)?;

    let mut ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let pending = orders::insert_pending(&mut tx, draft).await?;

    let products: HashMap<ProductId, Product> = orders::load_products(&mut tx, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let stock: HashMap<ProductId, StockLevel> = orders::lock_stock(&mut tx, &ids)
        .await?
        .into_iter()
        .map(|level| (level.product_id, level))
        .collect();

    let plan = plan_order(lines, &products, &stock)?;

    let mut items = Vec::with_capacity(plan.items.len());
    for item in &plan.items {
        items.push(orders::insert_item(&mut tx, pending.id, item).await?);
    }
    for (&product_id, &current_stock) in &plan.stock {
        orders::write_stock(&mut tx, product_id, current_stock).await?;
    }
    let order = orders::finalize(&mut tx, pending.id, plan.total).await?;

    tx.commit().await.map_err(RepositoryError::from)?;

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = order.total_amount.amount(),
        "Order placed"
    );
    Ok((order, items))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use dronshop_core::{CategoryId, UserId};

    use super::*;

    fn product(id: i32, price: i64, active: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Drone {id}"),
            description: None,
            price: Price::new(price).unwrap(),
            category_id: Some(CategoryId::new(1)),
            active,
            created_at: Utc::now(),
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    fn stock(levels: &[(i32, i32, i32)]) -> HashMap<ProductId, StockLevel> {
        levels
            .iter()
            .map(|&(id, current, reserved)| {
                (
                    ProductId::new(id),
                    StockLevel {
                        product_id: ProductId::new(id),
                        current_stock: current,
                        reserved_stock: reserved,
                    },
                )
            })
            .collect()
    }

    fn line(id: i32, quantity: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_two_units_of_one_product() {
        let plan = plan_order(
            &[line(1, 2)],
            &catalog(vec![product(1, 1000, true)]),
            &stock(&[(1, 10, 0)]),
        )
        .unwrap();

        assert_eq!(plan.total.amount(), 2000);
        assert_eq!(plan.items.len(), 1);
        let item = &plan.items[0];
        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_price.amount(), 1000);
        assert_eq!(item.total_price.amount(), 2000);
        assert_eq!(plan.stock.get(&ProductId::new(1)), Some(&8));
    }

    #[test]
    fn test_total_matches_item_sum() {
        let plan = plan_order(
            &[line(1, 3), line(2, 1), line(3, 4)],
            &catalog(vec![
                product(1, 1500, true),
                product(2, 99, true),
                product(3, 250, true),
            ]),
            &stock(&[(1, 5, 0), (3, 4, 0)]),
        )
        .unwrap();

        let sum: i64 = plan.items.iter().map(|i| i.total_price.amount()).sum();
        assert_eq!(plan.total.amount(), sum);
        assert_eq!(sum, 4500 + 99 + 1000);
        // Product 2 has no inventory row and is not touched.
        assert!(!plan.stock.contains_key(&ProductId::new(2)));
        assert_eq!(plan.stock.get(&ProductId::new(3)), Some(&0));
    }

    #[test]
    fn test_reserved_stock_counts_against_availability() {
        let err = plan_order(
            &[line(1, 3)],
            &catalog(vec![product(1, 100, true)]),
            &stock(&[(1, 5, 3)]),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock(ref name) if name == "Drone 1"));
        assert_eq!(err.to_string(), "Not enough stock for product Drone 1");
    }

    #[test]
    fn test_duplicate_lines_share_stock() {
        let err = plan_order(
            &[line(1, 2), line(1, 2)],
            &catalog(vec![product(1, 100, true)]),
            &stock(&[(1, 3, 0)]),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock(_)));

        let plan = plan_order(
            &[line(1, 2), line(1, 1)],
            &catalog(vec![product(1, 100, true)]),
            &stock(&[(1, 3, 0)]),
        )
        .unwrap();
        assert_eq!(plan.stock.get(&ProductId::new(1)), Some(&0));
    }

    #[test]
    fn test_unavailable_products() {
        let products = catalog(vec![product(1, 100, false)]);
        let err = plan_order(&[line(1, 1)], &products, &HashMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Product 1 is unavailable");

        let err = plan_order(&[line(9, 1)], &products, &HashMap::new()).unwrap_err();
        assert!(matches!(err, CheckoutError::Unavailable(id) if id == ProductId::new(9)));
    }

    #[test]
    fn test_cart_validation() {
        assert!(matches!(
            validate_cart(&[]),
            Err(CheckoutError::EmptyCart)
        ));
        assert!(matches!(
            validate_cart(&[line(1, 1), line(2, 0)]),
            Err(CheckoutError::InvalidQuantity(id)) if id == ProductId::new(2)
        ));
        assert!(matches!(
            validate_cart(&[line(1, -3)]),
            Err(CheckoutError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let err = plan_order(
            &[line(1, 2)],
            &catalog(vec![product(1, i64::MAX / 2 + 1, true)]),
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::Overflow));
    }

    #[test]
    fn test_cart_line_ignores_client_price() {
        let parsed: CartLine =
            serde_json::from_str(r#"{"productId": 4, "quantity": 2, "price": 1}"#).unwrap();
        assert_eq!(parsed, line(4, 2));
    }

    #[test]
    fn test_profile_contacts_win() {
        let customer = OrderCustomer {
            email: "form@example.com".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            phone: "+70000000009".to_string(),
        };
        let user = User {
            id: UserId::new(3),
            phone: Some("+70000000002".to_string()),
            email: None,
            name: None,
            is_verified: true,
            is_blocked: false,
            created_at: Utc::now(),
        };

        let merged = prefer_profile_contacts(customer.clone(), Some(&user));
        assert_eq!(merged.phone, "+70000000002");
        assert_eq!(merged.email, "form@example.com");
        assert_eq!(merged.first_name, "Ann");

        assert_eq!(prefer_profile_contacts(customer.clone(), None), customer);
    }
}
