//! Orders, order items and the checkout payload blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dronshop_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId};

/// A row from `orders`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Price,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_method: String,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_comment: Option<String>,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from `order_items`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Price,
    pub total_price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderShipping {
    pub method: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl OrderShipping {
    /// Empty strings from the checkout form are stored as `NULL`.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            method: self.method,
            address: blank_to_none(self.address),
            city: blank_to_none(self.city),
            postal_code: blank_to_none(self.postal_code),
            comment: blank_to_none(self.comment),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayment {
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemOut {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Price,
    pub total_price: Price,
}

impl From<OrderItem> for OrderItemOut {
    fn from(item: OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}

/// Order with its items, returned after checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOut {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Price,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemOut>,
}

impl OrderOut {
    #[must_use]
    pub fn new(order: &Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
            items: items.into_iter().map(OrderItemOut::from).collect(),
        }
    }
}

/// Order detail for the admin panel, including the customer snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OrderAdminOut {
    #[serde(flatten)]
    pub order: OrderOut,
    pub customer: OrderCustomer,
    pub shipping: OrderShipping,
    pub payment: OrderPayment,
}

impl OrderAdminOut {
    #[must_use]
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let base = OrderOut::new(&order, items);
        Self {
            order: base,
            customer: OrderCustomer {
                email: order.customer_email,
                first_name: order.customer_first_name,
                last_name: order.customer_last_name,
                phone: order.customer_phone,
            },
            shipping: OrderShipping {
                method: order.shipping_method,
                address: order.shipping_address,
                city: order.shipping_city,
                postal_code: order.shipping_postal_code,
                comment: order.shipping_comment,
            },
            payment: OrderPayment {
                method: order.payment_method,
            },
        }
    }
}

/// One line of an order list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Price,
    pub created_at: DateTime<Utc>,
    pub items_count: i64,
}
