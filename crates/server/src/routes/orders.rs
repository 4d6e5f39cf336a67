//! Checkout and order history route handlers.

use axum::extract::State;
use serde::Deserialize;

use crate::db::orders::OrderDraft;
use crate::db::{OrderRepository, UserRepository};
use crate::error::{OrNotFound, Result};
use crate::extract::Json;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{OrderCustomer, OrderOut, OrderPayment, OrderShipping, OrderSummary};
use crate::services::checkout::{self, CartLine};
use crate::state::AppState;

/// Checkout payload.
#[derive(Debug, Deserialize)]
pub struct CreateOrderForm {
    pub items: Vec<CartLine>,
    pub customer: OrderCustomer,
    pub shipping: OrderShipping,
    pub payment: OrderPayment,
}

/// Place an order. Signed-in users get their profile contacts on the order.
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Json(form): Json<CreateOrderForm>,
) -> Result<Json<OrderOut>> {
    let profile = match auth {
        Some(auth) => UserRepository::new(state.pool()).get_by_id(auth.id).await?,
        None => None,
    };

    let draft = OrderDraft {
        customer: checkout::prefer_profile_contacts(form.customer, profile.as_ref()),
        shipping: form.shipping.normalized(),
        payment: form.payment,
    };

    let (order, items) = checkout::place_order(state.pool(), &draft, &form.items).await?;
    Ok(Json(OrderOut::new(&order, items)))
}

/// Orders placed with the caller's phone or email.
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(auth.id)
        .await
        .or_not_found("User not found")?;

    let orders = OrderRepository::new(state.pool())
        .list_for_contact(user.phone.as_deref(), user.email.as_deref())
        .await?;
    Ok(Json(orders))
}
