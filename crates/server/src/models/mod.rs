//! Row and response types.
//!
//! Row types derive `sqlx::FromRow` and mirror table columns. Response types
//! carry the JSON field names the admin UI and storefront expect (several of
//! them camelCase for historical reasons).

pub mod catalog;
pub mod order;
pub mod review;
pub mod setting;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use catalog::{
    Category, InventoryOut, InventoryRow, Product, ProductImage, ProductOut, ProductsMeta,
    ProductsPage,
};
pub use order::{
    Order, OrderAdminOut, OrderCustomer, OrderItem, OrderItemOut, OrderOut, OrderPayment,
    OrderShipping, OrderSummary,
};
pub use review::{PublicReview, Review};
pub use setting::{PublicSettings, SiteSetting};
pub use user::{Account, AdminUserOut, MeResponse, User};

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
