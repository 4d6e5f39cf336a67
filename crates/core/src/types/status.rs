//! Order statuses, inventory actions and role names.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// New orders start as `Pending`; admins move them forward manually. There is
/// no enforced state machine and cancelling does not restock inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Paid,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The wire / database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        raw.parse::<Self>().map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Bulk inventory adjustment applied to every matching product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    /// Overwrite `current_stock` with the quantity.
    Set,
    /// Increase `current_stock` by the quantity.
    Add,
    /// Decrease `current_stock` by the quantity, never below zero.
    Subtract,
}

impl StockAction {
    /// Apply the action to a stock level.
    ///
    /// Results are clamped to `0..=i32::MAX`.
    #[must_use]
    pub const fn apply(self, current: i32, quantity: i32) -> i32 {
        let next = match self {
            Self::Set => quantity,
            Self::Add => current.saturating_add(quantity),
            Self::Subtract => current.saturating_sub(quantity),
        };
        if next < 0 { 0 } else { next }
    }
}

/// Role names stored in the `roles` table.
pub mod roles {
    /// Full access to the admin API.
    pub const ADMIN: &str = "admin";
    /// Default role for every registered customer.
    pub const BUYER: &str = "buyer";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(" PAID ".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_stock_action_apply() {
        assert_eq!(StockAction::Set.apply(10, 3), 3);
        assert_eq!(StockAction::Add.apply(10, 3), 13);
        assert_eq!(StockAction::Subtract.apply(10, 3), 7);
        assert_eq!(StockAction::Subtract.apply(2, 5), 0);
        assert_eq!(StockAction::Set.apply(2, -5), 0);
        assert_eq!(StockAction::Add.apply(i32::MAX, 1), i32::MAX);
    }
}
