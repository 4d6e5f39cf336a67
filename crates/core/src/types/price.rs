//! Integer money amounts.
//!
//! The shop sells in a single currency and stores every amount as a whole
//! number of currency units (`BIGINT` in Postgres). Arithmetic is checked so
//! a malicious quantity cannot wrap a line total around to a small value.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors produced by [`Price`] construction and arithmetic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
    /// Quantities must be at least one.
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    /// The computed amount does not fit in an `i64`.
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative amount of money in whole currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount < 0`.
    pub const fn new(amount: i64) -> Result<Self, PriceError> {
        if amount < 0 {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Multiply a unit price by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NonPositiveQuantity` for `quantity < 1` and
    /// `PriceError::Overflow` if the result does not fit.
    pub fn times(self, quantity: i32) -> Result<Self, PriceError> {
        if quantity < 1 {
            return Err(PriceError::NonPositiveQuantity);
        }
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(PriceError::Overflow)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Price {
    type Error = PriceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_negative() {
        assert_eq!(Price::new(-1), Err(PriceError::Negative));
        assert_eq!(Price::new(0).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_times() {
        let unit = Price::new(1000).unwrap();
        assert_eq!(unit.times(2).unwrap().amount(), 2000);
        assert_eq!(unit.times(0), Err(PriceError::NonPositiveQuantity));
        assert_eq!(unit.times(-3), Err(PriceError::NonPositiveQuantity));
    }

    #[test]
    fn test_times_overflow() {
        let unit = Price::new(i64::MAX / 2).unwrap();
        assert_eq!(unit.times(3), Err(PriceError::Overflow));
    }

    #[test]
    fn test_checked_add_overflow() {
        let big = Price::new(i64::MAX).unwrap();
        assert_eq!(big.checked_add(Price::new(1).unwrap()), Err(PriceError::Overflow));
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("-5").is_err());
        assert_eq!(serde_json::from_str::<Price>("1500").unwrap().amount(), 1500);
    }
}
