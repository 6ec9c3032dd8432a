//! Monetary amounts using decimal arithmetic.
//!
//! All prices in the marketplace are in a single currency and carried with two
//! decimal places. Arithmetic never goes through floating point.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is negative.
    #[error("amount cannot be negative")]
    Negative,
    /// Amount has more precision than cents.
    #[error("amount cannot have more than two decimal places")]
    TooPrecise,
    /// Input was not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A non-negative amount of money with cent precision.
///
/// Serialized as a decimal string (e.g. `"12.50"`) so clients never see
/// binary floating point. Deserialization applies the same validation as
/// [`Money::new`], so request bodies cannot smuggle in negative prices.
///
/// ```
/// use gobble_core::Money;
///
/// let pad_thai = Money::from_cents(1250);
/// let total = pad_thai.times(2);
/// assert_eq!(total.to_string(), "$25.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents.max(0), 2))
    }

    /// Create an amount from a decimal, validating sign and precision.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for negative amounts and
    /// `MoneyError::TooPrecise` for sub-cent amounts.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(MoneyError::TooPrecise);
        }
        let mut amount = amount.round_dp(2);
        amount.rescale(2);
        Ok(Self(amount))
    }

    /// Parse an amount from a string such as `"4.99"`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Invalid` if the string is not a decimal number,
    /// or the errors of [`Money::new`].
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|_| MoneyError::Invalid(s.to_string()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// `percentage`% of this amount, rounded half-up to the cent.
    #[must_use]
    pub fn percentage(self, percentage: u8) -> Self {
        let raw = self.0 * Decimal::from(percentage) / Decimal::ONE_HUNDRED;
        Self(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // NUMERIC(10,2) columns with CHECK (>= 0)
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Money::parse("4.99").unwrap(), Money::from_cents(499));
        assert_eq!(Money::parse(" 10 ").unwrap(), Money::from_cents(1000));
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert_eq!(Money::parse("-1.00"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_parse_rejects_sub_cent() {
        assert_eq!(Money::parse("1.005"), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn test_parse_allows_trailing_zeros() {
        assert_eq!(Money::parse("2.5000").unwrap(), Money::from_cents(250));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Money::parse("ten"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 12.35 = 1.8525 -> 1.85
        assert_eq!(
            Money::from_cents(1235).percentage(15),
            Money::from_cents(185)
        );
        // 10% of 0.05 = 0.005 -> 0.01
        assert_eq!(Money::from_cents(5).percentage(10), Money::from_cents(1));
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let a = Money::from_cents(500);
        let b = Money::from_cents(800);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_cents(300));
    }

    #[test]
    fn test_sum_and_times() {
        let total: Money = [Money::from_cents(250).times(2), Money::from_cents(199)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(699));
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Money>("\"-3.00\"").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(123_456).to_string(), "$1234.56");
    }

    #[test]
    fn test_parse_keeps_cent_scale() {
        let json = serde_json::to_string(&Money::parse("7").unwrap()).unwrap();
        assert_eq!(json, "\"7.00\"");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "\"19.99\"");
        let back: Money = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(back, Money::from_cents(1999));
    }
}
