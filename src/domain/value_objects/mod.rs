//! Value Objects for the storefront

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Money value object.
///
/// The shop trades in a single currency, so only the amount is carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    /// Decimal places kept by the `NUMERIC(10, 2)` money columns.
    pub const SCALE: u32 = 2;

    pub fn new(amount: Decimal) -> Self { Self(amount) }

    /// Largest amount a `NUMERIC(10, 2)` column holds.
    pub fn max() -> Money { Money(Decimal::new(9_999_999_999, Self::SCALE)) }

    /// Accepts an incoming amount only if it can be stored as-is: not
    /// negative, at most two decimal places and no larger than [`Money::max`].
    pub fn parse_amount(amount: Decimal) -> Result<Money, AmountError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(AmountError::Negative); }
        if amount.normalize().scale() > Self::SCALE { return Err(AmountError::TooPrecise); }
        if amount > Self::max().0 { return Err(AmountError::TooLarge); }
        Ok(Money(amount))
    }

    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn fits_column(&self) -> bool { !self.is_negative() && *self <= Self::max() }
    pub fn add(&self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn subtract(&self, other: Money) -> Money { Money(self.0.saturating_sub(other.0)) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(Decimal::from(qty))) }
    pub fn checked_add(&self, other: Money) -> Option<Money> { self.0.checked_add(other.0).map(Money) }
    pub fn checked_multiply(&self, qty: u32) -> Option<Money> { self.0.checked_mul(Decimal::from(qty)).map(Money) }

    /// `pct` percent of this amount, rounded half away from zero to cents.
    pub fn percent(&self, pct: u32) -> Money {
        let raw = self.0.saturating_mul(Decimal::from(pct)) / Decimal::ONE_HUNDRED;
        Money(raw.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("cannot be negative")]
    Negative,
    #[error("cannot have more than two decimal places")]
    TooPrecise,
    #[error("cannot exceed 99999999.99")]
    TooLarge,
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self { Self(Decimal::from(amount)) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::ZERO, |acc, m| acc.add(m)) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

/// Quantity value object. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Stored in an `INTEGER` column.
    pub const MAX: i64 = i32::MAX as i64;

    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 { return Err(QuantityError::BelowOne); }
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge)
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1")]
    BelowOne,
    #[error("quantity is too large")]
    TooLarge,
}

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("Invalid regex"));

/// Email address as accepted at checkout: `something@something.something`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(value: &str) -> Result<Self, EmailError> {
        let value = value.trim();
        if value.is_empty() { return Err(EmailError::Empty); }
        if !EMAIL_PATTERN.is_match(value) { return Err(EmailError::Invalid); }
        Ok(Self(value.to_string()))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for EmailAddress {
    type Error = EmailError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(&value) }
}

impl From<EmailAddress> for String {
    fn from(e: EmailAddress) -> Self { e.0 }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("Email is required")]
    Empty,
    #[error("Invalid email format")]
    Invalid,
}

/// Display label for an order, e.g. `#ORD-48213`.
///
/// Randomly generated and therefore able to collide; the store enforces
/// uniqueness and rejects a duplicate rather than silently accepting it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const PREFIX: &'static str = "#ORD-";

    pub fn generate() -> Self { Self::generate_with(&mut rand::thread_rng()) }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let n: u32 = rng.gen_range(10_000..=99_999);
        Self(format!("{}{n}", Self::PREFIX))
    }

    /// Wraps a client-supplied label. Only blank labels are refused.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        (!value.is_empty()).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from(350);
        assert_eq!(a.multiply(2), Money::from(700));
        assert_eq!(Money::from(700).percent(10), Money::from(70));
        assert_eq!(Money::from(700).subtract(Money::from(70)), Money::from(630));
        let total: Money = [Money::from(1), Money::from(2)].into_iter().sum();
        assert_eq!(total, Money::from(3));
        assert_eq!(Money::new(Decimal::new(1999, 2)).to_string(), "19.99");
    }

    #[test]
    fn test_percent_rounds_to_cents() {
        assert_eq!(Money::new(Decimal::new(12345, 2)).percent(10), Money::new(Decimal::new(1235, 2)));
        assert_eq!(Money::new(Decimal::new(12344, 2)).percent(10), Money::new(Decimal::new(1234, 2)));
        assert!(Money::new(Decimal::new(33333, 2)).percent(15).amount().scale() <= Money::SCALE);
    }

    #[test]
    fn test_amount_bounds() {
        assert_eq!(Money::parse_amount(Decimal::new(1250, 2)), Ok(Money::new(Decimal::new(1250, 2))));
        assert!(Money::parse_amount(Decimal::new(12500, 3)).is_ok());
        assert_eq!(Money::parse_amount(Decimal::new(12345, 3)), Err(AmountError::TooPrecise));
        assert_eq!(Money::parse_amount(Decimal::NEGATIVE_ONE), Err(AmountError::Negative));
        assert_eq!(Money::parse_amount(Money::max().amount()), Ok(Money::max()));
        assert_eq!(Money::parse_amount(Decimal::from(100_000_000)), Err(AmountError::TooLarge));
        assert_eq!(Money::parse_amount(Decimal::MAX), Err(AmountError::TooLarge));
    }

    #[test]
    fn test_arithmetic_never_panics() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.add(huge), huge);
        assert_eq!(huge.multiply(u32::MAX), huge);
        assert!(huge.checked_add(huge).is_none());
        assert!(huge.checked_multiply(2).is_none());
        assert!(!huge.fits_column());
    }

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(Quantity::new(0), Err(QuantityError::BelowOne));
        assert_eq!(Quantity::new(-3), Err(QuantityError::BelowOne));
        assert_eq!(Quantity::new(4).map(|q| q.value()), Ok(4));
        assert_eq!(Quantity::new(Quantity::MAX + 1), Err(QuantityError::TooLarge));
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_email() {
        assert!(EmailAddress::parse("  a@b.co ").is_ok());
        assert_eq!(EmailAddress::parse(""), Err(EmailError::Empty));
        assert_eq!(EmailAddress::parse("no-at-sign.com"), Err(EmailError::Invalid));
        assert_eq!(EmailAddress::parse("user@localhost"), Err(EmailError::Invalid));
    }

    #[test]
    fn test_order_number_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let n = OrderNumber::generate_with(&mut rng);
            let digits = n.as_str().strip_prefix(OrderNumber::PREFIX).unwrap();
            let value: u32 = digits.parse().unwrap();
            assert!((10_000..=99_999).contains(&value));
        }
        assert!(OrderNumber::parse("   ").is_none());
    }
}
