//! An exact decimal amount of money.
//!
//! Every monetary field in the crate is a [Money], never an `f64`, so that
//! summing thousands of cost rows cannot drift by a cent.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// The error returned when text or a float cannot be read as an amount of money.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid amount of money")]
pub struct ParseMoneyError(pub String);

/// An amount of money stored as an exact decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// No money at all.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wrap an exact decimal amount.
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a whole number of cents, e.g. `from_cents(1050)` is 10.50.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The exact decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Round to whole cents, with halves rounded away from zero.
    pub fn round_to_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Divide by `divisor`, returning `None` if `divisor` is zero.
    pub fn checked_div(self, divisor: Decimal) -> Option<Self> {
        self.0.checked_div(divisor).map(Self)
    }

    /// `self / other` as a plain number, or `None` if `other` is zero.
    pub fn ratio_to(self, other: Money) -> Option<Decimal> {
        self.0.checked_div(other.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }
}

impl From<i32> for Money {
    fn from(amount: i32) -> Self {
        Self(Decimal::from(amount))
    }
}

impl TryFrom<f64> for Money {
    type Error = ParseMoneyError;

    /// Floats are read through their shortest decimal text, so `0.1` becomes exactly `0.1`
    /// rather than the nearest binary fraction.
    fn try_from(amount: f64) -> Result<Self, Self::Error> {
        amount.to_string().parse()
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();

        Decimal::from_str(text)
            .map(Self)
            .map_err(|_| ParseMoneyError(text.to_owned()))
    }
}

/// Displays the amount rounded to cents with exactly two fraction digits.
impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rounded = self.round_to_cents().0;
        rounded.rescale(2);

        write!(f, "{rounded}")
    }
}

// Arithmetic saturates at the bounds of [Decimal] instead of panicking.

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, rhs: Decimal) -> Money {
        Money(self.0.saturating_mul(rhs))
    }
}

/// # Panics
///
/// Panics if `rhs` is zero. Use [Money::checked_div] when the divisor may be zero.
impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, rhs: Decimal) -> Money {
        Money(self.0 / rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl de::Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a decimal number or a string containing a decimal number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Money, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Money, E> {
        Ok(Money::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Money, E> {
        Ok(Money(Decimal::from(value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Money, E> {
        Money::try_from(value).map_err(E::custom)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => {
                let text = value.as_str()?;
                Decimal::from_str(text)
                    .map(Self)
                    .map_err(|error| FromSqlError::Other(Box::new(error)))
            }
            ValueRef::Integer(amount) => Ok(Money::from(amount)),
            ValueRef::Real(amount) => Decimal::from_f64(amount)
                .map(Self)
                .ok_or(FromSqlError::InvalidType),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

#[cfg(test)]
mod money_tests {
    use rust_decimal::Decimal;

    use super::{Money, ParseMoneyError};

    #[test]
    fn repeated_addition_does_not_drift() {
        let ten_cents: Money = "0.10".parse().unwrap();

        let total: Money = std::iter::repeat_n(ten_cents, 10_000).sum();

        assert_eq!(total, Money::from(1000));
    }

    #[test]
    fn float_input_is_read_as_its_decimal_text() {
        let amount = Money::try_from(0.1).unwrap() + Money::try_from(0.2).unwrap();

        assert_eq!(amount, "0.3".parse().unwrap());
    }

    #[test]
    fn float_nan_is_rejected() {
        assert_eq!(
            Money::try_from(f64::NAN),
            Err(ParseMoneyError("NaN".to_owned()))
        );
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(" 12.50 ".parse::<Money>(), Ok(Money::from_cents(1250)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("twelve".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn display_uses_two_fraction_digits() {
        assert_eq!(Money::from(3000).to_string(), "3000.00");
        assert_eq!("1.5".parse::<Money>().unwrap().to_string(), "1.50");
        assert_eq!("1.835".parse::<Money>().unwrap().to_string(), "1.84");
        assert_eq!("-1.835".parse::<Money>().unwrap().to_string(), "-1.84");
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::ZERO.is_zero());
        assert!(Money::from(5).is_positive());
        assert!(Money::from(-5).is_negative());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
    }

    #[test]
    fn checked_div_by_zero_is_none() {
        assert_eq!(Money::from(10).checked_div(Decimal::ZERO), None);
        assert_eq!(Money::from(10).ratio_to(Money::ZERO), None);
    }

    #[test]
    fn arithmetic_saturates_instead_of_overflowing() {
        let max = Money::new(Decimal::MAX);
        let min = Money::new(Decimal::MIN);

        assert_eq!(max + Money::from(1), max);
        assert_eq!(min - Money::from(1), min);
        assert_eq!(max * Decimal::TEN, max);

        let mut total = max;
        total += max;
        assert_eq!(total, max);
    }

    #[test]
    fn equality_ignores_scale() {
        assert_eq!("15000".parse::<Money>(), "15000.00".parse::<Money>());
    }

    #[test]
    fn deserializes_from_string_and_number() {
        let from_string: Money = serde_json::from_str("\"1200.25\"").unwrap();
        let from_integer: Money = serde_json::from_str("1200").unwrap();
        let from_float: Money = serde_json::from_str("1200.25").unwrap();

        assert_eq!(from_string, Money::from_cents(120025));
        assert_eq!(from_integer, Money::from(1200));
        assert_eq!(from_float, Money::from_cents(120025));
    }

    #[test]
    fn serializes_as_exact_string() {
        let json = serde_json::to_string(&"0.125".parse::<Money>().unwrap()).unwrap();

        assert_eq!(json, "\"0.125\"");
    }
}

#[cfg(test)]
mod money_sql_tests {
    use rusqlite::Connection;

    use super::Money;

    #[test]
    fn round_trips_through_text_column() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE amount (value TEXT NOT NULL)", ())
            .unwrap();
        let want = "123456.789".parse::<Money>().unwrap();

        connection
            .execute("INSERT INTO amount (value) VALUES (?1)", [want])
            .unwrap();
        let got: Money = connection
            .query_row("SELECT value FROM amount", [], |row| row.get(0))
            .unwrap();

        assert_eq!(got, want);
    }
}
