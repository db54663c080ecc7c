//! Input validation shared by the registry, cost and calculation forms.
//!
//! Validation never stops at the first problem: every failure is collected into
//! [ValidationErrors] so the caller can report them all at once.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use time::{Date, PrimitiveDateTime, macros::format_description};

use crate::{Error, money::Money};

/// The largest amount accepted for any single monetary input.
pub const MONEY_CEILING: i64 = 1_000_000;

/// The fewest characters a tractor number may have after trimming.
pub const TRACTOR_NUMBER_MIN_LENGTH: usize = 2;
/// The most characters a tractor number may have after trimming.
pub const TRACTOR_NUMBER_MAX_LENGTH: usize = 20;

/// Every problem found while validating an input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection holding just `message`.
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// `Ok(value)` if nothing was collected, otherwise [Error::Validation].
    pub fn into_result<T>(self, value: T) -> Result<T, Error> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// Check a tractor number and return it trimmed.
///
/// # Errors
/// Returns [Error::Validation] listing every rule the number breaks.
pub fn validate_tractor_number(raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    let mut errors = ValidationErrors::new();

    if trimmed.is_empty() {
        errors.push("tractor number is required");
        return errors.into_result(String::new());
    }

    let length = trimmed.chars().count();
    if length < TRACTOR_NUMBER_MIN_LENGTH {
        errors.push(format!(
            "tractor number must be at least {TRACTOR_NUMBER_MIN_LENGTH} characters"
        ));
    }
    if length > TRACTOR_NUMBER_MAX_LENGTH {
        errors.push(format!(
            "tractor number must be at most {TRACTOR_NUMBER_MAX_LENGTH} characters"
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.push("tractor number may only contain letters, digits, hyphens and underscores");
    }

    errors.into_result(trimmed.to_owned())
}

/// A monetary amount exactly as the client sent it, before validation.
///
/// JSON clients may send either `"1200.50"` or `1200.5`; both are kept as text
/// so that [parse_amount] can report a useful message for bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountInput(String);

impl AmountInput {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Money> for AmountInput {
    fn from(amount: Money) -> Self {
        Self(amount.amount().to_string())
    }
}

impl Serialize for AmountInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AmountInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountInputVisitor)
    }
}

struct AmountInputVisitor;

impl de::Visitor<'_> for AmountInputVisitor {
    type Value = AmountInput;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an amount as a number or a string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<AmountInput, E> {
        Ok(AmountInput::new(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<AmountInput, E> {
        Ok(AmountInput(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<AmountInput, E> {
        Ok(AmountInput(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<AmountInput, E> {
        Ok(AmountInput(value.to_string()))
    }
}

/// Parse and range-check the monetary input for `field`.
///
/// Problems are added to `errors` and `None` is returned.
pub fn parse_amount(
    field: &str,
    raw: &AmountInput,
    errors: &mut ValidationErrors,
) -> Option<Money> {
    let amount: Money = match raw.as_str().parse() {
        Ok(amount) => amount,
        Err(_) => {
            errors.push(format!("{field}: \"{}\" is not a valid amount", raw.as_str()));
            return None;
        }
    };

    if amount.is_negative() {
        errors.push(format!("{field}: amount cannot be negative"));
        return None;
    }

    if amount > Money::from(MONEY_CEILING) {
        errors.push(format!("{field}: amount cannot exceed {MONEY_CEILING}"));
        return None;
    }

    Some(amount)
}

/// [parse_amount] for a field that may be left out.
pub fn parse_optional_amount(
    field: &str,
    raw: Option<&AmountInput>,
    errors: &mut ValidationErrors,
) -> Option<Money> {
    raw.and_then(|raw| parse_amount(field, raw, errors))
}

/// Check that `miles` is a non-negative whole number that fits in a `u32`.
pub fn parse_miles(field: &str, miles: i64, errors: &mut ValidationErrors) -> Option<u32> {
    match u32::try_from(miles) {
        Ok(miles) => Some(miles),
        Err(_) if miles < 0 => {
            errors.push(format!("{field}: miles cannot be negative"));
            None
        }
        Err(_) => {
            errors.push(format!("{field}: {miles} miles is too large"));
            None
        }
    }
}

/// Parse a period string into the date it names.
///
/// Accepts `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` and
/// `YYYY-MM-DDTHH:MM:SS`. Missing components default to the first day of the
/// month and midnight.
pub fn parse_period_date(raw: &str) -> Result<Date, Error> {
    let text = raw.trim();
    let date_format = format_description!("[year]-[month]-[day]");

    let parsed = match text.len() {
        7 => Date::parse(&format!("{text}-01"), date_format),
        10 => Date::parse(text, date_format),
        16 => PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        )
        .map(|date_time| date_time.date()),
        19 => PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
        .map(|date_time| date_time.date()),
        _ => {
            return Err(ValidationErrors::single(format!(
                "\"{text}\" is not a valid period, expected YYYY-MM or YYYY-MM-DD"
            ))
            .into());
        }
    };

    parsed.map_err(|error| {
        ValidationErrors::single(format!("\"{text}\" is not a valid period: {error}")).into()
    })
}
