//! Core truck domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, validation::validate_tractor_number};

/// A validated tractor number, e.g. "T-101".
///
/// Two tractor numbers that differ only in case refer to the same truck.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct TractorNumber(String);

impl TractorNumber {
    /// Create a tractor number.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] listing every rule `number` breaks: it
    /// must be 2-20 characters after trimming and contain only letters,
    /// digits, hyphens and underscores.
    pub fn new(number: &str) -> Result<Self, Error> {
        validate_tractor_number(number).map(Self)
    }

    /// Create a tractor number without validation.
    ///
    /// The caller should ensure that the string follows the rules in [TractorNumber::new].
    pub fn new_unchecked(number: &str) -> Self {
        Self(number.to_owned())
    }
}

impl AsRef<str> for TractorNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TractorNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TractorNumber::new(s)
    }
}

impl TryFrom<String> for TractorNumber {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TractorNumber::new(&value)
    }
}

impl From<TractorNumber> for String {
    fn from(value: TractorNumber) -> Self {
        value.0
    }
}

impl Display for TractorNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a truck.
pub type TruckId = i64;

/// A truck in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Truck {
    pub id: TruckId,
    pub tractor_number: TractorNumber,
}

/// A truck along with how much cost data refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckSummary {
    pub id: TruckId,
    pub tractor_number: TractorNumber,
    /// The number of periods with recorded variable costs.
    pub variable_cost_records: i64,
    pub has_fixed_costs: bool,
}

/// Form data for registering and renaming trucks.
#[derive(Debug, Serialize, Deserialize)]
pub struct TruckForm {
    pub tractor_number: String,
}
