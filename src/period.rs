//! Calendar months and the selector for which fixed costs apply to a calculation.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use time::{Date, Month};

use crate::{
    Error,
    snapshot::SnapshotId,
    validation::{ValidationErrors, parse_period_date},
};

/// The earliest year a period may fall in.
pub const MIN_YEAR: i32 = 1900;
/// The latest year a period may fall in.
pub const MAX_YEAR: i32 = 9999;

/// A calendar month, e.g. March 2025.
///
/// Stored as the first day of the month so that ordering, storage and
/// conversion to dates all come from [Date].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(Date);

impl Period {
    /// Create a period from a year and a month number (1-12).
    ///
    /// # Errors
    /// Returns [Error::Validation] if the month is outside 1-12 or the year is
    /// outside [MIN_YEAR] to [MAX_YEAR]. Both problems are reported together.
    pub fn new(year: i32, month_number: u8) -> Result<Self, Error> {
        let mut errors = ValidationErrors::new();

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            errors.push(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
            ));
        }

        let month = match Month::try_from(month_number) {
            Ok(month) => Some(month),
            Err(_) => {
                errors.push(format!(
                    "month must be between 1 and 12, got {month_number}"
                ));
                None
            }
        };

        errors.into_result(())?;

        let first_day = month
            .and_then(|month| Date::from_calendar_date(year, month, 1).ok())
            .ok_or_else(|| {
                ValidationErrors::single(format!("{year}-{month_number:02} is not a valid month"))
            })?;

        Ok(Self(first_day))
    }

    /// The period containing `date`.
    pub fn from_date(date: Date) -> Result<Self, Error> {
        Self::new(date.year(), date.month().into())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// The month number, 1-12.
    pub fn month(&self) -> u8 {
        self.0.month().into()
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        self.0
    }

    /// The following month, saturating at December [MAX_YEAR].
    pub fn next(self) -> Self {
        let (year, month) = match self.month() {
            12 => (self.year() + 1, 1),
            month => (self.year(), month + 1),
        };

        Self::new(year, month).unwrap_or(self)
    }

    /// The preceding month, saturating at January [MIN_YEAR].
    pub fn previous(self) -> Self {
        let (year, month) = match self.month() {
            1 => (self.year() - 1, 12),
            month => (self.year(), month - 1),
        };

        Self::new(year, month).unwrap_or(self)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Period {
    type Err = Error;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` and `YYYY-MM-DDTHH:MM:SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_period_date(s).and_then(Period::from_date)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl ToSql for Period {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for Period {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Date::column_result(value).and_then(|date| {
            Period::from_date(date).map_err(|error| FromSqlError::Other(error.to_string().into()))
        })
    }
}

/// Which fixed costs apply to a profitability calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostBasis {
    /// The live current fixed costs, written as `current`.
    Current,
    /// The snapshot in effect for the period, or the live costs if there is none.
    Period(Period),
    /// A specific snapshot, written as `snapshot:<id>`.
    Snapshot(SnapshotId),
}

const CURRENT_TOKEN: &str = "current";
const SNAPSHOT_PREFIX: &str = "snapshot:";

impl Display for CostBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostBasis::Current => f.write_str(CURRENT_TOKEN),
            CostBasis::Period(period) => write!(f, "{period}"),
            CostBasis::Snapshot(snapshot_id) => write!(f, "{SNAPSHOT_PREFIX}{snapshot_id}"),
        }
    }
}

impl FromStr for CostBasis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();

        if text.eq_ignore_ascii_case(CURRENT_TOKEN) {
            return Ok(CostBasis::Current);
        }

        if let Some(raw_id) = text.strip_prefix(SNAPSHOT_PREFIX) {
            return raw_id
                .trim()
                .parse()
                .map(CostBasis::Snapshot)
                .map_err(|_| {
                    ValidationErrors::single(format!("\"{raw_id}\" is not a valid snapshot ID"))
                        .into()
                });
        }

        text.parse().map(CostBasis::Period)
    }
}

impl Serialize for CostBasis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CostBasis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}


#[cfg(test)]
mod cost_basis_tests {
    use crate::period::{CostBasis, Period};

    #[test]
    fn parses_current_token() {
        assert_eq!("current".parse(), Ok(CostBasis::Current));
        assert_eq!("Current".parse(), Ok(CostBasis::Current));
    }

    #[test]
    fn parses_snapshot_reference() {
        assert_eq!("snapshot:42".parse(), Ok(CostBasis::Snapshot(42)));
    }

    #[test]
    fn rejects_bad_snapshot_reference() {
        assert!("snapshot:abc".parse::<CostBasis>().is_err());
    }

    #[test]
    fn parses_period() {
        assert_eq!(
            "2025-02".parse(),
            Ok(CostBasis::Period(Period::new(2025, 2).unwrap()))
        );
    }

    #[test]
    fn display_parses_back() {
        for basis in [
            CostBasis::Current,
            CostBasis::Snapshot(7),
            CostBasis::Period(Period::new(2025, 2).unwrap()),
        ] {
            assert_eq!(basis.to_string().parse(), Ok(basis));
        }
    }
}
