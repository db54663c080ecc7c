//! Snapshot domain types.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    costs::{FixedCostsCommon, FixedCostsTruck},
    money::Money,
    period::{CostBasis, Period},
    truck::TruckId,
    validation::ValidationErrors,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Database identifier for a snapshot.
pub type SnapshotId = i64;

/// A frozen copy of the fleet's fixed costs, taken for a period.
///
/// Snapshots are never changed after they are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub id: SnapshotId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// The first day of the period the snapshot applies from.
    #[serde(with = "iso_date")]
    pub period_date: Date,
    pub label: Option<String>,
}

/// One truck's fixed costs as captured by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTruckCosts {
    pub truck_id: TruckId,
    /// The tractor number when the snapshot was taken.
    pub tractor_number: String,
    pub costs: FixedCostsTruck,
}

/// A snapshot with all of the costs it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDetails {
    #[serde(flatten)]
    pub snapshot: CostSnapshot,
    pub common: FixedCostsCommon,
    pub trucks: Vec<SnapshotTruckCosts>,
    pub common_total: Money,
    /// The sum of every truck's fixed costs.
    pub trucks_total: Money,
}

impl SnapshotDetails {
    pub fn new(
        snapshot: CostSnapshot,
        common: FixedCostsCommon,
        trucks: Vec<SnapshotTruckCosts>,
    ) -> Self {
        Self {
            common_total: common.total(),
            trucks_total: trucks.iter().map(|truck| truck.costs.total()).sum(),
            snapshot,
            common,
            trucks,
        }
    }
}

/// What [restore_from_snapshot](crate::snapshot::restore_from_snapshot) changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreSummary {
    pub snapshot_id: SnapshotId,
    pub restored_trucks: Vec<TruckId>,
    /// Trucks in the snapshot that have since been deleted.
    pub skipped_trucks: Vec<TruckId>,
}

/// The fixed costs in effect for a [CostBasis].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCostsView {
    pub basis: CostBasis,
    /// The snapshot the costs came from, or `None` for the live costs.
    pub snapshot: Option<CostSnapshot>,
    pub common: FixedCostsCommon,
    pub trucks: Vec<SnapshotTruckCosts>,
}

/// Form data for taking a snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotForm {
    /// Any date in the period, or the period itself, e.g. "2025-03".
    pub period: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl SnapshotForm {
    /// The first day of the period and the label, if one was given.
    pub fn validate(&self) -> Result<(Date, Option<String>), Error> {
        let period: Period = self.period.parse()?;
        let label = self
            .label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_owned);

        Ok((period.first_day(), label))
    }
}

/// Form data for comparing snapshots.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompareSnapshotsForm {
    pub snapshot_ids: Vec<SnapshotId>,
}

impl CompareSnapshotsForm {
    /// The distinct snapshot IDs, of which there must be at least two.
    pub fn validate(&self) -> Result<Vec<SnapshotId>, Error> {
        let mut snapshot_ids = self.snapshot_ids.clone();
        snapshot_ids.sort_unstable();
        snapshot_ids.dedup();

        if snapshot_ids.len() < 2 {
            return Err(ValidationErrors::single(
                "at least two different snapshots are needed for a comparison",
            )
            .into());
        }

        Ok(snapshot_ids)
    }
}
