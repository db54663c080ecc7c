//! Immutable, dated copies of the fleet's fixed costs.
//!
//! A snapshot applies from its period until a snapshot for a later period is
//! taken. Recorded variable costs are bound to the snapshot in effect for their
//! period, so editing the current fixed costs never changes past results.

mod db;
mod domain;
mod handlers;

pub use db::{
    compare_snapshots, create_snapshot, create_snapshot_tables, fixed_costs_for_basis,
    get_latest_snapshot_for, get_snapshot, get_snapshot_details, list_snapshots,
    restore_from_snapshot, snapshot_common_costs, snapshot_truck_costs, snapshot_trucks,
};
pub(crate) use db::insert_snapshot;
pub use domain::{
    CompareSnapshotsForm, CostSnapshot, FixedCostsView, RestoreSummary, SnapshotDetails,
    SnapshotForm, SnapshotId, SnapshotTruckCosts,
};
pub use handlers::{
    SnapshotState, compare_snapshots_endpoint, create_snapshot_endpoint,
    fixed_costs_for_basis_endpoint, get_snapshot_endpoint, list_snapshots_endpoint,
    restore_snapshot_endpoint, snapshot_for_period_endpoint,
};
