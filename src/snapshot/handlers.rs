//! Snapshot endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    extract::{JsonBody, PathParam},
    period::{CostBasis, Period},
    snapshot::{
        CompareSnapshotsForm, CostSnapshot, FixedCostsView, RestoreSummary, SnapshotDetails,
        SnapshotForm, SnapshotId, compare_snapshots, create_snapshot, fixed_costs_for_basis,
        get_latest_snapshot_for, get_snapshot_details, list_snapshots, restore_from_snapshot,
    },
};

/// The state needed for the snapshot endpoints.
#[derive(Debug, Clone)]
pub struct SnapshotState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SnapshotState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn list_snapshots_endpoint(
    State(state): State<SnapshotState>,
) -> Result<Json<Vec<CostSnapshot>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_snapshots(&connection).map(Json)
}

/// Take a snapshot of the current fixed costs.
pub async fn create_snapshot_endpoint(
    State(state): State<SnapshotState>,
    JsonBody(form): JsonBody<SnapshotForm>,
) -> Result<(StatusCode, Json<CostSnapshot>), Error> {
    let (period_date, label) = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let snapshot = create_snapshot(period_date, label.as_deref(), &connection)?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn get_snapshot_endpoint(
    PathParam(snapshot_id): PathParam<SnapshotId>,
    State(state): State<SnapshotState>,
) -> Result<Json<SnapshotDetails>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_snapshot_details(snapshot_id, &connection).map(Json)
}

/// The snapshot in effect for a period, or `null` if there is none.
pub async fn snapshot_for_period_endpoint(
    PathParam(period): PathParam<String>,
    State(state): State<SnapshotState>,
) -> Result<Json<Option<CostSnapshot>>, Error> {
    let period: Period = period.parse()?;
    let connection = lock_connection(&state.db_connection)?;

    get_latest_snapshot_for(period.first_day(), &connection).map(Json)
}

/// Overwrite the current fixed costs with a snapshot's costs.
pub async fn restore_snapshot_endpoint(
    PathParam(snapshot_id): PathParam<SnapshotId>,
    State(state): State<SnapshotState>,
) -> Result<Json<RestoreSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    restore_from_snapshot(snapshot_id, &connection).map(Json)
}

pub async fn compare_snapshots_endpoint(
    State(state): State<SnapshotState>,
    JsonBody(form): JsonBody<CompareSnapshotsForm>,
) -> Result<Json<Vec<SnapshotDetails>>, Error> {
    let snapshot_ids = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    compare_snapshots(&snapshot_ids, &connection).map(Json)
}

/// The fixed costs in effect for `current`, a period or `snapshot:<id>`.
pub async fn fixed_costs_for_basis_endpoint(
    PathParam(basis): PathParam<String>,
    State(state): State<SnapshotState>,
) -> Result<Json<FixedCostsView>, Error> {
    let basis: CostBasis = basis.parse()?;
    let connection = lock_connection(&state.db_connection)?;

    fixed_costs_for_basis(basis, &connection).map(Json)
}
