//! Fleet endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    extract::{JsonBody, PathParam},
    fleet::{FleetAnalysis, FleetReport, FleetSummaryForm, fleet_summary, profitability_analysis},
    period::Period,
};

/// The state needed for the fleet endpoints.
#[derive(Debug, Clone)]
pub struct FleetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FleetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Summarize the fleet from figures in the request.
pub async fn fleet_summary_endpoint(
    State(state): State<FleetState>,
    JsonBody(form): JsonBody<FleetSummaryForm>,
) -> Result<Json<FleetReport>, Error> {
    let (basis, entries) = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    fleet_summary(&entries, basis, &connection).map(Json)
}

/// The graded fleet report for a recorded period.
pub async fn fleet_period_report_endpoint(
    PathParam(period): PathParam<String>,
    State(state): State<FleetState>,
) -> Result<Json<FleetAnalysis>, Error> {
    let period: Period = period.parse()?;
    let connection = lock_connection(&state.db_connection)?;

    profitability_analysis(period, &connection).map(Json)
}
