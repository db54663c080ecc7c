//! Profitability endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    extract::{JsonBody, PathParam, QueryParams},
    costs::VariableCostsId,
    period::Period,
    profitability::{
        CachedCalculation, ProfitabilityForm, TruckProfitability, calculate_for_record,
        calculate_profitability, get_trends, recalculate_period,
    },
};

/// The state needed for the profitability endpoints.
#[derive(Debug, Clone)]
pub struct ProfitabilityState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfitabilityState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Calculate one truck's profitability from figures in the request.
pub async fn calculate_profitability_endpoint(
    State(state): State<ProfitabilityState>,
    JsonBody(form): JsonBody<ProfitabilityForm>,
) -> Result<Json<TruckProfitability>, Error> {
    let request = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    calculate_profitability(&request, &connection).map(Json)
}

pub async fn record_profitability_endpoint(
    PathParam(record_id): PathParam<VariableCostsId>,
    State(state): State<ProfitabilityState>,
) -> Result<Json<TruckProfitability>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    calculate_for_record(record_id, &connection).map(Json)
}

/// The query parameters for profitability trends.
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub start: String,
    pub end: String,
}

pub async fn trends_endpoint(
    State(state): State<ProfitabilityState>,
    QueryParams(query): QueryParams<TrendsQuery>,
) -> Result<Json<Vec<CachedCalculation>>, Error> {
    let start: Period = query.start.parse()?;
    let end: Period = query.end.parse()?;
    let connection = lock_connection(&state.db_connection)?;

    get_trends(start, end, &connection).map(Json)
}

/// Recalculate and store every recorded truck's profitability for a period.
pub async fn recalculate_period_endpoint(
    PathParam(period): PathParam<String>,
    State(state): State<ProfitabilityState>,
) -> Result<Json<Vec<TruckProfitability>>, Error> {
    let period: Period = period.parse()?;
    let connection = lock_connection(&state.db_connection)?;

    recalculate_period(period, &connection).map(Json)
}
