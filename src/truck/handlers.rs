//! Truck registry endpoints.

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
    truck::{
        TractorNumber, Truck, TruckForm, TruckId, TruckSummary, create_truck, delete_truck,
        get_truck, get_truck_summaries, rename_truck,
    },
};

/// The state needed for the truck endpoints.
#[derive(Debug, Clone)]
pub struct TruckState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TruckState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List every truck with a summary of its cost data.
pub async fn list_trucks_endpoint(
    State(state): State<TruckState>,
) -> Result<Json<Vec<TruckSummary>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_truck_summaries(&connection).map(Json)
}

/// Register a new truck.
pub async fn create_truck_endpoint(
    State(state): State<TruckState>,
    JsonBody(form): JsonBody<TruckForm>,
) -> Result<(StatusCode, Json<Truck>), Error> {
    let tractor_number = TractorNumber::new(&form.tractor_number)?;
    let connection = lock_connection(&state.db_connection)?;

    let truck = create_truck(tractor_number, &connection)?;
    tracing::info!("Registered truck {} as {}", truck.id, truck.tractor_number);

    Ok((StatusCode::CREATED, Json(truck)))
}

pub async fn get_truck_endpoint(
    PathParam(truck_id): PathParam<TruckId>,
    State(state): State<TruckState>,
) -> Result<Json<Truck>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_truck(truck_id, &connection).map(Json)
}

/// Change a truck's tractor number.
pub async fn rename_truck_endpoint(
    PathParam(truck_id): PathParam<TruckId>,
    State(state): State<TruckState>,
    JsonBody(form): JsonBody<TruckForm>,
) -> Result<Json<Truck>, Error> {
    let tractor_number = TractorNumber::new(&form.tractor_number)?;
    let connection = lock_connection(&state.db_connection)?;

    rename_truck(truck_id, tractor_number, &connection).map(Json)
}

/// Delete a truck that has no recorded variable costs.
pub async fn delete_truck_endpoint(
    PathParam(truck_id): PathParam<TruckId>,
    State(state): State<TruckState>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_truck(truck_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
