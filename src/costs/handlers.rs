//! Endpoints for current fixed costs and variable costs records.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    app_state::lock_connection,
    extract::{JsonBody, PathParam, QueryParams},
    costs::{
        FixedCostsCommon, FixedCostsCommonForm, FixedCostsTruck, FixedCostsTruckForm,
        SnapshotResolution, VariableCostsFilter, VariableCostsForm, VariableCostsId,
        VariableCostsRecord, VariableCostsUpdateForm, create_variable_costs,
        current_common_fixed_costs, current_truck_fixed_costs, delete_variable_costs,
        get_recorded_periods, get_variable_costs, query_variable_costs,
        update_common_fixed_costs, update_truck_fixed_costs, update_variable_costs,
    },
    period::Period,
    truck::{TruckId, ensure_truck_exists},
};

/// The state needed for the cost endpoints.
#[derive(Debug, Clone)]
pub struct CostsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CostsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_truck_fixed_costs_endpoint(
    PathParam(truck_id): PathParam<TruckId>,
    State(state): State<CostsState>,
) -> Result<Json<FixedCostsTruck>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    ensure_truck_exists(truck_id, &connection)?;

    current_truck_fixed_costs(truck_id, &connection).map(Json)
}

/// Change some of a truck's current fixed costs.
pub async fn update_truck_fixed_costs_endpoint(
    PathParam(truck_id): PathParam<TruckId>,
    State(state): State<CostsState>,
    JsonBody(form): JsonBody<FixedCostsTruckForm>,
) -> Result<Json<FixedCostsTruck>, Error> {
    let update = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    update_truck_fixed_costs(truck_id, &update, &connection).map(Json)
}

pub async fn get_common_fixed_costs_endpoint(
    State(state): State<CostsState>,
) -> Result<Json<FixedCostsCommon>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    current_common_fixed_costs(&connection).map(Json)
}

/// Change some of the fleet's current common fixed costs.
pub async fn update_common_fixed_costs_endpoint(
    State(state): State<CostsState>,
    JsonBody(form): JsonBody<FixedCostsCommonForm>,
) -> Result<Json<FixedCostsCommon>, Error> {
    let update = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    update_common_fixed_costs(&update, &connection).map(Json)
}

/// The query parameters for listing variable costs records.
#[derive(Debug, Default, Deserialize)]
pub struct VariableCostsQuery {
    pub period: Option<String>,
    pub truck_id: Option<TruckId>,
}

pub async fn list_variable_costs_endpoint(
    State(state): State<CostsState>,
    QueryParams(query): QueryParams<VariableCostsQuery>,
) -> Result<Json<Vec<VariableCostsRecord>>, Error> {
    let period = query
        .period
        .as_deref()
        .map(str::parse::<Period>)
        .transpose()?;
    let connection = lock_connection(&state.db_connection)?;

    query_variable_costs(
        VariableCostsFilter {
            period,
            truck_id: query.truck_id,
        },
        &connection,
    )
    .map(Json)
}

/// A newly saved record and how its snapshot was chosen.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedVariableCosts {
    pub record: VariableCostsRecord,
    pub snapshot_resolution: SnapshotResolution,
}

/// Record a period of variable costs for a truck.
pub async fn create_variable_costs_endpoint(
    State(state): State<CostsState>,
    JsonBody(form): JsonBody<VariableCostsForm>,
) -> Result<(StatusCode, Json<CreatedVariableCosts>), Error> {
    let new_record = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let (record, snapshot_resolution) = create_variable_costs(new_record, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedVariableCosts {
            record,
            snapshot_resolution,
        }),
    ))
}

pub async fn get_variable_costs_endpoint(
    PathParam(record_id): PathParam<VariableCostsId>,
    State(state): State<CostsState>,
) -> Result<Json<VariableCostsRecord>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_variable_costs(record_id, &connection).map(Json)
}

/// Change some of a record's figures. The snapshot binding is kept.
pub async fn update_variable_costs_endpoint(
    PathParam(record_id): PathParam<VariableCostsId>,
    State(state): State<CostsState>,
    JsonBody(form): JsonBody<VariableCostsUpdateForm>,
) -> Result<Json<VariableCostsRecord>, Error> {
    let update = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    update_variable_costs(record_id, &update, &connection).map(Json)
}

pub async fn delete_variable_costs_endpoint(
    PathParam(record_id): PathParam<VariableCostsId>,
    State(state): State<CostsState>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_variable_costs(record_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the periods with recorded costs, newest first, after the `current` option.
pub async fn list_periods_endpoint(
    State(state): State<CostsState>,
) -> Result<Json<Vec<String>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let periods = get_recorded_periods(&connection)?;

    Ok(Json(
        std::iter::once("current".to_owned())
            .chain(periods.iter().map(Period::to_string))
            .collect(),
    ))
}

#[cfg(test)]
mod cost_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        costs::{
            CreatedVariableCosts, FixedCostsCommon, FixedCostsTruck, SnapshotResolution,
            VariableCostsRecord,
        },
        endpoints::{self, format_endpoint},
        test_utils::{get_test_server, money},
        truck::Truck,
    };

    async fn register_truck(server: &axum_test::TestServer, tractor_number: &str) -> Truck {
        server
            .post(endpoints::TRUCKS)
            .json(&json!({ "tractor_number": tractor_number }))
            .await
            .json::<Truck>()
    }

    fn variable_costs_body(truck_id: i64, period: &str) -> Value {
        json!({
            "truck_id": truck_id,
            "period": period,
            "driver_name": "Sam",
            "revenue": "15000",
            "total_miles": 4500,
            "salary": 3000,
            "fuel": "2000.00",
            "tolls": 500,
        })
    }

    #[tokio::test]
    async fn truck_fixed_costs_partial_update() {
        let server = get_test_server();
        let truck = register_truck(&server, "T-101").await;
        let path = format_endpoint(endpoints::TRUCK_FIXED_COSTS, truck.id);

        server
            .put(&path)
            .json(&json!({ "truck_payment": "500", "trailer_payment": 200 }))
            .await
            .assert_status_ok();
        server
            .put(&path)
            .json(&json!({ "trailer_payment": "250" }))
            .await
            .assert_status_ok();

        let costs = server.get(&path).await.json::<FixedCostsTruck>();
        assert_eq!(costs.truck_payment, money("500"));
        assert_eq!(costs.trailer_payment, money("250"));
    }

    #[tokio::test]
    async fn truck_fixed_costs_for_missing_truck_is_not_found() {
        let server = get_test_server();

        server
            .get(&format_endpoint(endpoints::TRUCK_FIXED_COSTS, 404))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn common_fixed_costs_reject_negative_and_oversized_amounts() {
        let server = get_test_server();

        let response = server
            .put(endpoints::COMMON_FIXED_COSTS)
            .json(&json!({ "ifta": "-1", "eld": "1000001" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["details"].as_array().map(Vec::len),
            Some(2)
        );
        assert_eq!(
            server
                .get(endpoints::COMMON_FIXED_COSTS)
                .await
                .json::<FixedCostsCommon>(),
            FixedCostsCommon::default()
        );
    }

    #[tokio::test]
    async fn create_variable_costs_reports_binding() {
        let server = get_test_server();
        let truck = register_truck(&server, "T-101").await;

        let first = server
            .post(endpoints::VARIABLE_COSTS)
            .json(&variable_costs_body(truck.id, "2025-01"))
            .await;
        first.assert_status(StatusCode::CREATED);
        let second = server
            .post(endpoints::VARIABLE_COSTS)
            .json(&variable_costs_body(truck.id, "2025-02"))
            .await
            .json::<CreatedVariableCosts>();

        let first = first.json::<CreatedVariableCosts>();
        assert_eq!(first.snapshot_resolution, SnapshotResolution::Minted);
        assert_eq!(second.snapshot_resolution, SnapshotResolution::Reused);
        assert_eq!(second.record.snapshot_id, first.record.snapshot_id);
    }

    #[tokio::test]
    async fn duplicate_variable_costs_is_conflict() {
        let server = get_test_server();
        let truck = register_truck(&server, "T-101").await;
        server
            .post(endpoints::VARIABLE_COSTS)
            .json(&variable_costs_body(truck.id, "2025-01"))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post(endpoints::VARIABLE_COSTS)
            .json(&variable_costs_body(truck.id, "2025-01-20"))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_update_and_delete_variable_costs() {
        let server = get_test_server();
        let truck = register_truck(&server, "T-101").await;
        let created = server
            .post(endpoints::VARIABLE_COSTS)
            .json(&variable_costs_body(truck.id, "2025-01"))
            .await
            .json::<CreatedVariableCosts>();
        let record_path = format_endpoint(endpoints::VARIABLE_COSTS_RECORD, created.record.id);

        let updated = server
            .put(&record_path)
            .json(&json!({ "repair": "125.50" }))
            .await
            .json::<VariableCostsRecord>();
        let listed = server
            .get(endpoints::VARIABLE_COSTS)
            .add_query_param("period", "2025-01")
            .await
            .json::<Vec<VariableCostsRecord>>();
        server
            .delete(&record_path)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        assert_eq!(updated.costs.repair, money("125.50"));
        assert_eq!(listed, vec![updated]);
        server
            .get(&record_path)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn periods_start_with_current() {
        let server = get_test_server();
        let truck = register_truck(&server, "T-101").await;
        for period in ["2025-01", "2025-03"] {
            server
                .post(endpoints::VARIABLE_COSTS)
                .json(&variable_costs_body(truck.id, period))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let periods = server.get(endpoints::PERIODS).await.json::<Vec<String>>();

        assert_eq!(periods, vec!["current", "2025-03", "2025-01"]);
    }
}
