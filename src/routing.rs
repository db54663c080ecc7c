//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    costs::{
        create_variable_costs_endpoint, delete_variable_costs_endpoint,
        get_common_fixed_costs_endpoint, get_truck_fixed_costs_endpoint,
        get_variable_costs_endpoint, list_periods_endpoint, list_variable_costs_endpoint,
        update_common_fixed_costs_endpoint, update_truck_fixed_costs_endpoint,
        update_variable_costs_endpoint,
    },
    endpoints,
    fleet::{fleet_period_report_endpoint, fleet_summary_endpoint},
    not_found::get_404_not_found,
    profitability::{
        calculate_profitability_endpoint, recalculate_period_endpoint,
        record_profitability_endpoint, trends_endpoint,
    },
    snapshot::{
        compare_snapshots_endpoint, create_snapshot_endpoint, fixed_costs_for_basis_endpoint,
        get_snapshot_endpoint, list_snapshots_endpoint, restore_snapshot_endpoint,
        snapshot_for_period_endpoint,
    },
    truck::{
        create_truck_endpoint, delete_truck_endpoint, get_truck_endpoint, list_trucks_endpoint,
        rename_truck_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let truck_routes = Router::new()
        .route(
            endpoints::TRUCKS,
            get(list_trucks_endpoint).post(create_truck_endpoint),
        )
        .route(
            endpoints::TRUCK,
            get(get_truck_endpoint)
                .put(rename_truck_endpoint)
                .delete(delete_truck_endpoint),
        );

    let cost_routes = Router::new()
        .route(
            endpoints::TRUCK_FIXED_COSTS,
            get(get_truck_fixed_costs_endpoint).put(update_truck_fixed_costs_endpoint),
        )
        .route(
            endpoints::COMMON_FIXED_COSTS,
            get(get_common_fixed_costs_endpoint).put(update_common_fixed_costs_endpoint),
        )
        .route(
            endpoints::FIXED_COSTS_FOR_BASIS,
            get(fixed_costs_for_basis_endpoint),
        )
        .route(
            endpoints::VARIABLE_COSTS,
            get(list_variable_costs_endpoint).post(create_variable_costs_endpoint),
        )
        .route(
            endpoints::VARIABLE_COSTS_RECORD,
            get(get_variable_costs_endpoint)
                .put(update_variable_costs_endpoint)
                .delete(delete_variable_costs_endpoint),
        )
        .route(endpoints::PERIODS, get(list_periods_endpoint));

    let snapshot_routes = Router::new()
        .route(
            endpoints::SNAPSHOTS,
            get(list_snapshots_endpoint).post(create_snapshot_endpoint),
        )
        .route(endpoints::COMPARE_SNAPSHOTS, post(compare_snapshots_endpoint))
        .route(
            endpoints::SNAPSHOT_FOR_PERIOD,
            get(snapshot_for_period_endpoint),
        )
        .route(endpoints::SNAPSHOT, get(get_snapshot_endpoint))
        .route(endpoints::RESTORE_SNAPSHOT, post(restore_snapshot_endpoint));

    let profitability_routes = Router::new()
        .route(
            endpoints::PROFITABILITY,
            post(calculate_profitability_endpoint),
        )
        .route(
            endpoints::RECORD_PROFITABILITY,
            get(record_profitability_endpoint),
        )
        .route(endpoints::PROFITABILITY_TRENDS, get(trends_endpoint))
        .route(
            endpoints::RECALCULATE_PERIOD,
            post(recalculate_period_endpoint),
        )
        .route(endpoints::FLEET_SUMMARY, post(fleet_summary_endpoint))
        .route(
            endpoints::FLEET_PERIOD_REPORT,
            get(fleet_period_report_endpoint),
        );

    truck_routes
        .merge(cost_routes)
        .merge(snapshot_routes)
        .merge(profitability_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::get_test_server,
        truck::Truck,
    };

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = get_test_server();

        let response = server.get("/api/nothing_here").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["error"], "not_found");
    }

    #[tokio::test]
    async fn periods_list_starts_with_current() {
        let server = get_test_server();

        let periods = server.get(endpoints::PERIODS).await.json::<Vec<String>>();

        assert_eq!(periods, vec!["current".to_owned()]);
    }

    #[tokio::test]
    async fn compare_route_is_not_taken_for_a_snapshot_id() {
        let server = get_test_server();

        server
            .get(endpoints::COMPARE_SNAPSHOTS)
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn truck_with_history_cannot_be_deleted() {
        let server = get_test_server();
        let truck = server
            .post(endpoints::TRUCKS)
            .json(&json!({ "tractor_number": "T-101" }))
            .await
            .json::<Truck>();
        server
            .post(endpoints::VARIABLE_COSTS)
            .json(&json!({
                "truck_id": truck.id,
                "period": "2025-01",
                "revenue": "1000",
                "total_miles": 100,
                "salary": "100",
                "fuel": "100",
                "tolls": "0"
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete(&format_endpoint(endpoints::TRUCK, truck.id))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        server
            .get(&format_endpoint(endpoints::TRUCK, truck.id))
            .await
            .assert_status_ok();
    }
}
