#![allow(missing_docs)]

use axum_test::TestServer;
use rusqlite::Connection;

use crate::{
    AppState, build_router,
    costs::{
        NewVariableCosts, SnapshotBinding, VariableCosts, VariableCostsRecord,
        create_variable_costs,
    },
    db::initialize,
    money::Money,
    truck::{TractorNumber, Truck, TruckId, create_truck},
};

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database.");
    initialize(&connection).expect("Could not initialize database.");

    connection
}

/// Parse `amount` as [Money], panicking if it is not a decimal number.
#[track_caller]
pub(crate) fn money(amount: &str) -> Money {
    amount
        .parse()
        .unwrap_or_else(|error| panic!("Invalid test amount {amount:?}: {error}"))
}

#[track_caller]
pub(crate) fn create_test_truck(tractor_number: &str, connection: &Connection) -> Truck {
    create_truck(TractorNumber::new_unchecked(tractor_number), connection)
        .expect("Could not create test truck.")
}

/// Record 15,000 revenue over 4,500 miles with 5,500 of variable costs for
/// `truck_id` in `period`, bound to whichever snapshot applies.
#[track_caller]
pub(crate) fn record_variable_costs(
    truck_id: TruckId,
    period: &str,
    connection: &Connection,
) -> VariableCostsRecord {
    let new_record = NewVariableCosts {
        truck_id,
        period: period.parse().expect("Invalid test period."),
        driver_name: None,
        revenue: money("15000"),
        total_miles: 4500,
        costs: VariableCosts {
            salary: money("3000"),
            fuel: money("2000"),
            tolls: money("500"),
            repair: money("0"),
        },
        snapshot: SnapshotBinding::Unbound,
    };

    create_variable_costs(new_record, connection)
        .map(|(record, _)| record)
        .expect("Could not record test variable costs.")
}

/// A server for the full router backed by an empty in-memory database.
pub(crate) fn get_test_server() -> TestServer {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database.");
    let state = AppState::new(connection).expect("Could not create app state.");

    TestServer::new(build_router(state))
}
