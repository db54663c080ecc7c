//! Database operations for trucks.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    costs::count_records_for_truck,
    truck::{TractorNumber, Truck, TruckId, TruckSummary},
};

/// Register a truck and return it with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateTractorNumber] if another truck already uses the
/// tractor number, ignoring case.
pub fn create_truck(
    tractor_number: TractorNumber,
    connection: &Connection,
) -> Result<Truck, Error> {
    connection
        .execute(
            "INSERT INTO truck (tractor_no) VALUES (?1);",
            (tractor_number.as_ref(),),
        )
        .map_err(|error| map_unique_violation(error, &tractor_number))?;

    let id = connection.last_insert_rowid();

    Ok(Truck { id, tractor_number })
}

/// Retrieve a single truck by ID.
pub fn get_truck(truck_id: TruckId, connection: &Connection) -> Result<Truck, Error> {
    connection
        .prepare("SELECT id, tractor_no FROM truck WHERE id = :id;")?
        .query_row(&[(":id", &truck_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::TruckNotFound(truck_id),
            error => error.into(),
        })
}

/// Return [Error::TruckNotFound] unless `truck_id` refers to a registered truck.
pub fn ensure_truck_exists(truck_id: TruckId, connection: &Connection) -> Result<(), Error> {
    get_truck(truck_id, connection).map(|_| ())
}

/// Retrieve all trucks ordered by tractor number.
pub fn get_all_trucks(connection: &Connection) -> Result<Vec<Truck>, Error> {
    connection
        .prepare("SELECT id, tractor_no FROM truck ORDER BY tractor_no ASC;")?
        .query_map([], map_row)?
        .map(|maybe_truck| maybe_truck.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every truck with counts of the cost data that refers to it.
pub fn get_truck_summaries(connection: &Connection) -> Result<Vec<TruckSummary>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.tractor_no,
                (SELECT COUNT(*) FROM truck_variable_costs v WHERE v.truck_id = t.id),
                EXISTS (SELECT 1 FROM fixed_costs_truck f WHERE f.truck_id = t.id)
            FROM truck t
            ORDER BY t.tractor_no ASC;",
        )?
        .query_map([], |row| {
            let truck = map_row(row)?;

            Ok(TruckSummary {
                id: truck.id,
                tractor_number: truck.tractor_number,
                variable_cost_records: row.get(2)?,
                has_fixed_costs: row.get(3)?,
            })
        })?
        .map(|maybe_summary| maybe_summary.map_err(|error| error.into()))
        .collect()
}

/// Change a truck's tractor number.
///
/// # Errors
/// Returns [Error::TruckNotFound] if the truck doesn't exist, or
/// [Error::DuplicateTractorNumber] if another truck uses the new number.
pub fn rename_truck(
    truck_id: TruckId,
    tractor_number: TractorNumber,
    connection: &Connection,
) -> Result<Truck, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE truck SET tractor_no = ?1 WHERE id = ?2",
            (tractor_number.as_ref(), truck_id),
        )
        .map_err(|error| map_unique_violation(error, &tractor_number))?;

    if rows_affected == 0 {
        return Err(Error::TruckNotFound(truck_id));
    }

    Ok(Truck {
        id: truck_id,
        tractor_number,
    })
}

/// Delete a truck and its current fixed costs.
///
/// Snapshots keep their own copy of the truck's costs and are not changed.
///
/// # Errors
/// Returns [Error::TruckHasCostHistory] if any variable costs have been
/// recorded for the truck, in which case nothing is deleted.
pub fn delete_truck(truck_id: TruckId, connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    ensure_truck_exists(truck_id, &transaction)?;

    let records = count_records_for_truck(truck_id, &transaction)?;
    if records > 0 {
        return Err(Error::TruckHasCostHistory { truck_id, records });
    }

    transaction.execute("DELETE FROM fixed_costs_truck WHERE truck_id = ?1", [truck_id])?;
    transaction.execute("DELETE FROM truck WHERE id = ?1", [truck_id])?;
    transaction.commit()?;

    tracing::info!("Deleted truck {truck_id}");

    Ok(())
}

/// Initialize the truck table.
pub fn create_truck_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS truck (
            id INTEGER PRIMARY KEY,
            tractor_no TEXT NOT NULL UNIQUE COLLATE NOCASE
        );",
        (),
    )?;

    Ok(())
}

fn map_unique_violation(error: rusqlite::Error, tractor_number: &TractorNumber) -> Error {
    match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == 2067 && desc.ends_with("truck.tractor_no") =>
        {
            Error::DuplicateTractorNumber(tractor_number.to_string())
        }
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<Truck, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_tractor_number: String = row.get(1)?;
    let tractor_number = TractorNumber::new_unchecked(&raw_tractor_number);

    Ok(Truck { id, tractor_number })
}

#[cfg(test)]
mod tractor_number_tests {
    use crate::{Error, truck::TractorNumber};

    #[test]
    fn new_fails_on_invalid_characters() {
        let tractor_number = TractorNumber::new("T 101");

        assert!(matches!(tractor_number, Err(Error::Validation(_))));
    }

    #[test]
    fn new_trims_whitespace() {
        let tractor_number = TractorNumber::new("  T-101\n");

        assert_eq!(tractor_number, Ok(TractorNumber::new_unchecked("T-101")));
    }

    #[test]
    fn deserialize_validates() {
        let result = serde_json::from_str::<TractorNumber>("\"!\"");

        assert!(result.is_err());
    }
}

#[cfg(test)]
mod truck_query_tests {
    use std::collections::HashSet;

    use crate::{
        Error,
        costs::{FixedCostsTruck, set_truck_fixed_costs},
        test_utils::{get_test_connection, money, record_variable_costs},
        truck::{
            TractorNumber, create_truck, delete_truck, get_all_trucks, get_truck,
            get_truck_summaries, rename_truck,
        },
    };

    #[test]
    fn create_truck_succeeds() {
        let connection = get_test_connection();
        let tractor_number = TractorNumber::new_unchecked("T-101");

        let truck =
            create_truck(tractor_number.clone(), &connection).expect("Could not create truck");

        assert!(truck.id > 0);
        assert_eq!(truck.tractor_number, tractor_number);
    }

    #[test]
    fn create_truck_rejects_duplicate_ignoring_case() {
        let connection = get_test_connection();
        create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();

        let result = create_truck(TractorNumber::new_unchecked("t-101"), &connection);

        assert_eq!(
            result,
            Err(Error::DuplicateTractorNumber("t-101".to_owned()))
        );
    }

    #[test]
    fn get_truck_with_invalid_id_returns_truck_not_found() {
        let connection = get_test_connection();
        let truck = create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();

        let result = get_truck(truck.id + 42, &connection);

        assert_eq!(result, Err(Error::TruckNotFound(truck.id + 42)));
    }

    #[test]
    fn get_all_trucks_returns_every_truck() {
        let connection = get_test_connection();
        let want = HashSet::from([
            create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap(),
            create_truck(TractorNumber::new_unchecked("T-102"), &connection).unwrap(),
        ]);

        let got = HashSet::from_iter(get_all_trucks(&connection).unwrap());

        assert_eq!(got, want);
    }

    #[test]
    fn rename_truck_succeeds() {
        let connection = get_test_connection();
        let truck = create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();

        rename_truck(truck.id, TractorNumber::new_unchecked("T-900"), &connection).unwrap();

        let got = get_truck(truck.id, &connection).unwrap();
        assert_eq!(got.tractor_number.as_ref(), "T-900");
    }

    #[test]
    fn rename_truck_to_taken_number_fails() {
        let connection = get_test_connection();
        create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();
        let truck = create_truck(TractorNumber::new_unchecked("T-102"), &connection).unwrap();

        let result = rename_truck(truck.id, TractorNumber::new_unchecked("T-101"), &connection);

        assert_eq!(
            result,
            Err(Error::DuplicateTractorNumber("T-101".to_owned()))
        );
    }

    #[test]
    fn rename_missing_truck_fails() {
        let connection = get_test_connection();

        let result = rename_truck(7, TractorNumber::new_unchecked("T-101"), &connection);

        assert_eq!(result, Err(Error::TruckNotFound(7)));
    }

    #[test]
    fn delete_truck_removes_truck_and_fixed_costs() {
        let connection = get_test_connection();
        let truck = create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();
        let fixed = FixedCostsTruck {
            truck_payment: money("1000"),
            ..Default::default()
        };
        set_truck_fixed_costs(truck.id, &fixed, &connection).unwrap();

        delete_truck(truck.id, &connection).expect("Could not delete truck");

        assert_eq!(
            get_truck(truck.id, &connection),
            Err(Error::TruckNotFound(truck.id))
        );
        let fixed_rows: i64 = connection
            .query_row("SELECT COUNT(*) FROM fixed_costs_truck", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fixed_rows, 0);
    }

    #[test]
    fn delete_truck_with_cost_history_fails_and_keeps_truck() {
        let connection = get_test_connection();
        let truck = create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();
        record_variable_costs(truck.id, "2025-01", &connection);

        let result = delete_truck(truck.id, &connection);

        assert_eq!(
            result,
            Err(Error::TruckHasCostHistory {
                truck_id: truck.id,
                records: 1
            })
        );
        assert_eq!(get_truck(truck.id, &connection), Ok(truck));
    }

    #[test]
    fn summaries_count_cost_data() {
        let connection = get_test_connection();
        let busy = create_truck(TractorNumber::new_unchecked("T-101"), &connection).unwrap();
        let idle = create_truck(TractorNumber::new_unchecked("T-102"), &connection).unwrap();
        set_truck_fixed_costs(busy.id, &FixedCostsTruck::default(), &connection).unwrap();
        record_variable_costs(busy.id, "2025-01", &connection);
        record_variable_costs(busy.id, "2025-02", &connection);

        let summaries = get_truck_summaries(&connection).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, busy.id);
        assert_eq!(summaries[0].variable_cost_records, 2);
        assert!(summaries[0].has_fixed_costs);
        assert_eq!(summaries[1].id, idle.id);
        assert_eq!(summaries[1].variable_cost_records, 0);
        assert!(!summaries[1].has_fixed_costs);
    }
}
