//! Database operations for variable costs records and binding them to snapshots.

use rusqlite::{Connection, OptionalExtension, Row, named_params, params};
use time::OffsetDateTime;

use crate::{
    Error,
    costs::{
        NewVariableCosts, SnapshotBinding, SnapshotResolution, VariableCosts, VariableCostsId,
        VariableCostsRecord, VariableCostsRecordUpdate,
    },
    period::Period,
    profitability::delete_cached_calculation,
    snapshot::{SnapshotId, get_latest_snapshot_for, get_snapshot, insert_snapshot},
    truck::{TruckId, ensure_truck_exists},
};

const SELECT_RECORD: &str = "SELECT id, truck_id, period_month, driver_name, revenue, total_miles,
    salary, fuel, tolls, repair, snapshot_id
    FROM truck_variable_costs";

/// Save a period of variable costs and bind it to a snapshot.
///
/// The record and any snapshot created for it are saved in one transaction.
///
/// # Errors
/// Returns [Error::TruckNotFound] if the truck doesn't exist,
/// [Error::DuplicateVariableCosts] if the truck already has a record for the
/// period and [Error::SnapshotNotFound] if an explicit snapshot doesn't exist.
pub fn create_variable_costs(
    new_record: NewVariableCosts,
    connection: &Connection,
) -> Result<(VariableCostsRecord, SnapshotResolution), Error> {
    let transaction = connection.unchecked_transaction()?;

    ensure_truck_exists(new_record.truck_id, &transaction)?;

    if find_record_id(new_record.truck_id, new_record.period, &transaction)?.is_some() {
        return Err(Error::DuplicateVariableCosts {
            truck_id: new_record.truck_id,
            period: new_record.period,
        });
    }

    let (snapshot_id, resolution) =
        bind_snapshot(new_record.snapshot, new_record.period, &transaction)?;

    transaction.execute(
        "INSERT INTO truck_variable_costs (truck_id, period_month, driver_name, revenue,
            total_miles, salary, fuel, tolls, repair, snapshot_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            new_record.truck_id,
            new_record.period,
            new_record.driver_name,
            new_record.revenue,
            new_record.total_miles,
            new_record.costs.salary,
            new_record.costs.fuel,
            new_record.costs.tolls,
            new_record.costs.repair,
            snapshot_id,
        ],
    )?;
    let id = transaction.last_insert_rowid();

    transaction.commit()?;

    tracing::info!(
        "Recorded variable costs {id} for truck {} in {} using snapshot {snapshot_id} ({resolution:?})",
        new_record.truck_id,
        new_record.period
    );

    Ok((
        VariableCostsRecord {
            id,
            truck_id: new_record.truck_id,
            period: new_record.period,
            driver_name: new_record.driver_name,
            revenue: new_record.revenue,
            total_miles: new_record.total_miles,
            costs: new_record.costs,
            snapshot_id,
        },
        resolution,
    ))
}

/// Decide which snapshot a new record for `period` uses.
///
/// An explicit snapshot must exist. Otherwise the snapshot in effect for the
/// period is reused, and if there is none a snapshot of the current fixed costs
/// is created for the period.
pub fn bind_snapshot(
    binding: SnapshotBinding,
    period: Period,
    connection: &Connection,
) -> Result<(SnapshotId, SnapshotResolution), Error> {
    match binding {
        SnapshotBinding::Bound(snapshot_id) => {
            get_snapshot(snapshot_id, connection)?;
            Ok((snapshot_id, SnapshotResolution::Explicit))
        }
        SnapshotBinding::Unbound => match get_latest_snapshot_for(period.first_day(), connection)? {
            Some(snapshot) => {
                tracing::debug!("Reusing snapshot {} for {period}", snapshot.id);
                Ok((snapshot.id, SnapshotResolution::Reused))
            }
            None => {
                let label = format!("Automatic snapshot for {period}");
                let snapshot = insert_snapshot(
                    period.first_day(),
                    Some(&label),
                    OffsetDateTime::now_utc(),
                    connection,
                )?;
                tracing::info!("Created snapshot {} for {period}", snapshot.id);
                Ok((snapshot.id, SnapshotResolution::Minted))
            }
        },
    }
}

/// Retrieve a single record by ID.
pub fn get_variable_costs(
    record_id: VariableCostsId,
    connection: &Connection,
) -> Result<VariableCostsRecord, Error> {
    connection
        .prepare(&format!("{SELECT_RECORD} WHERE id = :id;"))?
        .query_row(&[(":id", &record_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::VariableCostsNotFound(record_id),
            error => error.into(),
        })
}

/// Which records [query_variable_costs] returns. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableCostsFilter {
    pub period: Option<Period>,
    pub truck_id: Option<TruckId>,
}

/// Retrieve the records matching `filter`, newest period first, then by tractor number.
pub fn query_variable_costs(
    filter: VariableCostsFilter,
    connection: &Connection,
) -> Result<Vec<VariableCostsRecord>, Error> {
    connection
        .prepare(
            "SELECT v.id, v.truck_id, v.period_month, v.driver_name, v.revenue, v.total_miles,
                v.salary, v.fuel, v.tolls, v.repair, v.snapshot_id
            FROM truck_variable_costs v
            INNER JOIN truck t ON t.id = v.truck_id
            WHERE (:period IS NULL OR v.period_month = :period)
                AND (:truck_id IS NULL OR v.truck_id = :truck_id)
            ORDER BY v.period_month DESC, t.tractor_no ASC;",
        )?
        .query_map(
            named_params! { ":period": filter.period, ":truck_id": filter.truck_id },
            map_row,
        )?
        .map(|maybe_record| maybe_record.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every record for `period`.
pub fn get_variable_costs_for_period(
    period: Period,
    connection: &Connection,
) -> Result<Vec<VariableCostsRecord>, Error> {
    query_variable_costs(
        VariableCostsFilter {
            period: Some(period),
            truck_id: None,
        },
        connection,
    )
}

/// The periods that have at least one record, newest first.
pub fn get_recorded_periods(connection: &Connection) -> Result<Vec<Period>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT period_month FROM truck_variable_costs ORDER BY period_month DESC;",
        )?
        .query_map([], |row| row.get(0))?
        .map(|maybe_period| maybe_period.map_err(|error| error.into()))
        .collect()
}

/// The number of records that refer to `truck_id`.
pub fn count_records_for_truck(truck_id: TruckId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM truck_variable_costs WHERE truck_id = ?1",
            [truck_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Change some of a record's figures and return the result.
///
/// The record stays bound to the same snapshot. Any cached calculation for the
/// record's truck and period is discarded.
pub fn update_variable_costs(
    record_id: VariableCostsId,
    update: &VariableCostsRecordUpdate,
    connection: &Connection,
) -> Result<VariableCostsRecord, Error> {
    let transaction = connection.unchecked_transaction()?;

    let updated = update.apply_to(get_variable_costs(record_id, &transaction)?);
    transaction.execute(
        "UPDATE truck_variable_costs SET driver_name = ?1, revenue = ?2, total_miles = ?3,
            salary = ?4, fuel = ?5, tolls = ?6, repair = ?7
        WHERE id = ?8",
        params![
            updated.driver_name,
            updated.revenue,
            updated.total_miles,
            updated.costs.salary,
            updated.costs.fuel,
            updated.costs.tolls,
            updated.costs.repair,
            record_id,
        ],
    )?;
    delete_cached_calculation(updated.truck_id, updated.period, &transaction)?;

    transaction.commit()?;

    Ok(updated)
}

/// Delete a record and any cached calculation for it.
pub fn delete_variable_costs(
    record_id: VariableCostsId,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    let record = get_variable_costs(record_id, &transaction)?;
    transaction.execute("DELETE FROM truck_variable_costs WHERE id = ?1", [record_id])?;
    delete_cached_calculation(record.truck_id, record.period, &transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Initialize the variable costs table.
pub fn create_variable_costs_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS truck_variable_costs (
            id INTEGER PRIMARY KEY,
            truck_id INTEGER NOT NULL,
            period_month TEXT NOT NULL,
            driver_name TEXT,
            revenue TEXT NOT NULL,
            total_miles INTEGER NOT NULL CHECK (total_miles >= 0),
            salary TEXT NOT NULL,
            fuel TEXT NOT NULL,
            tolls TEXT NOT NULL,
            repair TEXT NOT NULL,
            snapshot_id INTEGER NOT NULL,
            UNIQUE(truck_id, period_month),
            FOREIGN KEY(truck_id) REFERENCES truck(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            FOREIGN KEY(snapshot_id) REFERENCES cost_snapshot(id) ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_truck_variable_costs_period
            ON truck_variable_costs(period_month);",
    )?;

    Ok(())
}

fn find_record_id(
    truck_id: TruckId,
    period: Period,
    connection: &Connection,
) -> Result<Option<VariableCostsId>, Error> {
    connection
        .query_row(
            "SELECT id FROM truck_variable_costs WHERE truck_id = ?1 AND period_month = ?2",
            params![truck_id, period],
            |row| row.get(0),
        )
        .optional()
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<VariableCostsRecord, rusqlite::Error> {
    Ok(VariableCostsRecord {
        id: row.get(0)?,
        truck_id: row.get(1)?,
        period: row.get(2)?,
        driver_name: row.get(3)?,
        revenue: row.get(4)?,
        total_miles: row.get(5)?,
        costs: VariableCosts {
            salary: row.get(6)?,
            fuel: row.get(7)?,
            tolls: row.get(8)?,
            repair: row.get(9)?,
        },
        snapshot_id: row.get(10)?,
    })
}
