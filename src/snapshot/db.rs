//! Database operations for cost snapshots.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    costs::{
        FixedCostsCommon, FixedCostsTruck, current_common_fixed_costs, current_truck_fixed_costs,
        map_common_row, map_truck_row, set_common_fixed_costs, set_truck_fixed_costs,
    },
    period::{CostBasis, Period},
    snapshot::{
        CostSnapshot, FixedCostsView, RestoreSummary, SnapshotDetails, SnapshotId,
        SnapshotTruckCosts,
    },
    truck::{TruckId, get_all_trucks},
    validation::ValidationErrors,
};

/// Take a snapshot of the current fixed costs for the period containing `period_date`.
///
/// Trucks without fixed costs are left out of the snapshot. Missing common
/// costs are captured as zero.
pub fn create_snapshot(
    period_date: Date,
    label: Option<&str>,
    connection: &Connection,
) -> Result<CostSnapshot, Error> {
    let transaction = connection.unchecked_transaction()?;

    let snapshot = insert_snapshot(period_date, label, OffsetDateTime::now_utc(), &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "Created snapshot {} for {}",
        snapshot.id,
        snapshot.period_date
    );

    Ok(snapshot)
}

/// Write a snapshot taken at `created_at` using `connection` as is.
///
/// Callers are responsible for running this inside a transaction.
pub(crate) fn insert_snapshot(
    period_date: Date,
    label: Option<&str>,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<CostSnapshot, Error> {
    let period_date = Period::from_date(period_date)?.first_day();
    let created_at = created_at.to_offset(UtcOffset::UTC);
    let label = label
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned);

    connection.execute(
        "INSERT INTO cost_snapshot (created_at, period_date, label) VALUES (?1, ?2, ?3);",
        params![created_at, period_date, label],
    )?;
    let id = connection.last_insert_rowid();

    let common = current_common_fixed_costs(connection)?;
    connection.execute(
        "INSERT INTO cost_snapshot_common (snapshot_id, ifta, insurance, eld, tablet, tolls)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            id,
            common.ifta,
            common.insurance,
            common.eld,
            common.tablet,
            common.tolls
        ],
    )?;

    connection.execute(
        "INSERT INTO cost_snapshot_truck (snapshot_id, truck_id, tractor_no, truck_payment,
            trailer_payment, physical_damage_insurance_truck, physical_damage_insurance_trailer)
        SELECT ?1, f.truck_id, t.tractor_no, f.truck_payment, f.trailer_payment,
            f.physical_damage_insurance_truck, f.physical_damage_insurance_trailer
        FROM fixed_costs_truck f
        INNER JOIN truck t ON t.id = f.truck_id;",
        [id],
    )?;

    Ok(CostSnapshot {
        id,
        created_at,
        period_date,
        label,
    })
}

/// Retrieve a single snapshot by ID.
pub fn get_snapshot(
    snapshot_id: SnapshotId,
    connection: &Connection,
) -> Result<CostSnapshot, Error> {
    connection
        .prepare("SELECT id, created_at, period_date, label FROM cost_snapshot WHERE id = :id;")?
        .query_row(&[(":id", &snapshot_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::SnapshotNotFound(snapshot_id),
            error => error.into(),
        })
}

/// Retrieve every snapshot, newest first.
pub fn list_snapshots(connection: &Connection) -> Result<Vec<CostSnapshot>, Error> {
    connection
        .prepare(
            "SELECT id, created_at, period_date, label FROM cost_snapshot
            ORDER BY created_at DESC, id DESC;",
        )?
        .query_map([], map_row)?
        .map(|maybe_snapshot| maybe_snapshot.map_err(|error| error.into()))
        .collect()
}

/// Find the snapshot in effect on `date`.
///
/// This is the snapshot with the latest period on or before `date`. Ties go
/// to the snapshot created last. Returns `None` if every snapshot is for a
/// later period.
pub fn get_latest_snapshot_for(
    date: Date,
    connection: &Connection,
) -> Result<Option<CostSnapshot>, Error> {
    connection
        .prepare(
            "SELECT id, created_at, period_date, label FROM cost_snapshot
            WHERE period_date <= :date
            ORDER BY period_date DESC, created_at DESC, id DESC
            LIMIT 1;",
        )?
        .query_row(&[(":date", &date)], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// The common fixed costs held by a snapshot.
pub fn snapshot_common_costs(
    snapshot_id: SnapshotId,
    connection: &Connection,
) -> Result<FixedCostsCommon, Error> {
    connection
        .prepare(
            "SELECT ifta, insurance, eld, tablet, tolls
            FROM cost_snapshot_common WHERE snapshot_id = :snapshot_id;",
        )?
        .query_row(&[(":snapshot_id", &snapshot_id)], map_common_row)
        .optional()
        .map(Option::unwrap_or_default)
        .map_err(|error| error.into())
}

/// The fixed costs a snapshot holds for a truck, all zero if the truck had none.
pub fn snapshot_truck_costs(
    snapshot_id: SnapshotId,
    truck_id: TruckId,
    connection: &Connection,
) -> Result<FixedCostsTruck, Error> {
    connection
        .prepare(
            "SELECT truck_payment, trailer_payment,
                physical_damage_insurance_truck, physical_damage_insurance_trailer
            FROM cost_snapshot_truck
            WHERE snapshot_id = :snapshot_id AND truck_id = :truck_id;",
        )?
        .query_row(
            &[(":snapshot_id", &snapshot_id), (":truck_id", &truck_id)],
            |row| map_truck_row(row, 0),
        )
        .optional()
        .map(Option::unwrap_or_default)
        .map_err(|error| error.into())
}

/// Every truck's fixed costs held by a snapshot, ordered by tractor number.
pub fn snapshot_trucks(
    snapshot_id: SnapshotId,
    connection: &Connection,
) -> Result<Vec<SnapshotTruckCosts>, Error> {
    connection
        .prepare(
            "SELECT truck_id, tractor_no, truck_payment, trailer_payment,
                physical_damage_insurance_truck, physical_damage_insurance_trailer
            FROM cost_snapshot_truck
            WHERE snapshot_id = :snapshot_id
            ORDER BY tractor_no COLLATE NOCASE ASC;",
        )?
        .query_map(&[(":snapshot_id", &snapshot_id)], map_truck_costs_row)?
        .map(|maybe_costs| maybe_costs.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a snapshot with all of the costs it holds.
pub fn get_snapshot_details(
    snapshot_id: SnapshotId,
    connection: &Connection,
) -> Result<SnapshotDetails, Error> {
    let snapshot = get_snapshot(snapshot_id, connection)?;
    let common = snapshot_common_costs(snapshot_id, connection)?;
    let trucks = snapshot_trucks(snapshot_id, connection)?;

    Ok(SnapshotDetails::new(snapshot, common, trucks))
}

/// Overwrite the current fixed costs with the costs held by a snapshot.
///
/// The common costs and every truck in the snapshot that still exists are
/// restored together. Trucks that have since been deleted are skipped.
/// Current costs of trucks that are not in the snapshot are left as they are.
///
/// # Errors
/// Returns [Error::RestoreMissingSnapshot] if the snapshot doesn't exist. No
/// costs are changed if any error occurs.
pub fn restore_from_snapshot(
    snapshot_id: SnapshotId,
    connection: &Connection,
) -> Result<RestoreSummary, Error> {
    let transaction = connection.unchecked_transaction()?;

    get_snapshot(snapshot_id, &transaction).map_err(|error| match error {
        Error::SnapshotNotFound(snapshot_id) => Error::RestoreMissingSnapshot(snapshot_id),
        error => error,
    })?;

    set_common_fixed_costs(&snapshot_common_costs(snapshot_id, &transaction)?, &transaction)?;

    let mut restored_trucks = Vec::new();
    let mut skipped_trucks = Vec::new();

    for truck in snapshot_trucks(snapshot_id, &transaction)? {
        match set_truck_fixed_costs(truck.truck_id, &truck.costs, &transaction) {
            Ok(()) => restored_trucks.push(truck.truck_id),
            Err(Error::TruckNotFound(truck_id)) => {
                tracing::warn!(
                    "Skipping truck {truck_id} ({}) while restoring snapshot {snapshot_id}: the truck no longer exists",
                    truck.tractor_number
                );
                skipped_trucks.push(truck_id);
            }
            Err(error) => return Err(error),
        }
    }

    transaction.commit()?;

    tracing::info!(
        "Restored fixed costs from snapshot {snapshot_id} for {} truck(s)",
        restored_trucks.len()
    );

    Ok(RestoreSummary {
        snapshot_id,
        restored_trucks,
        skipped_trucks,
    })
}

/// Retrieve the details of several snapshots, oldest first.
///
/// # Errors
/// Returns [Error::Validation] if fewer than two distinct snapshots are given,
/// or [Error::SnapshotNotFound] for the lowest ID that doesn't exist.
pub fn compare_snapshots(
    snapshot_ids: &[SnapshotId],
    connection: &Connection,
) -> Result<Vec<SnapshotDetails>, Error> {
    let snapshot_ids: BTreeSet<SnapshotId> = snapshot_ids.iter().copied().collect();

    if snapshot_ids.len() < 2 {
        return Err(
            ValidationErrors::single("at least two snapshots are needed for a comparison").into(),
        );
    }

    let mut details = snapshot_ids
        .into_iter()
        .map(|snapshot_id| get_snapshot_details(snapshot_id, connection))
        .collect::<Result<Vec<_>, Error>>()?;

    details.sort_by(|a, b| {
        (a.snapshot.created_at, a.snapshot.id).cmp(&(b.snapshot.created_at, b.snapshot.id))
    });

    Ok(details)
}

/// The fixed costs in effect for `basis`.
///
/// For a period with no snapshot in effect, the live current costs are used.
pub fn fixed_costs_for_basis(
    basis: CostBasis,
    connection: &Connection,
) -> Result<FixedCostsView, Error> {
    let snapshot = match basis {
        CostBasis::Current => None,
        CostBasis::Period(period) => get_latest_snapshot_for(period.first_day(), connection)?,
        CostBasis::Snapshot(snapshot_id) => Some(get_snapshot(snapshot_id, connection)?),
    };

    let view = match snapshot {
        Some(snapshot) => FixedCostsView {
            basis,
            common: snapshot_common_costs(snapshot.id, connection)?,
            trucks: snapshot_trucks(snapshot.id, connection)?,
            snapshot: Some(snapshot),
        },
        None => FixedCostsView {
            basis,
            snapshot: None,
            common: current_common_fixed_costs(connection)?,
            trucks: get_all_trucks(connection)?
                .into_iter()
                .map(|truck| {
                    Ok(SnapshotTruckCosts {
                        costs: current_truck_fixed_costs(truck.id, connection)?,
                        truck_id: truck.id,
                        tractor_number: truck.tractor_number.to_string(),
                    })
                })
                .collect::<Result<_, Error>>()?,
        },
    };

    Ok(view)
}

/// Initialize the snapshot tables.
///
/// Snapshot truck rows do not reference the truck table so that deleting a
/// truck leaves its snapshots intact.
pub fn create_snapshot_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS cost_snapshot (
            id INTEGER PRIMARY KEY,
            created_at TEXT NOT NULL,
            period_date TEXT NOT NULL,
            label TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_cost_snapshot_period
            ON cost_snapshot(period_date, created_at);

        CREATE TABLE IF NOT EXISTS cost_snapshot_common (
            snapshot_id INTEGER PRIMARY KEY,
            ifta TEXT NOT NULL,
            insurance TEXT NOT NULL,
            eld TEXT NOT NULL,
            tablet TEXT NOT NULL,
            tolls TEXT NOT NULL,
            FOREIGN KEY(snapshot_id) REFERENCES cost_snapshot(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS cost_snapshot_truck (
            snapshot_id INTEGER NOT NULL,
            truck_id INTEGER NOT NULL,
            tractor_no TEXT NOT NULL,
            truck_payment TEXT NOT NULL,
            trailer_payment TEXT NOT NULL,
            physical_damage_insurance_truck TEXT NOT NULL,
            physical_damage_insurance_trailer TEXT NOT NULL,
            PRIMARY KEY(snapshot_id, truck_id),
            FOREIGN KEY(snapshot_id) REFERENCES cost_snapshot(id) ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<CostSnapshot, rusqlite::Error> {
    Ok(CostSnapshot {
        id: row.get(0)?,
        created_at: row.get(1)?,
        period_date: row.get(2)?,
        label: row.get(3)?,
    })
}

fn map_truck_costs_row(row: &Row) -> Result<SnapshotTruckCosts, rusqlite::Error> {
    Ok(SnapshotTruckCosts {
        truck_id: row.get(0)?,
        tractor_number: row.get(1)?,
        costs: map_truck_row(row, 2)?,
    })
}

#[cfg(test)]
mod snapshot_resolution_tests {
    use time::macros::{date, datetime};

    use crate::{
        snapshot::{get_latest_snapshot_for, insert_snapshot, list_snapshots},
        test_utils::get_test_connection,
    };

    #[test]
    fn picks_latest_period_then_latest_creation() {
        let connection = get_test_connection();
        let january = insert_snapshot(
            date!(2025 - 01 - 01),
            Some("January"),
            datetime!(2025-01-01 09:00 UTC),
            &connection,
        )
        .unwrap();
        let _early_march = insert_snapshot(
            date!(2025 - 03 - 01),
            Some("March, first try"),
            datetime!(2025-03-01 09:00 UTC),
            &connection,
        )
        .unwrap();
        let late_march = insert_snapshot(
            date!(2025 - 03 - 01),
            Some("March, corrected"),
            datetime!(2025-03-02 17:30 UTC),
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_latest_snapshot_for(date!(2025 - 02 - 15), &connection),
            Ok(Some(january))
        );
        assert_eq!(
            get_latest_snapshot_for(date!(2025 - 03 - 01), &connection),
            Ok(Some(late_march))
        );
        assert_eq!(
            get_latest_snapshot_for(date!(2024 - 12 - 01), &connection),
            Ok(None)
        );
    }

    #[test]
    fn period_date_is_first_of_month() {
        let connection = get_test_connection();

        let snapshot = insert_snapshot(
            date!(2025 - 03 - 17),
            None,
            datetime!(2025-03-17 09:00 UTC),
            &connection,
        )
        .unwrap();

        assert_eq!(snapshot.period_date, date!(2025 - 03 - 01));
    }

    #[test]
    fn blank_label_is_dropped() {
        let connection = get_test_connection();

        let snapshot = insert_snapshot(
            date!(2025 - 03 - 01),
            Some("   "),
            datetime!(2025-03-01 09:00 UTC),
            &connection,
        )
        .unwrap();

        assert_eq!(snapshot.label, None);
    }

    #[test]
    fn list_is_newest_first() {
        let connection = get_test_connection();
        let older = insert_snapshot(
            date!(2025 - 05 - 01),
            None,
            datetime!(2025-01-01 09:00 UTC),
            &connection,
        )
        .unwrap();
        let newer = insert_snapshot(
            date!(2025 - 01 - 01),
            None,
            datetime!(2025-02-01 09:00 UTC),
            &connection,
        )
        .unwrap();

        assert_eq!(list_snapshots(&connection), Ok(vec![newer, older]));
    }
}
