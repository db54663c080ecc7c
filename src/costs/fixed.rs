//! Database operations for the current fixed costs.
//!
//! There is one row of common costs for the whole fleet and at most one row per
//! truck. A missing row means the costs are all zero.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Error,
    costs::{FixedCostsCommon, FixedCostsCommonUpdate, FixedCostsTruck, FixedCostsTruckUpdate},
    truck::{TruckId, ensure_truck_exists},
};

/// The key of the single row of common fixed costs.
const FLEET_KEY: &str = "fleet";

/// Retrieve the fleet's common fixed costs, or `None` if they have never been set.
pub fn get_common_fixed_costs(connection: &Connection) -> Result<Option<FixedCostsCommon>, Error> {
    connection
        .prepare(
            "SELECT ifta, insurance, eld, tablet, tolls
            FROM fixed_costs_common WHERE fleet_key = :fleet_key;",
        )?
        .query_row(&[(":fleet_key", &FLEET_KEY)], map_common_row)
        .optional()
        .map_err(|error| error.into())
}

/// The fleet's common fixed costs, all zero if they have never been set.
pub fn current_common_fixed_costs(connection: &Connection) -> Result<FixedCostsCommon, Error> {
    get_common_fixed_costs(connection).map(Option::unwrap_or_default)
}

/// Replace the fleet's common fixed costs.
pub fn set_common_fixed_costs(
    costs: &FixedCostsCommon,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO fixed_costs_common (fleet_key, ifta, insurance, eld, tablet, tolls)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(fleet_key) DO UPDATE SET
            ifta = excluded.ifta,
            insurance = excluded.insurance,
            eld = excluded.eld,
            tablet = excluded.tablet,
            tolls = excluded.tolls;",
        params![
            FLEET_KEY,
            costs.ifta,
            costs.insurance,
            costs.eld,
            costs.tablet,
            costs.tolls
        ],
    )?;

    Ok(())
}

/// Change some of the fleet's common fixed costs and return the result.
pub fn update_common_fixed_costs(
    update: &FixedCostsCommonUpdate,
    connection: &Connection,
) -> Result<FixedCostsCommon, Error> {
    let transaction = connection.unchecked_transaction()?;

    let updated = update.apply_to(current_common_fixed_costs(&transaction)?);
    set_common_fixed_costs(&updated, &transaction)?;

    transaction.commit()?;

    Ok(updated)
}

/// Retrieve a truck's fixed costs, or `None` if they have never been set.
pub fn get_truck_fixed_costs(
    truck_id: TruckId,
    connection: &Connection,
) -> Result<Option<FixedCostsTruck>, Error> {
    connection
        .prepare(
            "SELECT truck_payment, trailer_payment,
                physical_damage_insurance_truck, physical_damage_insurance_trailer
            FROM fixed_costs_truck WHERE truck_id = :truck_id;",
        )?
        .query_row(&[(":truck_id", &truck_id)], |row| map_truck_row(row, 0))
        .optional()
        .map_err(|error| error.into())
}

/// A truck's fixed costs, all zero if they have never been set.
pub fn current_truck_fixed_costs(
    truck_id: TruckId,
    connection: &Connection,
) -> Result<FixedCostsTruck, Error> {
    get_truck_fixed_costs(truck_id, connection).map(Option::unwrap_or_default)
}

/// Retrieve every truck's fixed costs ordered by truck ID.
pub fn get_all_truck_fixed_costs(
    connection: &Connection,
) -> Result<Vec<(TruckId, FixedCostsTruck)>, Error> {
    connection
        .prepare(
            "SELECT truck_id, truck_payment, trailer_payment,
                physical_damage_insurance_truck, physical_damage_insurance_trailer
            FROM fixed_costs_truck ORDER BY truck_id ASC;",
        )?
        .query_map([], |row| Ok((row.get(0)?, map_truck_row(row, 1)?)))?
        .map(|maybe_costs| maybe_costs.map_err(|error| error.into()))
        .collect()
}

/// Replace a truck's fixed costs.
///
/// # Errors
/// Returns [Error::TruckNotFound] if the truck doesn't exist.
pub fn set_truck_fixed_costs(
    truck_id: TruckId,
    costs: &FixedCostsTruck,
    connection: &Connection,
) -> Result<(), Error> {
    ensure_truck_exists(truck_id, connection)?;

    connection.execute(
        "INSERT INTO fixed_costs_truck (truck_id, truck_payment, trailer_payment,
            physical_damage_insurance_truck, physical_damage_insurance_trailer)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(truck_id) DO UPDATE SET
            truck_payment = excluded.truck_payment,
            trailer_payment = excluded.trailer_payment,
            physical_damage_insurance_truck = excluded.physical_damage_insurance_truck,
            physical_damage_insurance_trailer = excluded.physical_damage_insurance_trailer;",
        params![
            truck_id,
            costs.truck_payment,
            costs.trailer_payment,
            costs.physical_damage_insurance_truck,
            costs.physical_damage_insurance_trailer
        ],
    )?;

    Ok(())
}

/// Change some of a truck's fixed costs and return the result.
///
/// # Errors
/// Returns [Error::TruckNotFound] if the truck doesn't exist.
pub fn update_truck_fixed_costs(
    truck_id: TruckId,
    update: &FixedCostsTruckUpdate,
    connection: &Connection,
) -> Result<FixedCostsTruck, Error> {
    let transaction = connection.unchecked_transaction()?;

    ensure_truck_exists(truck_id, &transaction)?;
    let updated = update.apply_to(current_truck_fixed_costs(truck_id, &transaction)?);
    set_truck_fixed_costs(truck_id, &updated, &transaction)?;

    transaction.commit()?;

    Ok(updated)
}

/// Initialize the tables for the current fixed costs.
pub fn create_fixed_costs_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS fixed_costs_common (
            fleet_key TEXT PRIMARY KEY,
            ifta TEXT NOT NULL,
            insurance TEXT NOT NULL,
            eld TEXT NOT NULL,
            tablet TEXT NOT NULL,
            tolls TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fixed_costs_truck (
            truck_id INTEGER PRIMARY KEY,
            truck_payment TEXT NOT NULL,
            trailer_payment TEXT NOT NULL,
            physical_damage_insurance_truck TEXT NOT NULL,
            physical_damage_insurance_trailer TEXT NOT NULL,
            FOREIGN KEY(truck_id) REFERENCES truck(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

pub(crate) fn map_common_row(row: &Row) -> Result<FixedCostsCommon, rusqlite::Error> {
    Ok(FixedCostsCommon {
        ifta: row.get(0)?,
        insurance: row.get(1)?,
        eld: row.get(2)?,
        tablet: row.get(3)?,
        tolls: row.get(4)?,
    })
}

/// Read the four truck cost columns starting at column `offset`.
pub(crate) fn map_truck_row(row: &Row, offset: usize) -> Result<FixedCostsTruck, rusqlite::Error> {
    Ok(FixedCostsTruck {
        truck_payment: row.get(offset)?,
        trailer_payment: row.get(offset + 1)?,
        physical_damage_insurance_truck: row.get(offset + 2)?,
        physical_damage_insurance_trailer: row.get(offset + 3)?,
    })
}
