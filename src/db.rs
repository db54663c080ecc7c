//! Sets up the application's SQLite database.

use rusqlite::Connection;

use crate::{
    Error,
    costs::{create_fixed_costs_tables, create_variable_costs_table},
    profitability::create_profitability_calculation_table,
    snapshot::create_snapshot_tables,
    truck::create_truck_table,
};

/// Create the tables for every domain model.
///
/// Foreign keys are switched on for `connection`. Tables that already exist are
/// left untouched, so this is safe to call on an existing database.
///
/// # Errors
/// Returns an error if any table could not be created. No tables are created in
/// that case.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = connection.unchecked_transaction()?;

    create_truck_table(&transaction)?;
    create_fixed_costs_tables(&transaction)?;
    create_snapshot_tables(&transaction)?;
    create_variable_costs_table(&transaction)?;
    create_profitability_calculation_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
