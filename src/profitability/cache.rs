//! Stored results of profitability calculations for recorded periods.
//!
//! Each truck has at most one stored calculation per period. A new calculation
//! replaces the old one wholesale, and editing or deleting the variable costs
//! record discards it.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    costs::{FixedCostsCommon, VariableCosts, get_variable_costs_for_period, map_truck_row},
    period::{CostBasis, Period},
    profitability::{
        CostBreakdown, ProfitabilityGrade, ProfitabilityInput, ProfitabilityResult,
        TruckProfitability, record_profitability,
    },
    snapshot::SnapshotId,
    truck::TruckId,
    validation::ValidationErrors,
};

/// A stored calculation and when it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCalculation {
    #[serde(flatten)]
    pub profitability: TruckProfitability,
    #[serde(with = "time::serde::rfc3339")]
    pub calculated_at: OffsetDateTime,
}

const SELECT_CALCULATION: &str = "SELECT c.truck_id, t.tractor_no, c.period_month, c.snapshot_id,
        c.revenue, c.total_miles, c.salary, c.fuel, c.variable_tolls, c.repair,
        c.truck_payment, c.trailer_payment,
        c.physical_damage_insurance_truck, c.physical_damage_insurance_trailer,
        c.ifta, c.insurance, c.eld, c.tablet, c.fixed_tolls,
        c.total_variable_costs, c.total_fixed_costs, c.total_costs, c.profit, c.profit_margin,
        c.profit_per_mile, c.cost_per_mile, c.revenue_per_mile, c.calculated_at
    FROM profitability_calculation c
    INNER JOIN truck t ON t.id = c.truck_id";

/// Store the calculation for `input`, replacing any earlier calculation for
/// the same truck and period.
pub fn save_calculation(
    period: Period,
    input: &ProfitabilityInput,
    profitability: &TruckProfitability,
    connection: &Connection,
) -> Result<CachedCalculation, Error> {
    let calculated_at = OffsetDateTime::now_utc();
    let result = &profitability.result;
    let costs = input.variable_costs;
    let truck = input.fixed_truck;
    let common = input.fixed_common;

    connection.execute(
        "INSERT INTO profitability_calculation (truck_id, period_month, snapshot_id,
            revenue, total_miles, salary, fuel, variable_tolls, repair,
            truck_payment, trailer_payment,
            physical_damage_insurance_truck, physical_damage_insurance_trailer,
            ifta, insurance, eld, tablet, fixed_tolls,
            total_variable_costs, total_fixed_costs, total_costs, profit, profit_margin,
            profit_per_mile, cost_per_mile, revenue_per_mile, calculated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)
        ON CONFLICT(truck_id, period_month) DO UPDATE SET
            snapshot_id = excluded.snapshot_id,
            revenue = excluded.revenue,
            total_miles = excluded.total_miles,
            salary = excluded.salary,
            fuel = excluded.fuel,
            variable_tolls = excluded.variable_tolls,
            repair = excluded.repair,
            truck_payment = excluded.truck_payment,
            trailer_payment = excluded.trailer_payment,
            physical_damage_insurance_truck = excluded.physical_damage_insurance_truck,
            physical_damage_insurance_trailer = excluded.physical_damage_insurance_trailer,
            ifta = excluded.ifta,
            insurance = excluded.insurance,
            eld = excluded.eld,
            tablet = excluded.tablet,
            fixed_tolls = excluded.fixed_tolls,
            total_variable_costs = excluded.total_variable_costs,
            total_fixed_costs = excluded.total_fixed_costs,
            total_costs = excluded.total_costs,
            profit = excluded.profit,
            profit_margin = excluded.profit_margin,
            profit_per_mile = excluded.profit_per_mile,
            cost_per_mile = excluded.cost_per_mile,
            revenue_per_mile = excluded.revenue_per_mile,
            calculated_at = excluded.calculated_at;",
        params![
            profitability.truck_id,
            period,
            profitability.snapshot_id,
            input.revenue,
            input.total_miles,
            costs.salary,
            costs.fuel,
            costs.tolls,
            costs.repair,
            truck.truck_payment,
            truck.trailer_payment,
            truck.physical_damage_insurance_truck,
            truck.physical_damage_insurance_trailer,
            common.ifta,
            common.insurance,
            common.eld,
            common.tablet,
            common.tolls,
            result.total_variable_costs,
            result.total_fixed_costs,
            result.total_costs,
            result.profit,
            result.profit_margin.to_string(),
            result.profit_per_mile,
            result.cost_per_mile,
            result.revenue_per_mile,
            calculated_at,
        ],
    )?;

    Ok(CachedCalculation {
        profitability: TruckProfitability {
            period: Some(period),
            ..profitability.clone()
        },
        calculated_at,
    })
}

/// The stored calculation for a truck and period, if there is one.
pub fn get_cached_calculation(
    truck_id: TruckId,
    period: Period,
    connection: &Connection,
) -> Result<Option<CachedCalculation>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CALCULATION} WHERE c.truck_id = ?1 AND c.period_month = ?2;"
        ))?
        .query_row(params![truck_id, period], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Every stored calculation from `start` to `end` inclusive, ordered by period
/// and then tractor number.
///
/// # Errors
/// Returns [Error::Validation] if `start` is after `end`.
pub fn get_trends(
    start: Period,
    end: Period,
    connection: &Connection,
) -> Result<Vec<CachedCalculation>, Error> {
    if start > end {
        return Err(ValidationErrors::single(format!(
            "the start period {start} is after the end period {end}"
        ))
        .into());
    }

    connection
        .prepare(&format!(
            "{SELECT_CALCULATION}
            WHERE c.period_month BETWEEN ?1 AND ?2
            ORDER BY c.period_month ASC, t.tractor_no ASC;"
        ))?
        .query_map(params![start, end], map_row)?
        .map(|maybe_calculation| maybe_calculation.map_err(|error| error.into()))
        .collect()
}

/// Calculate and store the profitability of every record in `period`.
///
/// Each record uses the snapshot it is bound to. Either every calculation is
/// stored or none are.
pub fn recalculate_period(
    period: Period,
    connection: &Connection,
) -> Result<Vec<TruckProfitability>, Error> {
    let transaction = connection.unchecked_transaction()?;

    let mut calculations = Vec::new();
    for record in get_variable_costs_for_period(period, &transaction)? {
        let (input, profitability) = record_profitability(&record, &transaction)?;
        save_calculation(period, &input, &profitability, &transaction)?;
        calculations.push(profitability);
    }

    transaction.commit()?;

    tracing::info!(
        "Recalculated profitability for {} truck(s) in {period}",
        calculations.len()
    );

    Ok(calculations)
}

/// Discard the stored calculation for a truck and period, if there is one.
pub fn delete_cached_calculation(
    truck_id: TruckId,
    period: Period,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM profitability_calculation WHERE truck_id = ?1 AND period_month = ?2",
        params![truck_id, period],
    )?;

    Ok(())
}

/// Initialize the calculation cache table.
pub fn create_profitability_calculation_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS profitability_calculation (
            truck_id INTEGER NOT NULL,
            period_month TEXT NOT NULL,
            snapshot_id INTEGER,
            revenue TEXT NOT NULL,
            total_miles INTEGER NOT NULL,
            salary TEXT NOT NULL,
            fuel TEXT NOT NULL,
            variable_tolls TEXT NOT NULL,
            repair TEXT NOT NULL,
            truck_payment TEXT NOT NULL,
            trailer_payment TEXT NOT NULL,
            physical_damage_insurance_truck TEXT NOT NULL,
            physical_damage_insurance_trailer TEXT NOT NULL,
            ifta TEXT NOT NULL,
            insurance TEXT NOT NULL,
            eld TEXT NOT NULL,
            tablet TEXT NOT NULL,
            fixed_tolls TEXT NOT NULL,
            total_variable_costs TEXT NOT NULL,
            total_fixed_costs TEXT NOT NULL,
            total_costs TEXT NOT NULL,
            profit TEXT NOT NULL,
            profit_margin TEXT NOT NULL,
            profit_per_mile TEXT NOT NULL,
            cost_per_mile TEXT NOT NULL,
            revenue_per_mile TEXT NOT NULL,
            calculated_at TEXT NOT NULL,
            PRIMARY KEY(truck_id, period_month),
            FOREIGN KEY(truck_id) REFERENCES truck(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(snapshot_id) REFERENCES cost_snapshot(id) ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_profitability_calculation_period
            ON profitability_calculation(period_month);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<CachedCalculation, rusqlite::Error> {
    let snapshot_id: Option<SnapshotId> = row.get(3)?;
    let input = ProfitabilityInput {
        revenue: row.get(4)?,
        total_miles: row.get(5)?,
        variable_costs: VariableCosts {
            salary: row.get(6)?,
            fuel: row.get(7)?,
            tolls: row.get(8)?,
            repair: row.get(9)?,
        },
        fixed_truck: map_truck_row(row, 10)?,
        fixed_common: map_common_row_at(row, 14)?,
    };
    let profit_margin = get_decimal(row, 23)?;

    let result = ProfitabilityResult {
        revenue: input.revenue,
        total_miles: input.total_miles,
        total_variable_costs: row.get(19)?,
        total_fixed_costs: row.get(20)?,
        total_costs: row.get(21)?,
        profit: row.get(22)?,
        profit_margin,
        profit_per_mile: row.get(24)?,
        cost_per_mile: row.get(25)?,
        revenue_per_mile: row.get(26)?,
        breakdown: CostBreakdown::from_input(&input),
    };

    Ok(CachedCalculation {
        profitability: TruckProfitability {
            truck_id: row.get(0)?,
            tractor_number: row.get(1)?,
            period: Some(row.get(2)?),
            basis: snapshot_id.map_or(CostBasis::Current, CostBasis::Snapshot),
            snapshot_id,
            grade: ProfitabilityGrade::from_margin(profit_margin),
            result,
        },
        calculated_at: row.get(27)?,
    })
}

fn map_common_row_at(row: &Row, offset: usize) -> Result<FixedCostsCommon, rusqlite::Error> {
    Ok(FixedCostsCommon {
        ifta: row.get(offset)?,
        insurance: row.get(offset + 1)?,
        eld: row.get(offset + 2)?,
        tablet: row.get(offset + 3)?,
        tolls: row.get(offset + 4)?,
    })
}

fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}
