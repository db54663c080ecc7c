//! Fleet reports built from supplied figures or from recorded periods.

use std::collections::{BTreeMap, HashSet};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    costs::{VariableCosts, get_variable_costs_for_period},
    fleet::{FleetSummary, summarize},
    money::Money,
    period::{CostBasis, Period},
    profitability::{
        ProfitabilityGrade, ProfitabilityRequest, TruckProfitability, calculate_profitability,
        record_profitability,
    },
    truck::TruckId,
    validation::{AmountInput, ValidationErrors, parse_amount, parse_miles, parse_optional_amount},
};

/// One truck's figures for a fleet summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetEntry {
    pub truck_id: TruckId,
    pub revenue: Money,
    pub total_miles: u32,
    pub variable_costs: VariableCosts,
}

/// A fleet summary along with each truck's own figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetReport {
    pub basis: CostBasis,
    pub summary: FleetSummary,
    pub trucks: Vec<TruckProfitability>,
}

/// Summarize the fleet using each truck's fixed costs under `basis`.
///
/// # Errors
/// Returns [Error::TruckNotFound] for the first entry whose truck doesn't
/// exist, or [Error::SnapshotNotFound] if `basis` names a missing snapshot.
pub fn fleet_summary(
    entries: &[FleetEntry],
    basis: CostBasis,
    connection: &Connection,
) -> Result<FleetReport, Error> {
    let trucks = entries
        .iter()
        .map(|entry| {
            calculate_profitability(
                &ProfitabilityRequest {
                    truck_id: entry.truck_id,
                    basis,
                    revenue: entry.revenue,
                    total_miles: entry.total_miles,
                    variable_costs: entry.variable_costs,
                },
                connection,
            )
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(FleetReport {
        basis,
        summary: summarize(trucks.iter().map(|truck| &truck.result)),
        trucks,
    })
}

/// Summarize every recorded truck for `period`.
///
/// Each truck uses the snapshot its record is bound to. A period with no
/// records gives an empty report.
pub fn period_report(period: Period, connection: &Connection) -> Result<FleetReport, Error> {
    let trucks = get_variable_costs_for_period(period, connection)?
        .iter()
        .map(|record| record_profitability(record, connection).map(|(_, truck)| truck))
        .collect::<Result<Vec<_>, Error>>()?;

    tracing::debug!("Built fleet report for {period} with {} truck(s)", trucks.len());

    Ok(FleetReport {
        basis: CostBasis::Period(period),
        summary: summarize(trucks.iter().map(|truck| &truck.result)),
        trucks,
    })
}

/// A period report with the trucks graded and ranked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetAnalysis {
    pub period: Period,
    #[serde(flatten)]
    pub report: FleetReport,
    /// How many trucks earned each grade. Grades no truck earned are left out.
    pub grade_counts: BTreeMap<ProfitabilityGrade, usize>,
    /// The truck with the highest profit, if any were recorded.
    pub most_profitable: Option<TruckId>,
    pub least_profitable: Option<TruckId>,
}

/// Grade and rank every recorded truck for `period`.
pub fn profitability_analysis(
    period: Period,
    connection: &Connection,
) -> Result<FleetAnalysis, Error> {
    let report = period_report(period, connection)?;

    let mut grade_counts = BTreeMap::new();
    for truck in &report.trucks {
        *grade_counts.entry(truck.grade).or_insert(0) += 1;
    }

    let most_profitable = report
        .trucks
        .iter()
        .max_by_key(|truck| truck.result.profit)
        .map(|truck| truck.truck_id);
    let least_profitable = report
        .trucks
        .iter()
        .min_by_key(|truck| truck.result.profit)
        .map(|truck| truck.truck_id);

    Ok(FleetAnalysis {
        period,
        report,
        grade_counts,
        most_profitable,
        least_profitable,
    })
}

/// Form data for one truck in a fleet summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct FleetEntryForm {
    pub truck_id: TruckId,
    pub revenue: AmountInput,
    pub total_miles: i64,
    pub salary: AmountInput,
    pub fuel: AmountInput,
    pub tolls: AmountInput,
    #[serde(default)]
    pub repair: Option<AmountInput>,
}

/// Form data for a fleet summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct FleetSummaryForm {
    /// `current`, a period such as "2025-03", or `snapshot:<id>`. Defaults to `current`.
    #[serde(default)]
    pub basis: Option<String>,
    pub entries: Vec<FleetEntryForm>,
}

impl FleetSummaryForm {
    /// Check every entry, reporting all problems together.
    ///
    /// Messages name the entry they are about, e.g. `entries[1].fuel`. A truck
    /// may appear only once.
    pub fn validate(&self) -> Result<(CostBasis, Vec<FleetEntry>), Error> {
        let mut errors = ValidationErrors::new();

        let basis = match self.basis.as_deref().map(str::parse::<CostBasis>) {
            None => Some(CostBasis::Current),
            Some(Ok(basis)) => Some(basis),
            Some(Err(Error::Validation(basis_errors))) => {
                errors.extend(basis_errors);
                None
            }
            Some(Err(error)) => return Err(error),
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.entries.len());

        for (index, entry) in self.entries.iter().enumerate() {
            let field = |name: &str| format!("entries[{index}].{name}");

            if !seen.insert(entry.truck_id) {
                errors.push(format!(
                    "{}: truck {} appears more than once",
                    field("truck_id"),
                    entry.truck_id
                ));
            }

            let revenue = parse_amount(&field("revenue"), &entry.revenue, &mut errors);
            let total_miles = parse_miles(&field("total_miles"), entry.total_miles, &mut errors);
            let salary = parse_amount(&field("salary"), &entry.salary, &mut errors);
            let fuel = parse_amount(&field("fuel"), &entry.fuel, &mut errors);
            let tolls = parse_amount(&field("tolls"), &entry.tolls, &mut errors);
            let repair =
                parse_optional_amount(&field("repair"), entry.repair.as_ref(), &mut errors);

            if let (Some(revenue), Some(total_miles), Some(salary), Some(fuel), Some(tolls)) =
                (revenue, total_miles, salary, fuel, tolls)
            {
                entries.push(FleetEntry {
                    truck_id: entry.truck_id,
                    revenue,
                    total_miles,
                    variable_costs: VariableCosts {
                        salary,
                        fuel,
                        tolls,
                        repair: repair.unwrap_or_default(),
                    },
                });
            }
        }

        match basis {
            Some(basis) if errors.is_empty() => Ok((basis, entries)),
            _ => Err(Error::Validation(errors)),
        }
    }
}
