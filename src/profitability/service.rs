//! Profitability of trucks using the fixed costs in effect for a [CostBasis].

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    costs::{
        FixedCostsCommon, FixedCostsTruck, VariableCosts, VariableCostsId, VariableCostsRecord,
        current_common_fixed_costs, current_truck_fixed_costs, get_variable_costs,
    },
    money::Money,
    period::{CostBasis, Period},
    profitability::{ProfitabilityGrade, ProfitabilityInput, ProfitabilityResult, calculate},
    snapshot::{
        CostSnapshot, SnapshotId, get_latest_snapshot_for, get_snapshot, snapshot_common_costs,
        snapshot_truck_costs,
    },
    truck::{TruckId, get_truck},
    validation::{AmountInput, ValidationErrors, parse_amount, parse_miles, parse_optional_amount},
};

/// The fixed costs that apply to one truck, and the snapshot they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFixedCosts {
    pub fixed_truck: FixedCostsTruck,
    pub fixed_common: FixedCostsCommon,
    /// `None` when the live current costs were used.
    pub snapshot: Option<CostSnapshot>,
}

/// Find the fixed costs that apply to `truck_id` under `basis`.
///
/// A period with no snapshot in effect uses the live current costs. Costs the
/// truck never had are zero.
///
/// # Errors
/// Returns [Error::TruckNotFound] if the truck doesn't exist or
/// [Error::SnapshotNotFound] if `basis` names a snapshot that doesn't exist.
pub fn resolve_fixed_costs(
    truck_id: TruckId,
    basis: CostBasis,
    connection: &Connection,
) -> Result<ResolvedFixedCosts, Error> {
    get_truck(truck_id, connection)?;

    resolve_for_known_truck(truck_id, basis, connection)
}

/// [resolve_fixed_costs] for a truck that is known to exist.
fn resolve_for_known_truck(
    truck_id: TruckId,
    basis: CostBasis,
    connection: &Connection,
) -> Result<ResolvedFixedCosts, Error> {
    let snapshot = match basis {
        CostBasis::Current => None,
        CostBasis::Snapshot(snapshot_id) => Some(get_snapshot(snapshot_id, connection)?),
        CostBasis::Period(period) => {
            let snapshot = get_latest_snapshot_for(period.first_day(), connection)?;
            if snapshot.is_none() {
                tracing::debug!("No snapshot in effect for {period}, using current fixed costs");
            }
            snapshot
        }
    };

    match snapshot {
        Some(snapshot) => {
            tracing::debug!(
                "Using snapshot {} for truck {truck_id} ({basis})",
                snapshot.id
            );
            Ok(ResolvedFixedCosts {
                fixed_truck: snapshot_truck_costs(snapshot.id, truck_id, connection)?,
                fixed_common: snapshot_common_costs(snapshot.id, connection)?,
                snapshot: Some(snapshot),
            })
        }
        None => Ok(ResolvedFixedCosts {
            fixed_truck: current_truck_fixed_costs(truck_id, connection)?,
            fixed_common: current_common_fixed_costs(connection)?,
            snapshot: None,
        }),
    }
}

/// How profitable one truck was, with the figures that went into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckProfitability {
    pub truck_id: TruckId,
    pub tractor_number: String,
    /// The period the figures are for, if they came from a recorded period or a period basis.
    pub period: Option<Period>,
    pub basis: CostBasis,
    /// The snapshot the fixed costs came from, or `None` for the live costs.
    pub snapshot_id: Option<SnapshotId>,
    pub grade: ProfitabilityGrade,
    #[serde(flatten)]
    pub result: ProfitabilityResult,
}

/// A request to calculate one truck's profitability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitabilityRequest {
    pub truck_id: TruckId,
    pub basis: CostBasis,
    pub revenue: Money,
    pub total_miles: u32,
    pub variable_costs: VariableCosts,
}

/// Calculate a truck's profitability for the given revenue, miles and variable
/// costs using the fixed costs in effect for the request's basis.
pub fn calculate_profitability(
    request: &ProfitabilityRequest,
    connection: &Connection,
) -> Result<TruckProfitability, Error> {
    let period = match request.basis {
        CostBasis::Period(period) => Some(period),
        CostBasis::Current | CostBasis::Snapshot(_) => None,
    };

    profitability_for(request, period, connection).map(|(_, profitability)| profitability)
}

/// Calculate the profitability of a recorded period using the snapshot the
/// record is bound to.
///
/// Later edits to the current fixed costs do not change the result.
pub fn calculate_for_record(
    record_id: VariableCostsId,
    connection: &Connection,
) -> Result<TruckProfitability, Error> {
    let record = get_variable_costs(record_id, connection)?;

    record_profitability(&record, connection).map(|(_, profitability)| profitability)
}

/// [calculate_for_record] for a record that has already been loaded, along
/// with the inputs that went into the calculation.
pub(crate) fn record_profitability(
    record: &VariableCostsRecord,
    connection: &Connection,
) -> Result<(ProfitabilityInput, TruckProfitability), Error> {
    let request = ProfitabilityRequest {
        truck_id: record.truck_id,
        basis: CostBasis::Snapshot(record.snapshot_id),
        revenue: record.revenue,
        total_miles: record.total_miles,
        variable_costs: record.costs,
    };

    profitability_for(&request, Some(record.period), connection)
}

fn profitability_for(
    request: &ProfitabilityRequest,
    period: Option<Period>,
    connection: &Connection,
) -> Result<(ProfitabilityInput, TruckProfitability), Error> {
    let truck = get_truck(request.truck_id, connection)?;
    let fixed_costs = resolve_for_known_truck(truck.id, request.basis, connection)?;

    let input = ProfitabilityInput {
        revenue: request.revenue,
        total_miles: request.total_miles,
        variable_costs: request.variable_costs,
        fixed_truck: fixed_costs.fixed_truck,
        fixed_common: fixed_costs.fixed_common,
    };
    let result = calculate(&input);

    let profitability = TruckProfitability {
        truck_id: truck.id,
        tractor_number: truck.tractor_number.to_string(),
        period,
        basis: request.basis,
        snapshot_id: fixed_costs.snapshot.map(|snapshot| snapshot.id),
        grade: ProfitabilityGrade::from_margin(result.profit_margin),
        result,
    };

    Ok((input, profitability))
}

/// Form data for calculating one truck's profitability.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfitabilityForm {
    pub truck_id: TruckId,
    /// `current`, a period such as "2025-03", or `snapshot:<id>`. Defaults to `current`.
    #[serde(default)]
    pub basis: Option<String>,
    pub revenue: AmountInput,
    pub total_miles: i64,
    pub salary: AmountInput,
    pub fuel: AmountInput,
    pub tolls: AmountInput,
    #[serde(default)]
    pub repair: Option<AmountInput>,
}

impl ProfitabilityForm {
    /// Check every field, reporting all problems together.
    pub fn validate(&self) -> Result<ProfitabilityRequest, Error> {
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
        let revenue = parse_amount("revenue", &self.revenue, &mut errors);
        let total_miles = parse_miles("total_miles", self.total_miles, &mut errors);
        let salary = parse_amount("salary", &self.salary, &mut errors);
        let fuel = parse_amount("fuel", &self.fuel, &mut errors);
        let tolls = parse_amount("tolls", &self.tolls, &mut errors);
        let repair = parse_optional_amount("repair", self.repair.as_ref(), &mut errors);

        match (basis, revenue, total_miles, salary, fuel, tolls) {
            (Some(basis), Some(revenue), Some(total_miles), Some(salary), Some(fuel), Some(tolls))
                if errors.is_empty() =>
            {
                Ok(ProfitabilityRequest {
                    truck_id: self.truck_id,
                    basis,
                    revenue,
                    total_miles,
                    variable_costs: VariableCosts {
                        salary,
                        fuel,
                        tolls,
                        repair: repair.unwrap_or_default(),
                    },
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

#[cfg(test)]
mod profitability_service_tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        costs::{
            FixedCostsCommon, FixedCostsTruck, VariableCosts, set_common_fixed_costs,
            set_truck_fixed_costs,
        },
        period::{CostBasis, Period},
        profitability::{
            ProfitabilityForm, ProfitabilityGrade, ProfitabilityRequest, calculate_for_record,
            calculate_profitability, resolve_fixed_costs,
        },
        snapshot::create_snapshot,
        test_utils::{create_test_truck, get_test_connection, money, record_variable_costs},
        validation::AmountInput,
    };

    fn truck_costs(truck_payment: &str) -> FixedCostsTruck {
        FixedCostsTruck {
            truck_payment: money(truck_payment),
            trailer_payment: money("200"),
            physical_damage_insurance_truck: money("50"),
            physical_damage_insurance_trailer: money("25"),
        }
    }

    fn common_costs() -> FixedCostsCommon {
        FixedCostsCommon {
            ifta: money("10"),
            insurance: money("400"),
            eld: money("30"),
            tablet: money("15"),
            tolls: money("20"),
        }
    }

    fn example_request(truck_id: i64, basis: CostBasis) -> ProfitabilityRequest {
        ProfitabilityRequest {
            truck_id,
            basis,
            revenue: money("15000"),
            total_miles: 4500,
            variable_costs: VariableCosts {
                salary: money("3000"),
                fuel: money("2000"),
                tolls: money("500"),
                repair: money("0"),
            },
        }
    }

    #[test]
    fn current_basis_uses_live_costs() {
        let connection = get_test_connection();
        let truck = create_test_truck("T-101", &connection);
        set_truck_fixed_costs(truck.id, &truck_costs("500"), &connection).unwrap();
        set_common_fixed_costs(&common_costs(), &connection).unwrap();

        let got =
            calculate_profitability(&example_request(truck.id, CostBasis::Current), &connection)
                .unwrap();

        assert_eq!(got.snapshot_id, None);
        assert_eq!(got.period, None);
        assert_eq!(got.tractor_number, "T-101");
        assert_eq!(got.result.total_costs, money("6750"));
        assert_eq!(got.result.profit, money("8250"));
        assert_eq!(got.result.profit_margin, dec!(55.00));
        assert_eq!(got.result.profit_per_mile, money("1.83"));
        assert_eq!(got.grade, ProfitabilityGrade::A);
    }

    #[test]
    fn truck_without_fixed_costs_row_uses_common_costs_only() {
        let connection = get_test_connection();
        let truck = create_test_truck("T-101", &connection);
        set_common_fixed_costs(
            &FixedCostsCommon {
                ifta: money("500"),
                insurance: money("800"),
                eld: money("300"),
                tablet: money("200"),
                tolls: money("600"),
            },
            &connection,
        )
        .unwrap();
        let request = ProfitabilityRequest {
            truck_id: truck.id,
            basis: CostBasis::Current,
            revenue: money("15000"),
            total_miles: 4500,
            variable_costs: VariableCosts {
                salary: money("3000"),
                fuel: money("1200"),
                tolls: money("150"),
                repair: money("0"),
            },
        };

        let got = calculate_profitability(&request, &connection).unwrap();

        assert_eq!(got.result.total_variable_costs, money("4350"));
        assert_eq!(got.result.total_fixed_costs, money("2400"));
        assert_eq!(got.result.total_costs, money("6750"));
        assert_eq!(got.result.profit, money("8250"));
        assert_eq!(got.result.profit_margin, dec!(55.00));
        assert_eq!(got.result.cost_per_mile, money("1.50"));
        assert_eq!(got.result.profit_per_mile, money("1.83"));
    }

    #[test]
    fn period_basis_uses_snapshot_in_effect() {
        let connection = get_test_connection();
        let truck = create_test_truck("T-101", &connection);
        set_truck_fixed_costs(truck.id, &truck_costs("500"), &connection).unwrap();
        let january = create_snapshot(date!(2025 - 01 - 01), None, &connection).unwrap();
        set_truck_fixed_costs(truck.id, &truck_costs("900"), &connection).unwrap();

        let basis = CostBasis::Period(Period::new(2025, 2).unwrap());
        let got = calculate_profitability(&example_request(truck.id, basis), &connection).unwrap();

        assert_eq!(got.snapshot_id, Some(january.id));
        assert_eq!(got.period, Some(Period::new(2025, 2).unwrap()));
        assert_eq!(got.result.total_fixed_costs, money("775"));
    }

    #[test]
    fn period_without_snapshot_falls_back_to_current_costs() {
        let connection = get_test_connection();
        let truck = create_test_truck("T-101", &connection);
        set_truck_fixed_costs(truck.id, &truck_costs("500"), &connection).unwrap();
        create_snapshot(date!(2025 - 06 - 01), None, &connection).unwrap();

        let resolved = resolve_fixed_costs(
            truck.id,
            CostBasis::Period(Period::new(2025, 1).unwrap()),
            &connection,
        )
        .unwrap();

        assert_eq!(resolved.snapshot, None);
        assert_eq!(resolved.fixed_truck, truck_costs("500"));
        assert_eq!(resolved.fixed_common, FixedCostsCommon::default());
    }

    #[test]
    fn unknown_truck_is_an_error() {
        let connection = get_test_connection();

        let result = resolve_fixed_costs(99, CostBasis::Current, &connection);

        assert_eq!(result, Err(Error::TruckNotFound(99)));
    }

    #[test]
    fn request_for_unknown_truck_is_an_error() {
        let connection = get_test_connection();

        let result = calculate_profitability(&example_request(99, CostBasis::Current), &connection);

        assert_eq!(result, Err(Error::TruckNotFound(99)));
    }

    #[test]
    fn unknown_snapshot_is_an_error() {
        let connection = get_test_connection();
        let truck = create_test_truck("T-101", &connection);

        let result = resolve_fixed_costs(truck.id, CostBasis::Snapshot(42), &connection);

        assert_eq!(result, Err(Error::SnapshotNotFound(42)));
    }

    #[test]
    fn truck_missing_from_snapshot_has_zero_truck_costs() {
        let connection = get_test_connection();
        set_common_fixed_costs(&common_costs(), &connection).unwrap();
        let snapshot = create_snapshot(date!(2025 - 01 - 01), None, &connection).unwrap();
        let truck = create_test_truck("T-202", &connection);

        let resolved =
            resolve_fixed_costs(truck.id, CostBasis::Snapshot(snapshot.id), &connection).unwrap();

        assert_eq!(resolved.fixed_truck, FixedCostsTruck::default());
        assert_eq!(resolved.fixed_common, common_costs());
    }

    #[test]
    fn recorded_period_ignores_later_cost_changes() {
        let connection = get_test_connection();
        let truck = create_test_truck("T-101", &connection);
        set_truck_fixed_costs(truck.id, &truck_costs("500"), &connection).unwrap();
        set_common_fixed_costs(&common_costs(), &connection).unwrap();
        let record = record_variable_costs(truck.id, "2025-03", &connection);
        let before = calculate_for_record(record.id, &connection).unwrap();

        set_truck_fixed_costs(truck.id, &truck_costs("5000"), &connection).unwrap();
        let after = calculate_for_record(record.id, &connection).unwrap();

        assert_eq!(before, after);
        assert_eq!(after.snapshot_id, Some(record.snapshot_id));
        assert_eq!(after.period, Some(Period::new(2025, 3).unwrap()));
        assert_eq!(after.result.total_fixed_costs, money("1250"));
    }

    #[test]
    fn missing_record_is_an_error() {
        let connection = get_test_connection();

        assert_eq!(
            calculate_for_record(7, &connection),
            Err(Error::VariableCostsNotFound(7))
        );
    }

    #[test]
    fn form_defaults_to_current_basis() {
        let form = ProfitabilityForm {
            truck_id: 1,
            basis: None,
            revenue: AmountInput::new("15000"),
            total_miles: 4500,
            salary: AmountInput::new("3000"),
            fuel: AmountInput::new("2000"),
            tolls: AmountInput::new("500"),
            repair: None,
        };

        let request = form.validate().unwrap();

        assert_eq!(request.basis, CostBasis::Current);
        assert_eq!(request.variable_costs.repair, money("0"));
    }

    #[test]
    fn form_reports_every_problem() {
        let form = ProfitabilityForm {
            truck_id: 1,
            basis: Some("last month".to_owned()),
            revenue: AmountInput::new("lots"),
            total_miles: -5,
            salary: AmountInput::new("-1"),
            fuel: AmountInput::new("2000"),
            tolls: AmountInput::new("2000000"),
            repair: None,
        };

        let Err(Error::Validation(errors)) = form.validate() else {
            panic!("expected a validation error");
        };

        assert_eq!(errors.messages().len(), 5, "{:?}", errors.messages());
    }
}
