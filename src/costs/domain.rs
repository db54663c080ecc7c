//! Cost domain types: the monthly running costs of a truck, and the fixed costs
//! of a truck and of the fleet as a whole.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    money::Money,
    period::Period,
    snapshot::SnapshotId,
    truck::TruckId,
    validation::{
        AmountInput, ValidationErrors, parse_amount, parse_miles, parse_optional_amount,
    },
};

/// The costs of running a truck for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCosts {
    pub salary: Money,
    pub fuel: Money,
    pub tolls: Money,
    #[serde(default)]
    pub repair: Money,
}

impl VariableCosts {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Money {
        self.salary + self.fuel + self.tolls + self.repair
    }
}

/// Fixed monthly costs that belong to a single truck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCostsTruck {
    pub truck_payment: Money,
    pub trailer_payment: Money,
    pub physical_damage_insurance_truck: Money,
    pub physical_damage_insurance_trailer: Money,
}

impl FixedCostsTruck {
    pub fn total(&self) -> Money {
        self.truck_payment
            + self.trailer_payment
            + self.physical_damage_insurance_truck
            + self.physical_damage_insurance_trailer
    }
}

/// Fixed monthly costs shared by every truck in the fleet.
///
/// Each truck carries the whole amount; the costs are not split between trucks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCostsCommon {
    pub ifta: Money,
    pub insurance: Money,
    pub eld: Money,
    pub tablet: Money,
    pub tolls: Money,
}

impl FixedCostsCommon {
    pub fn total(&self) -> Money {
        self.ifta + self.insurance + self.eld + self.tablet + self.tolls
    }
}

/// A partial update to a truck's fixed costs. Fields left as `None` are unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedCostsTruckUpdate {
    pub truck_payment: Option<Money>,
    pub trailer_payment: Option<Money>,
    pub physical_damage_insurance_truck: Option<Money>,
    pub physical_damage_insurance_trailer: Option<Money>,
}

impl FixedCostsTruckUpdate {
    pub fn apply_to(&self, current: FixedCostsTruck) -> FixedCostsTruck {
        FixedCostsTruck {
            truck_payment: self.truck_payment.unwrap_or(current.truck_payment),
            trailer_payment: self.trailer_payment.unwrap_or(current.trailer_payment),
            physical_damage_insurance_truck: self
                .physical_damage_insurance_truck
                .unwrap_or(current.physical_damage_insurance_truck),
            physical_damage_insurance_trailer: self
                .physical_damage_insurance_trailer
                .unwrap_or(current.physical_damage_insurance_trailer),
        }
    }
}

/// A partial update to the fleet's common fixed costs. Fields left as `None` are unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedCostsCommonUpdate {
    pub ifta: Option<Money>,
    pub insurance: Option<Money>,
    pub eld: Option<Money>,
    pub tablet: Option<Money>,
    pub tolls: Option<Money>,
}

impl FixedCostsCommonUpdate {
    pub fn apply_to(&self, current: FixedCostsCommon) -> FixedCostsCommon {
        FixedCostsCommon {
            ifta: self.ifta.unwrap_or(current.ifta),
            insurance: self.insurance.unwrap_or(current.insurance),
            eld: self.eld.unwrap_or(current.eld),
            tablet: self.tablet.unwrap_or(current.tablet),
            tolls: self.tolls.unwrap_or(current.tolls),
        }
    }
}

/// Database identifier for a variable costs record.
pub type VariableCostsId = i64;

/// The revenue, mileage and variable costs of one truck for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCostsRecord {
    pub id: VariableCostsId,
    pub truck_id: TruckId,
    pub period: Period,
    pub driver_name: Option<String>,
    pub revenue: Money,
    pub total_miles: u32,
    pub costs: VariableCosts,
    /// The snapshot holding the fixed costs that applied to this period.
    pub snapshot_id: SnapshotId,
}

/// Whether a new record names the snapshot it should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotBinding {
    /// Pick a snapshot when the record is saved.
    Unbound,
    /// Use this snapshot.
    Bound(SnapshotId),
}

/// A variable costs record that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVariableCosts {
    pub truck_id: TruckId,
    pub period: Period,
    pub driver_name: Option<String>,
    pub revenue: Money,
    pub total_miles: u32,
    pub costs: VariableCosts,
    pub snapshot: SnapshotBinding,
}

/// How a saved record came to be bound to its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotResolution {
    /// The caller named the snapshot.
    Explicit,
    /// The snapshot in effect for the period was used.
    Reused,
    /// No snapshot applied, so one was created from the current fixed costs.
    Minted,
}

/// A partial update to a saved record. The snapshot binding cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableCostsRecordUpdate {
    /// `Some(None)` removes the driver's name.
    pub driver_name: Option<Option<String>>,
    pub revenue: Option<Money>,
    pub total_miles: Option<u32>,
    pub salary: Option<Money>,
    pub fuel: Option<Money>,
    pub tolls: Option<Money>,
    pub repair: Option<Money>,
}

impl VariableCostsRecordUpdate {
    pub fn apply_to(&self, record: VariableCostsRecord) -> VariableCostsRecord {
        VariableCostsRecord {
            driver_name: self.driver_name.clone().unwrap_or(record.driver_name),
            revenue: self.revenue.unwrap_or(record.revenue),
            total_miles: self.total_miles.unwrap_or(record.total_miles),
            costs: VariableCosts {
                salary: self.salary.unwrap_or(record.costs.salary),
                fuel: self.fuel.unwrap_or(record.costs.fuel),
                tolls: self.tolls.unwrap_or(record.costs.tolls),
                repair: self.repair.unwrap_or(record.costs.repair),
            },
            ..record
        }
    }
}

/// Form data for a partial update to a truck's fixed costs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FixedCostsTruckForm {
    pub truck_payment: Option<AmountInput>,
    pub trailer_payment: Option<AmountInput>,
    pub physical_damage_insurance_truck: Option<AmountInput>,
    pub physical_damage_insurance_trailer: Option<AmountInput>,
}

impl FixedCostsTruckForm {
    /// Check every field, reporting all problems together.
    pub fn validate(&self) -> Result<FixedCostsTruckUpdate, Error> {
        let mut errors = ValidationErrors::new();

        let update = FixedCostsTruckUpdate {
            truck_payment: parse_optional_amount(
                "truck_payment",
                self.truck_payment.as_ref(),
                &mut errors,
            ),
            trailer_payment: parse_optional_amount(
                "trailer_payment",
                self.trailer_payment.as_ref(),
                &mut errors,
            ),
            physical_damage_insurance_truck: parse_optional_amount(
                "physical_damage_insurance_truck",
                self.physical_damage_insurance_truck.as_ref(),
                &mut errors,
            ),
            physical_damage_insurance_trailer: parse_optional_amount(
                "physical_damage_insurance_trailer",
                self.physical_damage_insurance_trailer.as_ref(),
                &mut errors,
            ),
        };

        errors.into_result(update)
    }
}

/// Form data for a partial update to the common fixed costs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FixedCostsCommonForm {
    pub ifta: Option<AmountInput>,
    pub insurance: Option<AmountInput>,
    pub eld: Option<AmountInput>,
    pub tablet: Option<AmountInput>,
    pub tolls: Option<AmountInput>,
}

impl FixedCostsCommonForm {
    /// Check every field, reporting all problems together.
    pub fn validate(&self) -> Result<FixedCostsCommonUpdate, Error> {
        let mut errors = ValidationErrors::new();

        let update = FixedCostsCommonUpdate {
            ifta: parse_optional_amount("ifta", self.ifta.as_ref(), &mut errors),
            insurance: parse_optional_amount("insurance", self.insurance.as_ref(), &mut errors),
            eld: parse_optional_amount("eld", self.eld.as_ref(), &mut errors),
            tablet: parse_optional_amount("tablet", self.tablet.as_ref(), &mut errors),
            tolls: parse_optional_amount("tolls", self.tolls.as_ref(), &mut errors),
        };

        errors.into_result(update)
    }
}

/// Form data for recording a period of variable costs.
#[derive(Debug, Serialize, Deserialize)]
pub struct VariableCostsForm {
    pub truck_id: TruckId,
    pub period: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    pub revenue: AmountInput,
    pub total_miles: i64,
    pub salary: AmountInput,
    pub fuel: AmountInput,
    pub tolls: AmountInput,
    #[serde(default)]
    pub repair: Option<AmountInput>,
    /// Leave out to use the snapshot in effect for the period.
    #[serde(default)]
    pub snapshot_id: Option<SnapshotId>,
}

impl VariableCostsForm {
    /// Check every field, reporting all problems together.
    pub fn validate(&self) -> Result<NewVariableCosts, Error> {
        let mut errors = ValidationErrors::new();

        let period = match self.period.parse::<Period>() {
            Ok(period) => Some(period),
            Err(Error::Validation(period_errors)) => {
                errors.extend(period_errors);
                None
            }
            Err(error) => return Err(error),
        };
        let revenue = parse_amount("revenue", &self.revenue, &mut errors);
        let total_miles = parse_miles("total_miles", self.total_miles, &mut errors);
        let salary = parse_amount("salary", &self.salary, &mut errors);
        let fuel = parse_amount("fuel", &self.fuel, &mut errors);
        let tolls = parse_amount("tolls", &self.tolls, &mut errors);
        let repair = parse_optional_amount("repair", self.repair.as_ref(), &mut errors);

        match (period, revenue, total_miles, salary, fuel, tolls) {
            (Some(period), Some(revenue), Some(total_miles), Some(salary), Some(fuel), Some(tolls))
                if errors.is_empty() =>
            {
                Ok(NewVariableCosts {
                    truck_id: self.truck_id,
                    period,
                    driver_name: self.driver_name.as_deref().and_then(clean_driver_name),
                    revenue,
                    total_miles,
                    costs: VariableCosts {
                        salary,
                        fuel,
                        tolls,
                        repair: repair.unwrap_or_default(),
                    },
                    snapshot: self
                        .snapshot_id
                        .map_or(SnapshotBinding::Unbound, SnapshotBinding::Bound),
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// Form data for a partial update to a variable costs record.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VariableCostsUpdateForm {
    /// A blank name removes the driver's name. Leave it out to keep the name.
    pub driver_name: Option<String>,
    pub revenue: Option<AmountInput>,
    pub total_miles: Option<i64>,
    pub salary: Option<AmountInput>,
    pub fuel: Option<AmountInput>,
    pub tolls: Option<AmountInput>,
    pub repair: Option<AmountInput>,
}

impl VariableCostsUpdateForm {
    /// Check every field, reporting all problems together.
    pub fn validate(&self) -> Result<VariableCostsRecordUpdate, Error> {
        let mut errors = ValidationErrors::new();

        let update = VariableCostsRecordUpdate {
            driver_name: self.driver_name.as_deref().map(clean_driver_name),
            revenue: parse_optional_amount("revenue", self.revenue.as_ref(), &mut errors),
            total_miles: self
                .total_miles
                .and_then(|miles| parse_miles("total_miles", miles, &mut errors)),
            salary: parse_optional_amount("salary", self.salary.as_ref(), &mut errors),
            fuel: parse_optional_amount("fuel", self.fuel.as_ref(), &mut errors),
            tolls: parse_optional_amount("tolls", self.tolls.as_ref(), &mut errors),
            repair: parse_optional_amount("repair", self.repair.as_ref(), &mut errors),
        };

        errors.into_result(update)
    }
}

fn clean_driver_name(raw: &str) -> Option<String> {
    Some(raw.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}
