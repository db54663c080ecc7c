//! The profitability formula. Nothing here touches the database.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    costs::{FixedCostsCommon, FixedCostsTruck, VariableCosts},
    money::Money,
};

/// Everything needed to work out how profitable a truck was for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitabilityInput {
    pub revenue: Money,
    pub total_miles: u32,
    pub variable_costs: VariableCosts,
    pub fixed_truck: FixedCostsTruck,
    pub fixed_common: FixedCostsCommon,
}

/// One line of a [CostBreakdown].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Salary,
    Fuel,
    VariableTolls,
    Repair,
    TruckPayment,
    TrailerPayment,
    TruckInsurance,
    TrailerInsurance,
    Ifta,
    BusinessInsurance,
    Eld,
    Tablet,
    FixedTolls,
}

/// Whether a [CostCategory] changes with how much a truck is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostGroup {
    Variable,
    FixedTruck,
    FixedCommon,
}

impl CostCategory {
    pub fn group(&self) -> CostGroup {
        match self {
            CostCategory::Salary
            | CostCategory::Fuel
            | CostCategory::VariableTolls
            | CostCategory::Repair => CostGroup::Variable,
            CostCategory::TruckPayment
            | CostCategory::TrailerPayment
            | CostCategory::TruckInsurance
            | CostCategory::TrailerInsurance => CostGroup::FixedTruck,
            CostCategory::Ifta
            | CostCategory::BusinessInsurance
            | CostCategory::Eld
            | CostCategory::Tablet
            | CostCategory::FixedTolls => CostGroup::FixedCommon,
        }
    }
}

/// Every amount that makes up a truck's total costs, by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostBreakdown(BTreeMap<CostCategory, Money>);

impl CostBreakdown {
    pub(crate) fn from_input(input: &ProfitabilityInput) -> Self {
        let variable = input.variable_costs;
        let truck = input.fixed_truck;
        let common = input.fixed_common;

        Self(BTreeMap::from([
            (CostCategory::Salary, variable.salary),
            (CostCategory::Fuel, variable.fuel),
            (CostCategory::VariableTolls, variable.tolls),
            (CostCategory::Repair, variable.repair),
            (CostCategory::TruckPayment, truck.truck_payment),
            (CostCategory::TrailerPayment, truck.trailer_payment),
            (
                CostCategory::TruckInsurance,
                truck.physical_damage_insurance_truck,
            ),
            (
                CostCategory::TrailerInsurance,
                truck.physical_damage_insurance_trailer,
            ),
            (CostCategory::Ifta, common.ifta),
            (CostCategory::BusinessInsurance, common.insurance),
            (CostCategory::Eld, common.eld),
            (CostCategory::Tablet, common.tablet),
            (CostCategory::FixedTolls, common.tolls),
        ]))
    }

    pub fn get(&self, category: CostCategory) -> Money {
        self.0.get(&category).copied().unwrap_or_default()
    }

    /// The sum of every category.
    pub fn total(&self) -> Money {
        self.0.values().sum()
    }

    /// The sum of the categories in `group`.
    pub fn group_total(&self, group: CostGroup) -> Money {
        self.0
            .iter()
            .filter(|(category, _)| category.group() == group)
            .map(|(_, amount)| *amount)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CostCategory, Money)> + '_ {
        self.0.iter().map(|(category, amount)| (*category, *amount))
    }
}

/// The outcome of [calculate].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityResult {
    pub revenue: Money,
    pub total_miles: u32,
    pub total_variable_costs: Money,
    pub total_fixed_costs: Money,
    pub total_costs: Money,
    pub profit: Money,
    /// Profit as a percentage of revenue, to two decimal places.
    pub profit_margin: Decimal,
    pub profit_per_mile: Money,
    pub cost_per_mile: Money,
    pub revenue_per_mile: Money,
    pub breakdown: CostBreakdown,
}

/// Work out the profit, margin and per-mile figures for one truck and period.
///
/// Zero revenue gives a margin of zero and zero miles gives per-mile figures of
/// zero. Neither is an error.
pub fn calculate(input: &ProfitabilityInput) -> ProfitabilityResult {
    let total_variable_costs = input.variable_costs.total();
    let total_fixed_costs = input.fixed_truck.total() + input.fixed_common.total();
    let total_costs = total_variable_costs + total_fixed_costs;
    let profit = input.revenue - total_costs;

    ProfitabilityResult {
        revenue: input.revenue,
        total_miles: input.total_miles,
        total_variable_costs,
        total_fixed_costs,
        total_costs,
        profit,
        profit_margin: margin_percent(profit, input.revenue),
        profit_per_mile: per_mile(profit, input.total_miles),
        cost_per_mile: per_mile(total_costs, input.total_miles),
        revenue_per_mile: per_mile(input.revenue, input.total_miles),
        breakdown: CostBreakdown::from_input(input),
    }
}

/// `profit` as a percentage of `revenue` to two decimal places, or zero if
/// there was no revenue.
pub fn margin_percent(profit: Money, revenue: Money) -> Decimal {
    if !revenue.is_positive() {
        return Decimal::ZERO;
    }

    let mut margin = profit
        .ratio_to(revenue)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    margin.rescale(2);

    margin
}

/// `amount` per mile rounded to cents, or zero if no miles were driven.
pub fn per_mile(amount: Money, miles: u32) -> Money {
    if miles == 0 {
        return Money::ZERO;
    }

    amount
        .checked_div(Decimal::from(miles))
        .unwrap_or_default()
        .round_to_cents()
}

/// A letter grade for a profit margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProfitabilityGrade {
    A,
    B,
    C,
    D,
    F,
}

impl ProfitabilityGrade {
    /// A for 20% and above, B for 15%, C for 10%, D for 5% and F below that.
    pub fn from_margin(margin: Decimal) -> Self {
        if margin >= Decimal::from(20) {
            ProfitabilityGrade::A
        } else if margin >= Decimal::from(15) {
            ProfitabilityGrade::B
        } else if margin >= Decimal::TEN {
            ProfitabilityGrade::C
        } else if margin >= Decimal::from(5) {
            ProfitabilityGrade::D
        } else {
            ProfitabilityGrade::F
        }
    }
}
