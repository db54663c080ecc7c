//! Totals and averages across the trucks in the fleet.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    money::Money,
    profitability::{ProfitabilityResult, margin_percent},
};

/// The combined figures of several trucks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub truck_count: usize,
    pub total_revenue: Money,
    pub total_variable_costs: Money,
    pub total_fixed_costs: Money,
    pub total_costs: Money,
    pub total_profit: Money,
    /// Total profit as a percentage of total revenue.
    pub fleet_margin: Decimal,
    pub average_profit_per_truck: Money,
    /// The mean of each truck's margin. Every truck counts the same regardless
    /// of its revenue.
    pub average_margin_per_truck: Decimal,
}

/// Add up the results of several trucks.
///
/// An empty fleet has every figure at zero.
pub fn summarize<'a>(results: impl IntoIterator<Item = &'a ProfitabilityResult>) -> FleetSummary {
    let mut summary = FleetSummary::default();
    let mut margin_sum = Decimal::ZERO;

    for result in results {
        summary.truck_count += 1;
        summary.total_revenue += result.revenue;
        summary.total_variable_costs += result.total_variable_costs;
        summary.total_fixed_costs += result.total_fixed_costs;
        summary.total_costs += result.total_costs;
        summary.total_profit += result.profit;
        margin_sum += result.profit_margin;
    }

    summary.fleet_margin = margin_percent(summary.total_profit, summary.total_revenue);

    if summary.truck_count > 0 {
        let truck_count = Decimal::from(summary.truck_count);
        summary.average_profit_per_truck = summary
            .total_profit
            .checked_div(truck_count)
            .unwrap_or_default()
            .round_to_cents();
        let mut average_margin = margin_sum
            .checked_div(truck_count)
            .unwrap_or_default()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        average_margin.rescale(2);
        summary.average_margin_per_truck = average_margin;
    }

    summary
}

#[cfg(test)]
mod fleet_summary_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{
        costs::{FixedCostsCommon, FixedCostsTruck, VariableCosts},
        fleet::summarize,
        money::Money,
        profitability::{ProfitabilityInput, ProfitabilityResult, calculate},
        test_utils::money,
    };

    /// A truck whose costs are split between variable salary and a truck payment.
    fn truck_result(revenue: &str, variable: &str, fixed: &str) -> ProfitabilityResult {
        calculate(&ProfitabilityInput {
            revenue: money(revenue),
            total_miles: 1000,
            variable_costs: VariableCosts {
                salary: money(variable),
                ..VariableCosts::zero()
            },
            fixed_truck: FixedCostsTruck {
                truck_payment: money(fixed),
                ..Default::default()
            },
            fixed_common: FixedCostsCommon::default(),
        })
    }

    #[test]
    fn two_truck_example() {
        let results = [
            truck_result("10000", "3000", "2000"),
            truck_result("5000", "1000", "1000"),
        ];

        let summary = summarize(&results);

        assert_eq!(summary.truck_count, 2);
        assert_eq!(summary.total_revenue, money("15000"));
        assert_eq!(summary.total_variable_costs, money("4000"));
        assert_eq!(summary.total_fixed_costs, money("3000"));
        assert_eq!(summary.total_costs, money("7000"));
        assert_eq!(summary.total_profit, money("8000"));
        assert_eq!(summary.average_profit_per_truck, money("4000"));
        assert_eq!(summary.fleet_margin, dec!(53.33));
    }

    #[test]
    fn average_margin_is_unweighted() {
        let results = [
            truck_result("10000", "3000", "2000"),
            truck_result("5000", "1000", "1000"),
        ];

        let summary = summarize(&results);

        // 50% and 60%, regardless of each truck's revenue.
        assert_eq!(summary.average_margin_per_truck, dec!(55.00));
    }

    #[test]
    fn totals_equal_sum_of_trucks() {
        let results = [
            truck_result("1234.56", "100.01", "99.99"),
            truck_result("0", "10", "0"),
            truck_result("999.99", "0", "1000"),
        ];

        let summary = summarize(&results);

        let profit: Money = results.iter().map(|result| result.profit).sum();
        assert_eq!(summary.total_profit, profit);
        assert_eq!(
            summary.total_costs,
            summary.total_variable_costs + summary.total_fixed_costs
        );
    }

    #[test]
    fn empty_fleet_is_all_zero() {
        let summary = summarize(std::iter::empty());

        assert_eq!(summary.truck_count, 0);
        assert_eq!(summary.total_profit, Money::ZERO);
        assert_eq!(summary.fleet_margin, Decimal::ZERO);
        assert_eq!(summary.average_profit_per_truck, Money::ZERO);
        assert_eq!(summary.average_margin_per_truck, Decimal::ZERO);
    }
}
