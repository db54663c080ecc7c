//! How profitable each truck is for a period.
//!
//! The calculation itself is a pure function of revenue, miles and costs. The
//! service layer finds the fixed costs that apply, and calculations for
//! recorded periods can be stored for trend reports.

mod cache;
mod calculator;
mod handlers;
mod service;

pub use cache::{
    CachedCalculation, create_profitability_calculation_table, delete_cached_calculation,
    get_cached_calculation, get_trends, recalculate_period, save_calculation,
};
pub use calculator::{
    CostBreakdown, CostCategory, CostGroup, ProfitabilityGrade, ProfitabilityInput,
    ProfitabilityResult, calculate, margin_percent, per_mile,
};
pub use handlers::{
    ProfitabilityState, TrendsQuery, calculate_profitability_endpoint,
    recalculate_period_endpoint, record_profitability_endpoint, trends_endpoint,
};
pub use service::{
    ProfitabilityForm, ProfitabilityRequest, ResolvedFixedCosts, TruckProfitability,
    calculate_for_record, calculate_profitability, resolve_fixed_costs,
};
pub(crate) use service::record_profitability;
