//! Variable and fixed costs.
//!
//! Current fixed costs are edited in place. Variable costs are recorded once per
//! truck per period and bound to the snapshot of fixed costs in effect for that
//! period.

mod domain;
mod fixed;
mod handlers;
mod variable;

pub use domain::{
    FixedCostsCommon, FixedCostsCommonForm, FixedCostsCommonUpdate, FixedCostsTruck,
    FixedCostsTruckForm, FixedCostsTruckUpdate, NewVariableCosts, SnapshotBinding,
    SnapshotResolution, VariableCosts, VariableCostsForm, VariableCostsId, VariableCostsRecord,
    VariableCostsRecordUpdate, VariableCostsUpdateForm,
};
pub use fixed::{
    create_fixed_costs_tables, current_common_fixed_costs, current_truck_fixed_costs,
    get_all_truck_fixed_costs, get_common_fixed_costs, get_truck_fixed_costs,
    set_common_fixed_costs, set_truck_fixed_costs, update_common_fixed_costs,
    update_truck_fixed_costs,
};
pub(crate) use fixed::{map_common_row, map_truck_row};
pub use handlers::{
    CostsState, CreatedVariableCosts, VariableCostsQuery, create_variable_costs_endpoint,
    delete_variable_costs_endpoint, get_common_fixed_costs_endpoint,
    get_truck_fixed_costs_endpoint, get_variable_costs_endpoint, list_periods_endpoint,
    list_variable_costs_endpoint, update_common_fixed_costs_endpoint,
    update_truck_fixed_costs_endpoint, update_variable_costs_endpoint,
};
pub use variable::{
    VariableCostsFilter, bind_snapshot, count_records_for_truck,
    create_variable_costs, create_variable_costs_table, delete_variable_costs,
    get_recorded_periods, get_variable_costs, get_variable_costs_for_period,
    query_variable_costs, update_variable_costs,
};
