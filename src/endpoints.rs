//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/trucks/{truck_id}', use [format_endpoint].

/// The route to list and register trucks.
pub const TRUCKS: &str = "/api/trucks";
/// The route to get, rename and delete a single truck.
pub const TRUCK: &str = "/api/trucks/{truck_id}";
/// The route to access a truck's current fixed costs.
pub const TRUCK_FIXED_COSTS: &str = "/api/trucks/{truck_id}/fixed_costs";
/// The route to access the fleet's current common fixed costs.
pub const COMMON_FIXED_COSTS: &str = "/api/fixed_costs/common";
/// The route to view the fixed costs in effect for `current` or a period.
pub const FIXED_COSTS_FOR_BASIS: &str = "/api/fixed_costs/{basis}";
/// The route to list and record variable costs.
pub const VARIABLE_COSTS: &str = "/api/variable_costs";
/// The route to access a single variable costs record.
pub const VARIABLE_COSTS_RECORD: &str = "/api/variable_costs/{record_id}";
/// The route to list the periods with recorded variable costs.
pub const PERIODS: &str = "/api/periods";
/// The route to list and create snapshots.
pub const SNAPSHOTS: &str = "/api/snapshots";
/// The route to view a single snapshot.
pub const SNAPSHOT: &str = "/api/snapshots/{snapshot_id}";
/// The route to find the snapshot in effect for a period.
pub const SNAPSHOT_FOR_PERIOD: &str = "/api/snapshots/for_period/{period}";
/// The route to restore the current fixed costs from a snapshot.
pub const RESTORE_SNAPSHOT: &str = "/api/snapshots/{snapshot_id}/restore";
/// The route to compare snapshots.
pub const COMPARE_SNAPSHOTS: &str = "/api/snapshots/compare";
/// The route to calculate the profitability of one truck.
pub const PROFITABILITY: &str = "/api/profitability";
/// The route to calculate the profitability of a recorded period for one truck.
pub const RECORD_PROFITABILITY: &str = "/api/profitability/records/{record_id}";
/// The route for cached profitability over a range of periods.
pub const PROFITABILITY_TRENDS: &str = "/api/profitability/trends";
/// The route to recalculate and cache a period.
pub const RECALCULATE_PERIOD: &str = "/api/profitability/periods/{period}";
/// The route for a fleet summary of supplied figures.
pub const FLEET_SUMMARY: &str = "/api/fleet/summary";
/// The route for the fleet report of a recorded period.
pub const FLEET_PERIOD_REPORT: &str = "/api/fleet/periods/{period}";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// A parameter is a segment wrapped in braces, e.g. '{truck_id}' in
/// '/api/trucks/{truck_id}'. Only the first parameter is replaced.
///
/// If no parameter is found in `endpoint_path`, the original path is returned.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, value: impl std::fmt::Display) -> String {
    let Some(start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };
    let Some(length) = endpoint_path[start..].find('}') else {
        return endpoint_path.to_owned();
    };

    format!(
        "{}{value}{}",
        &endpoint_path[..start],
        &endpoint_path[start + length + 1..]
    )
}

#[cfg(test)]
mod format_endpoint_tests {
    use super::{RESTORE_SNAPSHOT, TRUCK, TRUCKS, format_endpoint};

    #[test]
    fn replaces_trailing_parameter() {
        assert_eq!(format_endpoint(TRUCK, 1), "/api/trucks/1");
    }

    #[test]
    fn replaces_inner_parameter() {
        assert_eq!(
            format_endpoint(RESTORE_SNAPSHOT, 12),
            "/api/snapshots/12/restore"
        );
    }

    #[test]
    fn accepts_text_values() {
        assert_eq!(
            format_endpoint("/api/fleet/periods/{period}", "2025-03"),
            "/api/fleet/periods/2025-03"
        );
    }

    #[test]
    fn leaves_paths_without_parameters() {
        assert_eq!(format_endpoint(TRUCKS, 1), TRUCKS);
    }
}
