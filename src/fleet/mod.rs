//! Profitability of the fleet as a whole.

mod handlers;
mod report;
mod summary;

pub use handlers::{FleetState, fleet_period_report_endpoint, fleet_summary_endpoint};
pub use report::{
    FleetAnalysis, FleetEntry, FleetEntryForm, FleetReport, FleetSummaryForm, fleet_summary,
    period_report, profitability_analysis,
};
pub use summary::{FleetSummary, summarize};
