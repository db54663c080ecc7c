//! The registry of trucks in the fleet.

mod db;
mod domain;
mod handlers;

pub use db::{
    create_truck, create_truck_table, delete_truck, ensure_truck_exists, get_all_trucks,
    get_truck, get_truck_summaries, rename_truck,
};
pub use domain::{TractorNumber, Truck, TruckForm, TruckId, TruckSummary};
pub use handlers::{
    TruckState, create_truck_endpoint, delete_truck_endpoint, get_truck_endpoint,
    list_trucks_endpoint, rename_truck_endpoint,
};
