use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::macros::date;

use fleet_profit::{
    costs::{
        FixedCostsCommon, FixedCostsTruck, NewVariableCosts, SnapshotBinding, VariableCosts,
        create_variable_costs, set_common_fixed_costs, set_truck_fixed_costs,
    },
    initialize_db,
    money::Money,
    period::Period,
    profitability::recalculate_period,
    snapshot::create_snapshot,
    truck::{TractorNumber, create_truck},
};

/// A utility for creating a test database for the fleet_profit server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating trucks and fixed costs...");

    let mut trucks = Vec::new();
    for (tractor_number, truck_payment) in [("T-101", 2100), ("T-102", 1850), ("T-205", 2400)] {
        let truck = create_truck(TractorNumber::new(tractor_number)?, &conn)?;
        set_truck_fixed_costs(
            truck.id,
            &FixedCostsTruck {
                truck_payment: Money::from(truck_payment),
                trailer_payment: Money::from(650),
                physical_damage_insurance_truck: Money::from(310),
                physical_damage_insurance_trailer: Money::from(120),
            },
            &conn,
        )?;
        trucks.push(truck);
    }

    set_common_fixed_costs(
        &FixedCostsCommon {
            ifta: Money::from(95),
            insurance: Money::from(1400),
            eld: Money::from(35),
            tablet: Money::from(25),
            tolls: Money::from(60),
        },
        &conn,
    )?;

    println!("Recording variable costs for January to March 2025...");

    let months = [(1, "18250.00", 9800), (2, "17400.50", 9350), (3, "19120.75", 10240)];
    for (month, revenue, miles) in months {
        let period = Period::new(2025, month)?;

        // Insurance went up in March, so March gets its own snapshot.
        if month == 3 {
            set_common_fixed_costs(
                &FixedCostsCommon {
                    ifta: Money::from(95),
                    insurance: Money::from(1550),
                    eld: Money::from(35),
                    tablet: Money::from(25),
                    tolls: Money::from(60),
                },
                &conn,
            )?;
            create_snapshot(date!(2025 - 03 - 01), Some("Insurance renewal"), &conn)?;
        }

        for (index, truck) in trucks.iter().enumerate() {
            let revenue: Money = revenue.parse()?;
            let offset = Money::from(250 * index as i64);

            create_variable_costs(
                NewVariableCosts {
                    truck_id: truck.id,
                    period,
                    driver_name: None,
                    revenue: revenue - offset,
                    total_miles: miles - 200 * index as u32,
                    costs: VariableCosts {
                        salary: Money::from(5200),
                        fuel: Money::from(4100) - offset,
                        tolls: Money::from(180),
                        repair: if index == 2 { Money::from(740) } else { Money::ZERO },
                    },
                    snapshot: SnapshotBinding::Unbound,
                },
                &conn,
            )?;
        }

        recalculate_period(period, &conn)?;
    }

    println!("Success!");

    Ok(())
}
