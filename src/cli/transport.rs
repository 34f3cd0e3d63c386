use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::{open_db, parse_today};
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;
use crate::transport;

fn session_or_default(session: Option<&str>) -> Result<String> {
    load_settings().session_or_default(session, parse_today(None)?)
}

pub fn add_vehicle(vehicle_no: &str, route: &str, price: Decimal) -> Result<()> {
    let conn = open_db()?;
    transport::add_vehicle(&conn, vehicle_no, route, price)?;
    println!("Added vehicle {vehicle_no} on {route} at {} per month", money(price));
    Ok(())
}

pub fn assign(vehicle_no: &str, student_ids: &[String], session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let session = session_or_default(session)?;
    let result = transport::assign(&conn, vehicle_no, &session, student_ids)?;
    println!(
        "{} assigned, {} moved to {vehicle_no} for {session}",
        result.assigned, result.moved
    );
    Ok(())
}

pub fn unassign(student_id: &str, session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let session = session_or_default(session)?;
    if transport::unassign(&conn, student_id, &session)? {
        println!("Removed transport for {student_id} in {session}");
    } else {
        println!("{student_id} has no transport in {session}");
    }
    Ok(())
}

pub fn list(session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let session = session_or_default(session)?;
    let vehicles = transport::list_vehicles(&conn, &session)?;

    let mut table = Table::new();
    table.set_header(vec!["Vehicle", "Route", "Monthly Price", "Riders"]);
    for v in vehicles {
        table.add_row(vec![
            Cell::new(v.vehicle_no),
            Cell::new(v.route),
            Cell::new(money(v.price)),
            Cell::new(v.riders),
        ]);
    }
    println!("Vehicles ({session})\n{table}");
    Ok(())
}
