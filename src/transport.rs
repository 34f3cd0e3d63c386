use std::collections::BTreeSet;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{BursarError, Result};
use crate::months::validate_session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    pub vehicle_no: String,
    pub route: String,
    pub price: Decimal,
    pub riders: i64,
}

pub fn add_vehicle(conn: &Connection, vehicle_no: &str, route: &str, price: Decimal) -> Result<i64> {
    if vehicle_no.trim().is_empty() {
        return Err(BursarError::Validation("vehicle number is required".to_string()));
    }
    if price.is_sign_negative() {
        return Err(BursarError::Validation(format!("price must not be negative: {price}")));
    }
    conn.execute(
        "INSERT INTO vehicles (vehicle_no, route, price) VALUES (?1, ?2, ?3)",
        rusqlite::params![vehicle_no, route, price.to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_vehicles(conn: &Connection, session: &str) -> Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(
        "SELECT v.vehicle_no, v.route, v.price, \
         (SELECT count(*) FROM transport_assignments a WHERE a.vehicle_id = v.id AND a.session = ?1) \
         FROM vehicles v ORDER BY v.vehicle_no",
    )?;
    let rows: Vec<(String, String, String, i64)> = stmt
        .query_map([session], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|(vehicle_no, route, price, riders)| {
            let price = Decimal::from_str(&price).ok()?;
            Some(Vehicle {
                vehicle_no,
                route,
                price,
                riders,
            })
        })
        .collect())
}

fn vehicle_id(conn: &Connection, vehicle_no: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM vehicles WHERE vehicle_no = ?1", [vehicle_no], |r| r.get(0))
        .optional()?
        .ok_or_else(|| BursarError::UnknownVehicle(vehicle_no.to_string()))
}

pub struct AssignResult {
    pub assigned: usize,
    pub moved: usize,
}

/// Put students on a vehicle for a session. Keyed on (student, session), so a
/// student already on another vehicle is moved rather than listed twice.
pub fn assign(conn: &Connection, vehicle_no: &str, session: &str, student_ids: &[String]) -> Result<AssignResult> {
    validate_session(session)?;
    let vehicle_id = vehicle_id(conn, vehicle_no)?;
    let unique: BTreeSet<&str> = student_ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();

    let tx = conn.unchecked_transaction()?;
    let mut assigned = 0usize;
    let mut moved = 0usize;
    for student_id in unique {
        let known = tx
            .prepare_cached("SELECT 1 FROM students WHERE student_id = ?1")?
            .exists([student_id])?;
        if !known {
            return Err(BursarError::UnknownStudent(student_id.to_string()));
        }
        let current: Option<i64> = tx
            .query_row(
                "SELECT vehicle_id FROM transport_assignments WHERE student_id = ?1 AND session = ?2",
                [student_id, session],
                |r| r.get(0),
            )
            .optional()?;
        match current {
            Some(id) if id == vehicle_id => continue,
            Some(_) => moved += 1,
            None => assigned += 1,
        }
        tx.execute(
            "INSERT INTO transport_assignments (student_id, session, vehicle_id) VALUES (?1, ?2, ?3) \
             ON CONFLICT (student_id, session) DO UPDATE SET vehicle_id = excluded.vehicle_id, assigned_at = datetime('now')",
            rusqlite::params![student_id, session, vehicle_id],
        )?;
    }
    tx.commit()?;
    Ok(AssignResult { assigned, moved })
}

pub fn unassign(conn: &Connection, student_id: &str, session: &str) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM transport_assignments WHERE student_id = ?1 AND session = ?2",
        [student_id, session],
    )?;
    Ok(n > 0)
}

/// Monthly price of the vehicle the student rides this session, if any.
pub fn transport_amount(conn: &Connection, student_id: &str, session: &str) -> Result<Option<Decimal>> {
    let price: Option<String> = conn
        .query_row(
            "SELECT v.price FROM transport_assignments a JOIN vehicles v ON a.vehicle_id = v.id \
             WHERE a.student_id = ?1 AND a.session = ?2",
            [student_id, session],
            |r| r.get(0),
        )
        .optional()?;
    match price {
        Some(p) => Decimal::from_str(&p)
            .map(Some)
            .map_err(|e| BursarError::Other(format!("bad vehicle price {p:?}: {e}"))),
        None => Ok(None),
    }
}
