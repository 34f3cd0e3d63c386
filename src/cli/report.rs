use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_today};
use crate::error::Result;
use crate::fmt::money;
use crate::reports;
use crate::settings::load_settings;

pub fn dues(class_name: &str, session: Option<&str>, today: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let today = parse_today(today)?;
    let session = settings.session_or_default(session, today)?;
    let year = settings.academic_year()?;
    let rows = reports::class_dues(&conn, class_name, &session, today, &year)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Roll", "Due Months", "Outstanding"]);
    let mut total = rust_decimal::Decimal::ZERO;
    for r in &rows {
        total += r.outstanding;
        let months = r.due_months.iter().map(|m| &m.name()[..3]).collect::<Vec<_>>().join(" ");
        let amount = if r.outstanding.is_zero() {
            money(r.outstanding).green().to_string()
        } else {
            money(r.outstanding).red().to_string()
        };
        table.add_row(vec![
            Cell::new(&r.student_id),
            Cell::new(&r.name),
            Cell::new(r.roll_no.as_deref().unwrap_or("")),
            Cell::new(months),
            Cell::new(amount),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(total).bold()),
    ]);
    println!("Dues for class {class_name}, {session} (as of {today})\n{table}");
    Ok(())
}

pub fn collection(session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let session = settings.session_or_default(session, parse_today(None)?)?;
    let year = settings.academic_year()?;
    let report = reports::collection_summary(&conn, &session, &year)?;

    let mut by_type = Table::new();
    by_type.set_header(vec!["Fee", "Collected"]);
    for (fee_type, amount) in &report.by_fee_type {
        by_type.add_row(vec![Cell::new(fee_type.label()), Cell::new(money(*amount))]);
    }

    let mut by_month = Table::new();
    by_month.set_header(vec!["Month", "Deposits", "Collected"]);
    for m in &report.by_month {
        by_month.add_row(vec![Cell::new(m.month), Cell::new(m.deposits), Cell::new(money(m.amount))]);
    }

    println!("Collections for {session}: {} receipt(s), total {}", report.receipts, money(report.total).green().bold());
    println!("{by_type}");
    println!("{by_month}");
    Ok(())
}
