use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::cli::open_db;
use crate::deposit::records_for_receipt;
use crate::error::{BursarError, Result};
use crate::fmt::money;
use crate::models::DepositRecord;
use crate::months::AcademicYear;
use crate::selection::{receipt_from_records, Receipt};
use crate::settings::load_settings;

/// Receipt lines as a terminal table: one row per fee type and month.
pub fn render(receipt: &Receipt) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Fee", "Month", "Amount"]);
    for line in &receipt.lines {
        for (i, (month, amount)) in line.months.iter().enumerate() {
            let label = if i == 0 { line.fee_type.label() } else { "" };
            table.add_row(vec![Cell::new(label), Cell::new(month), Cell::new(money(*amount))]);
        }
        if line.months.len() > 1 {
            table.add_row(vec![
                Cell::new(""),
                Cell::new("subtotal".dimmed()),
                Cell::new(money(line.subtotal)),
            ]);
        }
    }
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        Cell::new(""),
        Cell::new(money(receipt.total).bold()),
    ]);
    table
}

#[derive(Serialize)]
struct ReceiptExport<'a> {
    receipt_no: &'a str,
    student_id: &'a str,
    session: &'a str,
    school_id: &'a str,
    created_at: String,
    receipt: &'a Receipt,
}

fn write_csv(path: &Path, receipt: &Receipt) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["fee_type", "month", "amount"])?;
    for line in &receipt.lines {
        for (month, amount) in &line.months {
            wtr.write_record([line.fee_type.key(), month.name(), amount.to_string().as_str()])?;
        }
    }
    wtr.write_record(["total", "", receipt.total.to_string().as_str()])?;
    wtr.flush()?;
    Ok(())
}

fn write_json(path: &Path, first: &DepositRecord, receipt: &Receipt) -> Result<()> {
    let export = ReceiptExport {
        receipt_no: &first.receipt_no,
        student_id: &first.student_id,
        session: &first.session,
        school_id: &first.school_id,
        created_at: first.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        receipt,
    };
    std::fs::write(path, format!("{}\n", serde_json::to_string_pretty(&export)?))?;
    Ok(())
}

pub fn run(receipt_no: &str, output: Option<&str>, format: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let year: AcademicYear = load_settings().academic_year()?;
    let records = records_for_receipt(&conn, receipt_no)?;
    let Some(first) = records.first() else {
        return Err(BursarError::Other(format!("No deposits found for receipt {receipt_no}")));
    };
    let receipt = receipt_from_records(&records, &year);

    let Some(output) = output else {
        println!(
            "Receipt {}  student {}  session {}  {}",
            first.receipt_no,
            first.student_id,
            first.session,
            first.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("{}", render(&receipt));
        return Ok(());
    };

    let path = Path::new(output);
    let format = format
        .map(str::to_lowercase)
        .or_else(|| path.extension().and_then(|e| e.to_str()).map(str::to_lowercase))
        .unwrap_or_else(|| "csv".to_string());
    match format.as_str() {
        "csv" => write_csv(path, &receipt)?,
        "json" => write_json(path, first, &receipt)?,
        other => return Err(BursarError::Other(format!("Unknown export format: {other}"))),
    }
    println!("Receipt {receipt_no} written to {}", path.display());
    Ok(())
}
