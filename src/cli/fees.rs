use std::path::PathBuf;
use std::str::FromStr;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::catalog::{upsert_entry, FeeCatalog};
use crate::cli::{open_db, parse_today, receipt::render};
use crate::error::{BursarError, Result};
use crate::fmt::money;
use crate::importer::import_catalog;
use crate::models::{FeeScheduleEntry, FeeType};
use crate::months::AcademicMonth;
use crate::resolver::{late_fee_applies, resolve, ResolvedByMonth};
use crate::selection::{breakdown, SelectionState};
use crate::settings::load_settings;
use crate::students;

pub fn add(
    fee_type: &str,
    class_name: &str,
    month: &str,
    amount: Option<Decimal>,
    dynamic: bool,
    session: Option<&str>,
) -> Result<()> {
    let conn = open_db()?;
    let session = load_settings().session_or_default(session, parse_today(None)?)?;
    let fee_type = FeeType::from_str(fee_type)?;
    let month = AcademicMonth::from_str(month)?;

    let entry = match (dynamic, amount) {
        (true, _) if fee_type != FeeType::Transport => {
            return Err(BursarError::Validation(
                "only transport fees can take their amount from the student".to_string(),
            ));
        }
        (true, _) => FeeScheduleEntry::dynamic(fee_type, class_name, &session, month),
        (false, Some(a)) if a.is_sign_negative() => {
            return Err(BursarError::Validation(format!("amount must not be negative: {a}")));
        }
        (false, Some(a)) => FeeScheduleEntry::fixed(fee_type, class_name, &session, month, a),
        (false, None) => return Err(BursarError::Validation("--amount or --dynamic is required".to_string())),
    };
    let created = upsert_entry(&conn, &entry, None)?;
    println!(
        "{} {} fee for class {class_name}, {month} {session}",
        if created { "Added" } else { "Updated" },
        fee_type.label()
    );
    Ok(())
}

pub fn import(file: &str) -> Result<()> {
    let conn = open_db()?;
    let result = import_catalog(&conn, &PathBuf::from(file))?;
    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }
    println!(
        "{} added, {} updated, {} skipped (unreadable)",
        result.imported, result.updated, result.skipped
    );
    Ok(())
}

pub fn list(class_name: Option<&str>, session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let session = settings.session_or_default(session, parse_today(None)?)?;
    let year = settings.academic_year()?;
    let catalog = FeeCatalog::load(&conn, &session)?;
    let mut entries: Vec<&FeeScheduleEntry> = catalog
        .entries()
        .iter()
        .filter(|e| class_name.map_or(true, |c| e.class_name == c))
        .collect();
    entries.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then(year.position(a.month).cmp(&year.position(b.month)))
            .then(a.fee_type.cmp(&b.fee_type))
    });

    let mut table = Table::new();
    table.set_header(vec!["Class", "Month", "Fee", "Amount"]);
    for e in &entries {
        let amount = if e.is_dynamic() {
            "per student".italic().to_string()
        } else {
            money(e.amount())
        };
        table.add_row(vec![
            Cell::new(&e.class_name),
            Cell::new(e.month),
            Cell::new(e.fee_type.label()),
            Cell::new(amount),
        ]);
    }
    println!("Fee schedule ({session})\n{table}");
    Ok(())
}

pub fn show(student_id: &str, month: &str, session: Option<&str>, today: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let today = parse_today(today)?;
    let session = settings.session_or_default(session, today)?;
    let year = settings.academic_year()?;
    let month = AcademicMonth::from_str(month)?;

    let ctx = students::fee_context(&conn, student_id, &session)?;
    let catalog = FeeCatalog::load(&conn, &session)?;
    let entries = catalog.entries_for(&ctx.class_name, &session, month);
    if entries.is_empty() {
        println!("{}", format!("Note: no fees configured for class {} in {month}", ctx.class_name).yellow());
    }
    let selection = SelectionState::new().toggle(month);
    let mut resolved = ResolvedByMonth::new();
    resolved.insert(month, resolve(&entries, month, &ctx, today, &year));

    println!("{} ({}), class {}, {month} {session}", ctx.student_name, ctx.student_id, ctx.class_name);
    println!("{}", render(&breakdown(&selection, &resolved, &year)));
    if late_fee_applies(today, month, &year) {
        println!("{}", format!("{month} is overdue as of {today}; late fees apply.").red());
    }
    Ok(())
}
