use std::collections::BTreeSet;
use std::str::FromStr;

use colored::Colorize;

use crate::catalog::FeeCatalog;
use crate::cli::{open_db, parse_today, receipt::render};
use crate::deposit::{commit, SqliteDeposits};
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::partition_for;
use crate::months::AcademicMonth;
use crate::resolver::resolve_selection;
use crate::selection::{breakdown, SelectionState};
use crate::settings::load_settings;
use crate::students;

pub fn run(
    student_id: &str,
    months: &[String],
    session: Option<&str>,
    today: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let today = parse_today(today)?;
    let session = settings.session_or_default(session, today)?;
    let year = settings.academic_year()?;

    let requested = months
        .iter()
        .map(|m| AcademicMonth::from_str(m))
        .collect::<Result<BTreeSet<_>>>()?;

    let ctx = students::fee_context(&conn, student_id, &session)?;
    let partition = partition_for(&conn, student_id, &session)?;

    let mut selection = SelectionState::new();
    for month in year.sorted(&requested) {
        if partition.is_paid(month) {
            println!("{}", format!("{month} is already paid, skipping").yellow());
        } else {
            selection = selection.toggle(month);
        }
    }
    if selection.is_empty() {
        println!("Nothing to deposit.");
        return Ok(());
    }

    let catalog = FeeCatalog::load(&conn, &session)?;
    if catalog.is_empty() {
        println!("{}", format!("Note: no fee schedule for {session}; see `bursar fees add`").yellow());
    }
    let (resolved, warnings) = resolve_selection(&catalog, &selection, &ctx, today, &year);
    for w in &warnings {
        println!("{}", format!("Note: {w}").yellow());
    }

    let section = ctx.section.as_deref().map(|s| format!("-{s}")).unwrap_or_default();
    println!(
        "{} ({}), class {}{section}, session {session}",
        ctx.student_name, ctx.student_id, ctx.class_name
    );
    if let (Some(adm), roll) = (&ctx.admission_no, &ctx.roll_no) {
        println!("Admission no. {adm}{}", roll.as_deref().map(|r| format!(", roll {r}")).unwrap_or_default());
    }
    println!("{}", render(&breakdown(&selection, &resolved, &year)));

    if dry_run {
        println!("Dry run: {} month(s), nothing saved.", selection.len());
        return Ok(());
    }

    let now = today.and_time(chrono::Local::now().time());
    let mut sink = SqliteDeposits::new(&conn);
    let outcome = commit(&ctx, &selection, &resolved, &mut sink, &settings.school_id, now, &year)?;

    for month in &outcome.already_paid {
        println!("{}", format!("{month} was paid meanwhile, skipped").yellow());
    }
    let Some(receipt_no) = outcome.receipt_no.as_deref() else {
        println!("Nothing new to record; every selected month is already paid.");
        return Ok(());
    };
    println!(
        "{} {}  {} month(s)  total {}",
        "Saved receipt".green().bold(),
        receipt_no,
        outcome.written.len(),
        money(outcome.total())
    );
    Ok(())
}
