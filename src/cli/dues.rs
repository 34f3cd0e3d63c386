use colored::Colorize;

use crate::cli::{open_db, parse_today};
use crate::error::Result;
use crate::ledger::partition_for;
use crate::months::AcademicMonth;
use crate::settings::load_settings;
use crate::students;

fn join(months: &[AcademicMonth]) -> String {
    if months.is_empty() {
        return "(none)".to_string();
    }
    months.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
}

pub fn run(student_id: &str, session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let session = settings.session_or_default(session, parse_today(None)?)?;
    let year = settings.academic_year()?;

    let student = students::get(&conn, student_id)?;
    let partition = partition_for(&conn, student_id, &session)?;

    println!("{} ({}), class {}, session {session}", student.name, student.student_id, student.class_name);
    println!("{}  {}", "Paid:".green().bold(), join(&partition.paid_in_order(&year)));
    println!("{}   {}", "Due:".red().bold(), join(&partition.due_in_order(&year)));
    if partition.skipped > 0 {
        println!(
            "{}",
            format!("{} unreadable deposit record(s) were ignored", partition.skipped).yellow()
        );
    }
    Ok(())
}
