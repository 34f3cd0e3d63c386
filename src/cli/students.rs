use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_today};
use crate::error::Result;
use crate::settings::load_settings;
use crate::students::{self, Student};

pub struct AddArgs {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub section: Option<String>,
    pub admission_no: Option<String>,
    pub roll_no: Option<String>,
    pub session: Option<String>,
}

pub fn add(args: AddArgs) -> Result<()> {
    let conn = open_db()?;
    let session = load_settings().session_or_default(args.session.as_deref(), parse_today(None)?)?;
    let student = Student {
        student_id: args.student_id,
        name: args.name,
        class_name: args.class_name,
        section: args.section,
        session,
        admission_no: args.admission_no,
        roll_no: args.roll_no,
    };
    students::add(&conn, &student)?;
    println!("Added student: {} ({}, class {})", student.name, student.student_id, student.class_name);
    Ok(())
}

pub fn list(class_name: Option<&str>, session: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let rows = students::list(&conn, class_name, session)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Class", "Section", "Roll", "Admission", "Session"]);
    for s in rows {
        table.add_row(vec![
            Cell::new(s.student_id),
            Cell::new(s.name),
            Cell::new(s.class_name),
            Cell::new(s.section.unwrap_or_default()),
            Cell::new(s.roll_no.unwrap_or_default()),
            Cell::new(s.admission_no.unwrap_or_default()),
            Cell::new(s.session),
        ]);
    }
    println!("Students\n{table}");
    Ok(())
}
