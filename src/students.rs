use rusqlite::{Connection, OptionalExtension};

use crate::error::{BursarError, Result};
use crate::models::StudentFeeContext;
use crate::months::validate_session;
use crate::transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub section: Option<String>,
    pub session: String,
    pub admission_no: Option<String>,
    pub roll_no: Option<String>,
}

pub fn add(conn: &Connection, student: &Student) -> Result<()> {
    for (field, value) in [
        ("student id", &student.student_id),
        ("name", &student.name),
        ("class", &student.class_name),
    ] {
        if value.trim().is_empty() {
            return Err(BursarError::Validation(format!("{field} is required")));
        }
    }
    validate_session(&student.session)?;
    conn.execute(
        "INSERT INTO students (student_id, name, class_name, section, session, admission_no, roll_no) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            student.student_id,
            student.name,
            student.class_name,
            student.section,
            student.session,
            student.admission_no,
            student.roll_no,
        ],
    )?;
    Ok(())
}

fn row_to_student(row: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        student_id: row.get(0)?,
        name: row.get(1)?,
        class_name: row.get(2)?,
        section: row.get(3)?,
        session: row.get(4)?,
        admission_no: row.get(5)?,
        roll_no: row.get(6)?,
    })
}

pub fn get(conn: &Connection, student_id: &str) -> Result<Student> {
    conn.query_row(
        "SELECT student_id, name, class_name, section, session, admission_no, roll_no \
         FROM students WHERE student_id = ?1",
        [student_id],
        row_to_student,
    )
    .optional()?
    .ok_or_else(|| BursarError::UnknownStudent(student_id.to_string()))
}

pub fn list(conn: &Connection, class_name: Option<&str>, session: Option<&str>) -> Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, name, class_name, section, session, admission_no, roll_no FROM students \
         WHERE (?1 IS NULL OR class_name = ?1) AND (?2 IS NULL OR session = ?2) \
         ORDER BY class_name, section, roll_no, name",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![class_name, session], row_to_student)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Everything fee resolution needs about one student for one session.
pub fn fee_context(conn: &Connection, student_id: &str, session: &str) -> Result<StudentFeeContext> {
    let student = get(conn, student_id)?;
    let dynamic_transport_amount = transport::transport_amount(conn, student_id, session)?;
    Ok(StudentFeeContext {
        student_id: student.student_id,
        student_name: student.name,
        class_name: student.class_name,
        section: student.section,
        session: session.to_string(),
        admission_no: student.admission_no,
        roll_no: student.roll_no,
        dynamic_transport_amount,
    })
}

#[cfg(test)]
pub(crate) fn sample(student_id: &str, class_name: &str) -> Student {
    Student {
        student_id: student_id.to_string(),
        name: format!("Student {student_id}"),
        class_name: class_name.to_string(),
        section: Some("A".to_string()),
        session: "2024-25".to_string(),
        admission_no: Some(format!("ADM-{student_id}")),
        roll_no: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use rust_decimal_macros::dec;

    #[test]
    fn test_add_and_get() {
        let (_dir, conn) = test_db();
        add(&conn, &sample("S1", "VI")).unwrap();
        let s = get(&conn, "S1").unwrap();
        assert_eq!(s.class_name, "VI");
        assert_eq!(s.admission_no.as_deref(), Some("ADM-S1"));
    }

    #[test]
    fn test_get_unknown() {
        let (_dir, conn) = test_db();
        assert!(matches!(get(&conn, "nobody"), Err(BursarError::UnknownStudent(_))));
    }

    #[test]
    fn test_add_requires_identity() {
        let (_dir, conn) = test_db();
        let mut s = sample("S1", "VI");
        s.class_name = String::new();
        assert!(matches!(add(&conn, &s), Err(BursarError::Validation(_))));
        let mut s = sample("S1", "VI");
        s.session = "2024".to_string();
        assert!(matches!(add(&conn, &s), Err(BursarError::InvalidSession(_))));
    }

    #[test]
    fn test_list_filters_by_class() {
        let (_dir, conn) = test_db();
        add(&conn, &sample("S1", "VI")).unwrap();
        add(&conn, &sample("S2", "VII")).unwrap();
        add(&conn, &sample("S3", "VI")).unwrap();
        assert_eq!(list(&conn, Some("VI"), None).unwrap().len(), 2);
        assert_eq!(list(&conn, None, Some("2024-25")).unwrap().len(), 3);
    }

    #[test]
    fn test_fee_context_without_vehicle() {
        let (_dir, conn) = test_db();
        add(&conn, &sample("S1", "VI")).unwrap();
        let ctx = fee_context(&conn, "S1", "2024-25").unwrap();
        assert_eq!(ctx.student_name, "Student S1");
        assert_eq!(ctx.dynamic_transport_amount, None);
    }

    #[test]
    fn test_fee_context_picks_up_vehicle_price() {
        let (_dir, conn) = test_db();
        add(&conn, &sample("S1", "VI")).unwrap();
        transport::add_vehicle(&conn, "KA-01-1234", "North loop", dec!(1200)).unwrap();
        transport::assign(&conn, "KA-01-1234", "2024-25", &["S1".to_string()]).unwrap();
        let ctx = fee_context(&conn, "S1", "2024-25").unwrap();
        assert_eq!(ctx.dynamic_transport_amount, Some(dec!(1200)));
        let other = fee_context(&conn, "S1", "2025-26").unwrap();
        assert_eq!(other.dynamic_transport_amount, None);
    }
}
