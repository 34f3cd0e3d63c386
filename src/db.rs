use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    class_name TEXT NOT NULL,
    section TEXT,
    session TEXT NOT NULL,
    admission_no TEXT,
    roll_no TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY,
    vehicle_no TEXT NOT NULL UNIQUE,
    route TEXT NOT NULL,
    price TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transport_assignments (
    student_id TEXT NOT NULL,
    session TEXT NOT NULL,
    vehicle_id INTEGER NOT NULL,
    assigned_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (student_id, session),
    FOREIGN KEY (student_id) REFERENCES students(student_id),
    FOREIGN KEY (vehicle_id) REFERENCES vehicles(id)
);

CREATE TABLE IF NOT EXISTS fee_schedule (
    id INTEGER PRIMARY KEY,
    fee_type TEXT NOT NULL,
    class_name TEXT NOT NULL,
    session TEXT NOT NULL,
    month TEXT NOT NULL,
    amount_mode TEXT NOT NULL DEFAULT 'fixed',
    amount TEXT NOT NULL DEFAULT '0',
    import_id INTEGER,
    UNIQUE (fee_type, class_name, session, month),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS deposits (
    id INTEGER PRIMARY KEY,
    receipt_no TEXT NOT NULL,
    student_id TEXT NOT NULL,
    session TEXT NOT NULL,
    month TEXT,
    school_id TEXT NOT NULL,
    component_amounts TEXT NOT NULL,
    total_amount TEXT NOT NULL,
    transport_amount TEXT NOT NULL,
    late_amount TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'paid',
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS deposits_one_paid_month
    ON deposits (student_id, session, month) WHERE status = 'paid';

CREATE INDEX IF NOT EXISTS deposits_receipt ON deposits (receipt_no);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["students", "vehicles", "transport_assignments", "fee_schedule", "imports", "deposits"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_second_paid_row_for_same_month_is_rejected() {
        let (_dir, conn) = test_db();
        let insert = "INSERT INTO deposits (receipt_no, student_id, session, month, school_id, component_amounts, \
                      total_amount, transport_amount, late_amount, status, created_at) \
                      VALUES ('R1', 'S1', '2024-25', 'April', 'SCH', '{}', '0', '0', '0', ?1, '2024-04-02 10:00:00')";
        conn.execute(insert, ["paid"]).unwrap();
        conn.execute(insert, ["cancelled"]).unwrap();
        assert!(conn.execute(insert, ["paid"]).is_err());
    }
}
