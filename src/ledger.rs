use std::collections::BTreeSet;
use std::str::FromStr;

use rusqlite::Connection;

use crate::error::{FeeWarning, Result};
use crate::models::{DepositRecord, DepositStatus};
use crate::months::{AcademicMonth, AcademicYear, CALENDAR};

/// One row of deposit history as read back from the store. The month stays
/// raw so unreadable rows can be counted instead of failing the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub student_id: String,
    pub session: String,
    pub month: Option<String>,
    pub status: Option<DepositStatus>,
}

impl From<&DepositRecord> for LedgerEntry {
    fn from(r: &DepositRecord) -> Self {
        Self {
            student_id: r.student_id.clone(),
            session: r.session.clone(),
            month: Some(r.month.name().to_string()),
            status: Some(r.status),
        }
    }
}

/// Paid/due split of the twelve months for one student and session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthPartition {
    pub paid: BTreeSet<AcademicMonth>,
    pub due: BTreeSet<AcademicMonth>,
    pub skipped: usize,
}

impl MonthPartition {
    pub fn is_paid(&self, month: AcademicMonth) -> bool {
        self.paid.contains(&month)
    }

    pub fn paid_in_order(&self, year: &AcademicYear) -> Vec<AcademicMonth> {
        year.sorted(&self.paid)
    }

    pub fn due_in_order(&self, year: &AcademicYear) -> Vec<AcademicMonth> {
        year.sorted(&self.due)
    }
}

/// Split the year into paid and due months from the supplied history.
///
/// Duplicate paid rows for a month collapse into one. Rows with a missing or
/// unknown month are skipped and counted in `skipped`.
pub fn partition(student_id: &str, session: &str, entries: &[LedgerEntry]) -> MonthPartition {
    let mut paid = BTreeSet::new();
    let mut skipped = 0usize;

    for entry in entries {
        if entry.student_id != student_id || entry.session != session {
            continue;
        }
        let month = entry
            .month
            .as_deref()
            .and_then(|m| AcademicMonth::from_str(m).ok());
        let Some(month) = month else {
            skipped += 1;
            let warning = FeeWarning::MalformedRecord {
                raw_month: entry.month.clone(),
            };
            tracing::warn!(student_id, session, "{warning}");
            continue;
        };
        if entry.status == Some(DepositStatus::Paid) {
            paid.insert(month);
        }
    }

    let due = CALENDAR.into_iter().filter(|m| !paid.contains(m)).collect();
    MonthPartition { paid, due, skipped }
}

pub fn load_history(conn: &Connection, student_id: &str, session: &str) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, session, month, status FROM deposits WHERE student_id = ?1 AND session = ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![student_id, session], |row| {
            let status: String = row.get(3)?;
            Ok(LedgerEntry {
                student_id: row.get(0)?,
                session: row.get(1)?,
                month: row.get(2)?,
                status: DepositStatus::parse(&status),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Partition straight from the store.
pub fn partition_for(conn: &Connection, student_id: &str, session: &str) -> Result<MonthPartition> {
    let history = load_history(conn, student_id, session)?;
    Ok(partition(student_id, session, &history))
}
