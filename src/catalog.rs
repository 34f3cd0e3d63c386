use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{AmountMode, FeeScheduleEntry, FeeType};
use crate::months::AcademicMonth;

/// Class/session fee schedule. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct FeeCatalog {
    entries: Vec<FeeScheduleEntry>,
}

impl FeeCatalog {
    pub fn new(entries: Vec<FeeScheduleEntry>) -> Self {
        Self { entries }
    }

    /// Load every schedule row for a session. Unreadable rows are skipped.
    pub fn load(conn: &Connection, session: &str) -> Result<Self> {
        Ok(Self::new(list_entries(conn, session, None)?))
    }

    /// Entries that apply to `class_name` in `month`; empty when none are configured.
    pub fn entries_for(&self, class_name: &str, session: &str, month: AcademicMonth) -> Vec<&FeeScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.class_name == class_name && e.session == session && e.month == month)
            .collect()
    }

    pub fn entries(&self) -> &[FeeScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn mode_columns(mode: &AmountMode) -> (&'static str, String) {
    match mode {
        AmountMode::Fixed(a) => ("fixed", a.to_string()),
        AmountMode::Dynamic => ("dynamic", "0".to_string()),
    }
}

pub(crate) fn parse_mode(mode: &str, amount: &str) -> Option<AmountMode> {
    match mode.trim().to_lowercase().as_str() {
        "dynamic" => Some(AmountMode::Dynamic),
        "fixed" | "" => Decimal::from_str(amount.trim()).ok().map(AmountMode::Fixed),
        _ => None,
    }
}

/// Insert or replace the entry keyed by (fee type, class, session, month).
/// Returns true when a new row was created.
pub fn upsert_entry(conn: &Connection, entry: &FeeScheduleEntry, import_id: Option<i64>) -> Result<bool> {
    let existed = conn
        .prepare_cached(
            "SELECT 1 FROM fee_schedule WHERE fee_type = ?1 AND class_name = ?2 AND session = ?3 AND month = ?4",
        )?
        .exists(rusqlite::params![
            entry.fee_type.key(),
            entry.class_name,
            entry.session,
            entry.month.name()
        ])?;
    let (mode, amount) = mode_columns(&entry.amount_mode);
    conn.execute(
        "INSERT INTO fee_schedule (fee_type, class_name, session, month, amount_mode, amount, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT (fee_type, class_name, session, month) \
         DO UPDATE SET amount_mode = excluded.amount_mode, amount = excluded.amount, import_id = excluded.import_id",
        rusqlite::params![
            entry.fee_type.key(),
            entry.class_name,
            entry.session,
            entry.month.name(),
            mode,
            amount,
            import_id
        ],
    )?;
    Ok(!existed)
}

pub fn list_entries(conn: &Connection, session: &str, class_name: Option<&str>) -> Result<Vec<FeeScheduleEntry>> {
    let mut stmt = conn.prepare(
        "SELECT fee_type, class_name, session, month, amount_mode, amount FROM fee_schedule \
         WHERE session = ?1 AND (?2 IS NULL OR class_name = ?2) ORDER BY class_name, fee_type",
    )?;
    let raw: Vec<(String, String, String, String, String, String)> = stmt
        .query_map(rusqlite::params![session, class_name], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(raw.len());
    for (fee_type, class_name, session, month, mode, amount) in raw {
        let parsed = (
            FeeType::from_str(&fee_type).ok(),
            AcademicMonth::from_str(&month).ok(),
            parse_mode(&mode, &amount),
        );
        match parsed {
            (Some(fee_type), Some(month), Some(amount_mode)) => entries.push(FeeScheduleEntry {
                fee_type,
                class_name,
                session,
                month,
                amount_mode,
            }),
            _ => tracing::warn!(%fee_type, %class_name, %month, "skipping unreadable fee schedule row"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use rust_decimal_macros::dec;

    fn sample() -> FeeCatalog {
        FeeCatalog::new(vec![
            FeeScheduleEntry::fixed(FeeType::Tuition, "VI", "2024-25", AcademicMonth::April, dec!(2000)),
            FeeScheduleEntry::dynamic(FeeType::Transport, "VI", "2024-25", AcademicMonth::April),
            FeeScheduleEntry::fixed(FeeType::Tuition, "VII", "2024-25", AcademicMonth::April, dec!(2200)),
            FeeScheduleEntry::fixed(FeeType::Tuition, "VI", "2023-24", AcademicMonth::April, dec!(1800)),
        ])
    }

    #[test]
    fn test_entries_for_filters_class_session_month() {
        let catalog = sample();
        let found = catalog.entries_for("VI", "2024-25", AcademicMonth::April);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.class_name == "VI" && e.session == "2024-25"));
    }

    #[test]
    fn test_entries_for_unconfigured_month_is_empty() {
        let catalog = sample();
        assert!(catalog.entries_for("VI", "2024-25", AcademicMonth::May).is_empty());
        assert!(catalog.entries_for("X", "2024-25", AcademicMonth::April).is_empty());
    }

    #[test]
    fn test_upsert_replaces_instead_of_duplicating() {
        let (_dir, conn) = test_db();
        let mut entry = FeeScheduleEntry::fixed(FeeType::Exam, "VI", "2024-25", AcademicMonth::September, dec!(300));
        assert!(upsert_entry(&conn, &entry, None).unwrap());
        entry.amount_mode = AmountMode::Fixed(dec!(350));
        assert!(!upsert_entry(&conn, &entry, None).unwrap());

        let entries = list_entries(&conn, "2024-25", Some("VI")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount(), dec!(350));
    }

    #[test]
    fn test_load_roundtrips_dynamic_mode() {
        let (_dir, conn) = test_db();
        let entry = FeeScheduleEntry::dynamic(FeeType::Transport, "VI", "2024-25", AcademicMonth::April);
        upsert_entry(&conn, &entry, None).unwrap();
        let catalog = FeeCatalog::load(&conn, "2024-25").unwrap();
        assert_eq!(catalog.entries(), &[entry]);
    }

    #[test]
    fn test_load_skips_unreadable_rows() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO fee_schedule (fee_type, class_name, session, month, amount_mode, amount) \
             VALUES ('tuition', 'VI', '2024-25', 'Aprilish', 'fixed', '100')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO fee_schedule (fee_type, class_name, session, month, amount_mode, amount) \
             VALUES ('tuition', 'VI', '2024-25', 'May', 'fixed', '100')",
            [],
        )
        .unwrap();
        let catalog = FeeCatalog::load(&conn, "2024-25").unwrap();
        assert_eq!(catalog.entries().len(), 1);
        assert_eq!(catalog.entries()[0].month, AcademicMonth::May);
    }
}
