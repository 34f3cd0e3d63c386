use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::catalog::FeeCatalog;
use crate::deposit::paid_records_for_session;
use crate::error::Result;
use crate::ledger::partition_for;
use crate::models::FeeType;
use crate::months::{AcademicMonth, AcademicYear};
use crate::resolver::resolve_selection;
use crate::selection::{total, SelectionState};
use crate::students;

/// Months of `session` that have started by `today`.
pub fn elapsed_months(year: &AcademicYear, session: &str, today: NaiveDate) -> Vec<AcademicMonth> {
    let months = year.months();
    match session.cmp(year.session_for(today).as_str()) {
        Ordering::Less => months.to_vec(),
        Ordering::Equal => {
            let upto = year.position(AcademicMonth::of_date(today));
            months[..=upto].to_vec()
        }
        Ordering::Greater => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Class dues
// ---------------------------------------------------------------------------

pub struct DuesRow {
    pub student_id: String,
    pub name: String,
    pub roll_no: Option<String>,
    pub due_months: Vec<AcademicMonth>,
    pub outstanding: Decimal,
}

/// Unpaid months so far this session for every student in a class, with the
/// amount each would pay today (late fees included where they apply).
pub fn class_dues(
    conn: &Connection,
    class_name: &str,
    session: &str,
    today: NaiveDate,
    year: &AcademicYear,
) -> Result<Vec<DuesRow>> {
    let catalog = FeeCatalog::load(conn, session)?;
    let elapsed = elapsed_months(year, session, today);
    let mut rows = Vec::new();

    for student in students::list(conn, Some(class_name), Some(session))? {
        let ctx = students::fee_context(conn, &student.student_id, session)?;
        let partition = partition_for(conn, &student.student_id, session)?;
        let due_months: Vec<AcademicMonth> = elapsed
            .iter()
            .copied()
            .filter(|m| !partition.is_paid(*m))
            .collect();
        let selection = due_months
            .iter()
            .fold(SelectionState::new(), |s, m| s.toggle(*m));
        let (resolved, _) = resolve_selection(&catalog, &selection, &ctx, today, year);
        rows.push(DuesRow {
            student_id: student.student_id,
            name: student.name,
            roll_no: student.roll_no,
            outstanding: total(&selection, &resolved),
            due_months,
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Collection summary
// ---------------------------------------------------------------------------

pub struct MonthCollection {
    pub month: AcademicMonth,
    pub amount: Decimal,
    pub deposits: usize,
}

pub struct CollectionReport {
    pub by_fee_type: Vec<(FeeType, Decimal)>,
    pub by_month: Vec<MonthCollection>,
    pub receipts: usize,
    pub total: Decimal,
}

pub fn collection_summary(conn: &Connection, session: &str, year: &AcademicYear) -> Result<CollectionReport> {
    let records = paid_records_for_session(conn, session)?;

    let mut by_fee_type: BTreeMap<FeeType, Decimal> = BTreeMap::new();
    let mut by_month: BTreeMap<AcademicMonth, (Decimal, usize)> = BTreeMap::new();
    let mut receipts = BTreeSet::new();
    for r in &records {
        for (fee_type, amount) in &r.component_amounts {
            *by_fee_type.entry(*fee_type).or_default() += *amount;
        }
        let slot = by_month.entry(r.month).or_default();
        slot.0 += r.total_amount;
        slot.1 += 1;
        receipts.insert(r.receipt_no.as_str());
    }

    let by_month = year
        .months()
        .into_iter()
        .filter_map(|m| {
            by_month.get(&m).map(|(amount, deposits)| MonthCollection {
                month: m,
                amount: *amount,
                deposits: *deposits,
            })
        })
        .collect();

    Ok(CollectionReport {
        total: records.iter().map(|r| r.total_amount).sum(),
        by_fee_type: by_fee_type.into_iter().collect(),
        by_month,
        receipts: receipts.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::upsert_entry;
    use crate::db::test_db;
    use crate::deposit::{commit, SqliteDeposits};
    use crate::models::FeeScheduleEntry;
    use crate::transport;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(conn: &Connection) {
        for id in ["S1", "S2"] {
            students::add(conn, &students::sample(id, "VI")).unwrap();
        }
        for month in [AcademicMonth::April, AcademicMonth::May, AcademicMonth::June] {
            upsert_entry(conn, &FeeScheduleEntry::fixed(FeeType::Tuition, "VI", "2024-25", month, dec!(2000)), None).unwrap();
            upsert_entry(conn, &FeeScheduleEntry::dynamic(FeeType::Transport, "VI", "2024-25", month), None).unwrap();
            upsert_entry(conn, &FeeScheduleEntry::fixed(FeeType::Late, "VI", "2024-25", month, dec!(50)), None).unwrap();
        }
        transport::add_vehicle(conn, "BUS-1", "North", dec!(1200)).unwrap();
        transport::assign(conn, "BUS-1", "2024-25", &["S1".to_string()]).unwrap();
    }

    fn pay(conn: &Connection, student: &str, months: &[AcademicMonth], today: NaiveDate) {
        let year = AcademicYear::default();
        let ctx = students::fee_context(conn, student, "2024-25").unwrap();
        let catalog = FeeCatalog::load(conn, "2024-25").unwrap();
        let selection = months.iter().fold(SelectionState::new(), |s, m| s.toggle(*m));
        let (resolved, _) = resolve_selection(&catalog, &selection, &ctx, today, &year);
        let mut sink = SqliteDeposits::new(conn);
        commit(&ctx, &selection, &resolved, &mut sink, "SCH", today.and_hms_opt(10, 0, 0).unwrap(), &year).unwrap();
    }

    #[test]
    fn test_elapsed_months() {
        let year = AcademicYear::default();
        assert_eq!(elapsed_months(&year, "2024-25", date(2024, 6, 15)).len(), 3);
        assert_eq!(elapsed_months(&year, "2023-24", date(2024, 6, 15)).len(), 12);
        assert!(elapsed_months(&year, "2025-26", date(2024, 6, 15)).is_empty());
        assert_eq!(elapsed_months(&year, "2024-25", date(2025, 3, 1)).len(), 12);
    }

    #[test]
    fn test_class_dues_counts_unpaid_and_late() {
        let (_dir, conn) = test_db();
        setup(&conn);
        pay(&conn, "S1", &[AcademicMonth::April], date(2024, 4, 5));

        let rows = class_dues(&conn, "VI", "2024-25", date(2024, 6, 15), &AcademicYear::default()).unwrap();
        let s1 = rows.iter().find(|r| r.student_id == "S1").unwrap();
        // May is late in June; June is not.
        assert_eq!(s1.due_months, vec![AcademicMonth::May, AcademicMonth::June]);
        assert_eq!(s1.outstanding, dec!(3250) + dec!(3200));

        let s2 = rows.iter().find(|r| r.student_id == "S2").unwrap();
        assert_eq!(s2.due_months.len(), 3);
        assert_eq!(s2.outstanding, dec!(2050) * dec!(2) + dec!(2000));
    }

    #[test]
    fn test_class_dues_only_lists_students_of_the_session() {
        let (_dir, conn) = test_db();
        setup(&conn);
        let mut later = students::sample("S3", "VI");
        later.session = "2025-26".to_string();
        students::add(&conn, &later).unwrap();

        let rows = class_dues(&conn, "VI", "2024-25", date(2024, 6, 15), &AcademicYear::default()).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_collection_summary() {
        let (_dir, conn) = test_db();
        setup(&conn);
        pay(&conn, "S1", &[AcademicMonth::April, AcademicMonth::May], date(2024, 5, 5));
        pay(&conn, "S2", &[AcademicMonth::April], date(2024, 5, 6));

        let report = collection_summary(&conn, "2024-25", &AcademicYear::default()).unwrap();
        assert_eq!(report.receipts, 2);
        // S1: April 2000+1200+50 late, May 2000+1200; S2: April 2000+0+50.
        assert_eq!(report.total, dec!(3250) + dec!(3200) + dec!(2050));
        let april = &report.by_month[0];
        assert_eq!(april.month, AcademicMonth::April);
        assert_eq!(april.deposits, 2);
        let transport = report.by_fee_type.iter().find(|(t, _)| *t == FeeType::Transport).unwrap();
        assert_eq!(transport.1, dec!(2400));
    }
}
