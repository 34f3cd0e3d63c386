use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::{BursarError, Result};
use crate::ledger;
use crate::models::{DepositRecord, DepositStatus, FeeType, StudentFeeContext};
use crate::months::{AcademicMonth, AcademicYear};
use crate::resolver::ResolvedByMonth;
use crate::selection::SelectionState;

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Where committed deposits go. A batch is stored whole or not at all.
pub trait DepositSink {
    fn paid_months(&self, student_id: &str, session: &str) -> Result<BTreeSet<AcademicMonth>>;
    fn write_batch(&mut self, batch: &[DepositRecord]) -> Result<()>;
}

pub struct SqliteDeposits<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDeposits<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DepositSink for SqliteDeposits<'_> {
    fn paid_months(&self, student_id: &str, session: &str) -> Result<BTreeSet<AcademicMonth>> {
        Ok(ledger::partition_for(self.conn, student_id, session)?.paid)
    }

    fn write_batch(&mut self, batch: &[DepositRecord]) -> Result<()> {
        insert_batch(self.conn, batch).map_err(|e| {
            tracing::error!(error = %e, records = batch.len(), "deposit batch rolled back");
            BursarError::Persistence(e.to_string())
        })
    }
}

fn insert_batch(conn: &Connection, batch: &[DepositRecord]) -> Result<()> {
    // Dropping the transaction without commit rolls every row back.
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO deposits (receipt_no, student_id, session, month, school_id, component_amounts, \
             total_amount, transport_amount, late_amount, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for r in batch {
            let components: BTreeMap<&str, String> = r
                .component_amounts
                .iter()
                .map(|(t, a)| (t.key(), a.to_string()))
                .collect();
            stmt.execute(rusqlite::params![
                r.receipt_no,
                r.student_id,
                r.session,
                r.month.name(),
                r.school_id,
                serde_json::to_string(&components)?,
                r.total_amount.to_string(),
                r.transport_amount.to_string(),
                r.late_amount.to_string(),
                r.status.key(),
                r.created_at.format(TIMESTAMP_FMT).to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// `None` when every selected month was already paid.
    pub receipt_no: Option<String>,
    pub written: Vec<DepositRecord>,
    pub already_paid: Vec<AcademicMonth>,
}

impl CommitOutcome {
    pub fn total(&self) -> Decimal {
        self.written.iter().map(|r| r.total_amount).sum()
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BursarError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_identity(ctx: &StudentFeeContext) -> Result<()> {
    require("student id", &ctx.student_id)?;
    require("student name", &ctx.student_name)?;
    require("class name", &ctx.class_name)?;
    require("session", &ctx.session)?;
    Ok(())
}

fn receipt_no(ctx: &StudentFeeContext, months: &[AcademicMonth], now: NaiveDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ctx.student_id.as_bytes());
    hasher.update(ctx.session.as_bytes());
    for m in months {
        hasher.update(m.name().as_bytes());
    }
    hasher.update(now.format(TIMESTAMP_FMT).to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("RC-{}", digest[..10].to_uppercase())
}

/// Record one paid deposit per selected month.
///
/// Identity is checked before the store is touched. Every month to write must
/// have a key in `resolved`; an empty list records a zero-total month, a
/// missing key fails the whole batch. Months the store already has as paid
/// are left out and reported in `already_paid`, so a repeated submission
/// writes nothing new.
pub fn commit<S: DepositSink>(
    ctx: &StudentFeeContext,
    selection: &SelectionState,
    resolved: &ResolvedByMonth,
    sink: &mut S,
    school_id: &str,
    now: NaiveDateTime,
    year: &AcademicYear,
) -> Result<CommitOutcome> {
    validate_identity(ctx)?;

    let already = sink.paid_months(&ctx.student_id, &ctx.session)?;
    let months = selection.months(year);
    let (already_paid, to_write): (Vec<AcademicMonth>, Vec<AcademicMonth>) =
        months.iter().copied().partition(|m| already.contains(m));
    if to_write.is_empty() {
        return Ok(CommitOutcome {
            receipt_no: None,
            written: Vec::new(),
            already_paid,
        });
    }
    let receipt_no = receipt_no(ctx, &to_write, now);

    let mut batch: BTreeMap<(String, String, AcademicMonth), DepositRecord> = BTreeMap::new();
    for month in &to_write {
        let Some(fees) = resolved.get(month) else {
            return Err(BursarError::Validation(format!(
                "{month} was selected but its fees were never resolved"
            )));
        };
        let mut components: BTreeMap<FeeType, Decimal> = BTreeMap::new();
        for fee in fees {
            *components.entry(fee.fee_type).or_default() += fee.amount;
        }
        let record = DepositRecord {
            receipt_no: receipt_no.clone(),
            student_id: ctx.student_id.clone(),
            month: *month,
            session: ctx.session.clone(),
            school_id: school_id.to_string(),
            total_amount: components.values().copied().sum(),
            transport_amount: components.get(&FeeType::Transport).copied().unwrap_or_default(),
            late_amount: components.get(&FeeType::Late).copied().unwrap_or_default(),
            component_amounts: components,
            status: DepositStatus::Paid,
            created_at: now,
        };
        batch.insert((ctx.student_id.clone(), ctx.session.clone(), *month), record);
    }

    let written: Vec<DepositRecord> = batch.into_values().collect();
    sink.write_batch(&written)?;
    tracing::info!(
        student_id = %ctx.student_id,
        session = %ctx.session,
        receipt_no = %receipt_no,
        months = written.len(),
        "deposit committed"
    );

    Ok(CommitOutcome {
        receipt_no: Some(receipt_no),
        written,
        already_paid,
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

type DepositRow = (String, String, String, Option<String>, String, String, String, String, String, String, String);

fn row_to_record(row: DepositRow) -> Option<DepositRecord> {
    let (receipt_no, student_id, session, month, school_id, components, total, transport, late, status, created_at) = row;
    let raw: BTreeMap<String, String> = serde_json::from_str(&components).ok()?;
    let mut component_amounts = BTreeMap::new();
    for (k, v) in raw {
        component_amounts.insert(FeeType::from_str(&k).ok()?, parse_decimal(&v)?);
    }
    Some(DepositRecord {
        receipt_no,
        student_id,
        month: AcademicMonth::from_str(month.as_deref()?).ok()?,
        session,
        school_id,
        component_amounts,
        total_amount: parse_decimal(&total)?,
        transport_amount: parse_decimal(&transport)?,
        late_amount: parse_decimal(&late)?,
        status: DepositStatus::parse(&status)?,
        created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FMT).ok()?,
    })
}

fn query_records(conn: &Connection, clause: &str, param: &str) -> Result<Vec<DepositRecord>> {
    let sql = format!(
        "SELECT receipt_no, student_id, session, month, school_id, component_amounts, \
         total_amount, transport_amount, late_amount, status, created_at \
         FROM deposits WHERE {clause} ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<DepositRow> = stmt
        .query_map([param], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total = rows.len();
    let records: Vec<DepositRecord> = rows.into_iter().filter_map(row_to_record).collect();
    if records.len() < total {
        tracing::warn!(skipped = total - records.len(), "unreadable deposit rows skipped");
    }
    Ok(records)
}

pub fn records_for_receipt(conn: &Connection, receipt_no: &str) -> Result<Vec<DepositRecord>> {
    query_records(conn, "receipt_no = ?1", receipt_no)
}

pub fn paid_records_for_session(conn: &Connection, session: &str) -> Result<Vec<DepositRecord>> {
    query_records(conn, "session = ?1 AND status = 'paid'", session)
}
