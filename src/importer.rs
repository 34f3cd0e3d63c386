use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::catalog::{parse_mode, upsert_entry};
use crate::error::Result;
use crate::models::{AmountMode, FeeScheduleEntry, FeeType};
use crate::months::{validate_session, AcademicMonth};

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

pub struct ImportResult {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

/// Parse one CSV record: fee_type, class_name, session, month, amount_mode, amount.
fn parse_row(record: &csv::StringRecord) -> Option<FeeScheduleEntry> {
    let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");
    let fee_type = FeeType::from_str(field(0)).ok()?;
    let class_name = field(1);
    let session = field(2);
    if class_name.is_empty() || validate_session(session).is_err() {
        return None;
    }
    let month = AcademicMonth::from_str(field(3)).ok()?;
    let amount_mode = parse_mode(field(4), field(5))?;
    match amount_mode {
        AmountMode::Dynamic if fee_type != FeeType::Transport => return None,
        AmountMode::Fixed(a) if a.is_sign_negative() => return None,
        _ => {}
    }
    Some(FeeScheduleEntry {
        fee_type,
        class_name: class_name.to_string(),
        session: session.to_string(),
        month,
        amount_mode,
    })
}

/// Load a fee schedule CSV (with a header row) into the catalog.
///
/// A file whose checksum was imported before is refused. Rows that do not
/// parse are counted as skipped; rows for an existing
/// (fee type, class, session, month) replace it.
pub fn import_catalog(conn: &Connection, file_path: &Path) -> Result<ImportResult> {
    let checksum = compute_checksum(file_path)?;
    if conn
        .prepare("SELECT 1 FROM imports WHERE checksum = ?1")?
        .exists([&checksum])?
    {
        return Ok(ImportResult {
            imported: 0,
            updated: 0,
            skipped: 0,
            duplicate_file: true,
        });
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(file_path)?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        match result.ok().as_ref().and_then(parse_row) {
            Some(entry) => entries.push(entry),
            None => {
                skipped += 1;
                tracing::warn!(line = line + 2, "skipping unreadable fee schedule row");
            }
        }
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO imports (filename, record_count, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            entries.len() as i64,
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    let mut imported = 0usize;
    let mut updated = 0usize;
    for entry in &entries {
        if upsert_entry(&tx, entry, Some(import_id))? {
            imported += 1;
        } else {
            updated += 1;
        }
    }
    tx.commit()?;

    Ok(ImportResult {
        imported,
        updated,
        skipped,
        duplicate_file: false,
    })
}
