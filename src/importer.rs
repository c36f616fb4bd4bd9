use std::path::Path;

use comfy_table::{Cell, Table};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::cli::accounts::find_account_id;
use crate::cli::transactions::bulk_create_transactions;
use crate::error::{Result, TallyError};
use crate::mapper::{ColumnMapper, RawTable, REQUIRED_ROLES};
use crate::models::{NormalizedRecord, RejectedRow};
use crate::normalizer::{normalize_table, Normalized};

const PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Reading and previewing
// ---------------------------------------------------------------------------

pub fn read_table(file_path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    let table = RawTable::from_rows(rows);
    tracing::debug!(
        "Read {} columns, {} rows from {}",
        table.width(),
        table.body.len(),
        file_path.display()
    );
    Ok(table)
}

/// Header labels, the role chosen for each column, and the first few rows.
pub fn preview(table: &RawTable, mapper: &ColumnMapper) -> Table {
    let mut out = Table::new();
    out.set_header(
        table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| Cell::new(format!("[{i}] {h}\n{}", mapper.choice(i).label())))
            .collect::<Vec<_>>(),
    );
    for row in table.body.iter().take(PREVIEW_ROWS) {
        out.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
    }
    out
}

pub fn progress_label(mapper: &ColumnMapper) -> String {
    format!("{} / {}", mapper.progress_count(), REQUIRED_ROLES.len())
}

pub fn normalize_file(file_path: &Path, mapper: &ColumnMapper) -> Result<Normalized> {
    let table = read_table(file_path)?;
    if !mapper.required_roles_satisfied() {
        return Err(TallyError::MappingIncomplete(
            mapper.missing_roles().iter().map(|r| r.to_string()).collect(),
        ));
    }
    normalize_table(&mapper.build_mapped_table(&table))
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ImportResult {
    pub imported: usize,
    /// Parsed fine but the date did not; left out for manual correction.
    pub undated: Vec<NormalizedRecord>,
    pub rejected: Vec<RejectedRow>,
    pub duplicate_file: bool,
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

pub fn import_file(
    conn: &mut Connection,
    file_path: &Path,
    account_name: &str,
    mapper: &ColumnMapper,
) -> Result<ImportResult> {
    let account_id = find_account_id(conn, account_name)?;

    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND account_id = ?2")?;
        if stmt.exists(rusqlite::params![checksum, account_id])? {
            tracing::info!("{} already imported into {account_name}", file_path.display());
            return Ok(ImportResult {
                duplicate_file: true,
                ..Default::default()
            });
        }
    }

    let Normalized { records, rejected } = normalize_file(file_path, mapper)?;
    let (ready, undated): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.date.is_some());

    let dates: Vec<&str> = ready.iter().filter_map(|r| r.date.as_deref()).collect();
    let min_date = dates.iter().min().copied();
    let max_date = dates.iter().max().copied();

    // The checksum row and its transactions commit together or not at all,
    // so a failed import can be retried.
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO imports (filename, account_id, record_count, date_range_start, date_range_end, checksum) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            account_id,
            ready.len() as i64,
            min_date,
            max_date,
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();
    let ids = bulk_create_transactions(&tx, account_id, Some(import_id), &ready)?;
    tx.commit()?;
    tracing::info!(
        "Imported {} rows from {} ({} undated, {} rejected)",
        ids.len(),
        file_path.display(),
        undated.len(),
        rejected.len()
    );

    Ok(ImportResult {
        imported: ids.len(),
        undated,
        rejected,
        duplicate_file: false,
    })
}
