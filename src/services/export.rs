//! # Record Export
//!
//! Writes the active records to a CSV file with the same header and cell text as the sheet,
//! so the file opens directly in any spreadsheet program.

use std::io::Write;
use std::path::Path;
use crate::errors::TrackerResult;
use crate::models::{ShipmentRecord, SHEET_HEADERS};

/// Serializes `records` as CSV into any writer
pub fn write_csv<W: Write>(writer: W, records: &[ShipmentRecord]) -> TrackerResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(SHEET_HEADERS)?;
    for record in records {
        csv.write_record(record.to_row())?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes `records` to a CSV file at `path`, replacing any existing file
///
/// # Returns
///
/// * `Ok(usize)`: The number of records written
/// * `Err(TrackerError)` if the file cannot be created or written
pub fn export_csv(path: &Path, records: &[ShipmentRecord]) -> TrackerResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv(file, records)?;
    Ok(records.len())
}
