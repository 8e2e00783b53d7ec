//! # In-Memory Spreadsheet

//! `MemorySheets` keeps a whole workbook in process memory. It backs the `memory` sheet backend for offline runs
//! and the integration tests, and reproduces the Sheets API behaviours the tracker relies on: trimmed trailing cells,
//! append-after-last-row, and `SheetNotFound` for missing worksheets.

use std::collections::HashSet;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use crate::errors::{TrackerError, TrackerResult};
use crate::services::sheets::{Row, SheetClient};

#[derive(Debug, Clone)]
struct Worksheet {
    title: String,
    rows: Vec<Row>,
}

/// An in-process workbook implementing `SheetClient`
#[derive(Debug, Default)]
pub struct MemorySheets {
    sheets: Mutex<Vec<Worksheet>>,
    failing: Mutex<HashSet<String>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a workbook with the given worksheets already filled in
    pub fn with_sheets<I, S>(sheets: I) -> Self
        where
            I: IntoIterator<Item = (S, Vec<Row>)>,
            S: Into<String>,
    {
        let sheets = sheets.into_iter()
            .map(|(title, rows)| Worksheet { title: title.into(), rows })
            .collect();
        Self { sheets: Mutex::new(sheets), failing: Mutex::new(HashSet::new()) }
    }

    /// Makes every write to `title` (including creating it) fail with a 503, until `restore_writes` is called
    pub fn fail_writes_to(&self, title: &str) {
        self.failing.lock().insert(title.to_string());
    }

    pub fn restore_writes(&self) {
        self.failing.lock().clear();
    }

    /// Snapshot of a worksheet's trimmed rows, or `None` if it does not exist
    pub fn rows(&self, title: &str) -> Option<Vec<Row>> {
        self.sheets.lock()
            .iter()
            .find(|s| s.title == title)
            .map(|s| trimmed(&s.rows))
    }

    fn check_writable(&self, title: &str) -> TrackerResult<()> {
        if self.failing.lock().contains(title) {
            return Err(TrackerError::SheetApi {
                status: 503,
                message: format!("write to '{}' rejected", title),
            });
        }
        Ok(())
    }

    fn with_sheet<T>(&self, title: &str, f: impl FnOnce(&mut Vec<Row>) -> TrackerResult<T>) -> TrackerResult<T> {
        let mut sheets = self.sheets.lock();
        let sheet = sheets.iter_mut()
            .find(|s| s.title == title)
            .ok_or_else(|| TrackerError::SheetNotFound(title.to_string()))?;
        f(&mut sheet.rows)
    }
}

fn trim_row(row: &Row) -> Row {
    let len = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
    row[..len].to_vec()
}

fn trimmed(rows: &[Row]) -> Vec<Row> {
    let mut rows: Vec<Row> = rows.iter().map(trim_row).collect();
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

#[async_trait]
impl SheetClient for MemorySheets {
    async fn worksheet_titles(&self) -> TrackerResult<Vec<String>> {
        Ok(self.sheets.lock().iter().map(|s| s.title.clone()).collect())
    }

    async fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> TrackerResult<()> {
        self.check_writable(title)?;
        let mut sheets = self.sheets.lock();
        if sheets.iter().any(|s| s.title == title) {
            return Err(TrackerError::SheetExists(title.to_string()));
        }
        debug!("Adding worksheet '{}' ({}x{})", title, rows, cols);
        sheets.push(Worksheet { title: title.to_string(), rows: Vec::new() });
        Ok(())
    }

    async fn delete_worksheet(&self, title: &str) -> TrackerResult<()> {
        self.check_writable(title)?;
        let mut sheets = self.sheets.lock();
        let index = sheets.iter()
            .position(|s| s.title == title)
            .ok_or_else(|| TrackerError::SheetNotFound(title.to_string()))?;
        sheets.remove(index);
        Ok(())
    }

    async fn get_values(&self, sheet: &str) -> TrackerResult<Vec<Row>> {
        self.with_sheet(sheet, |rows| Ok(trimmed(rows)))
    }

    async fn append_row(&self, sheet: &str, row: Row) -> TrackerResult<()> {
        self.check_writable(sheet)?;
        self.with_sheet(sheet, |rows| {
            let last = trimmed(rows).len();
            rows.truncate(last);
            rows.push(row);
            Ok(())
        })
    }

    async fn update_rows(&self, sheet: &str, start_row: usize, new_rows: Vec<Row>) -> TrackerResult<()> {
        self.check_writable(sheet)?;
        if start_row == 0 {
            return Err(TrackerError::SheetApi { status: 400, message: "rows are numbered from 1".into() });
        }
        self.with_sheet(sheet, |rows| {
            let end = start_row - 1 + new_rows.len();
            if rows.len() < end {
                rows.resize(end, Vec::new());
            }
            for (offset, row) in new_rows.into_iter().enumerate() {
                rows[start_row - 1 + offset] = row;
            }
            Ok(())
        })
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> TrackerResult<()> {
        self.check_writable(sheet)?;
        self.with_sheet(sheet, |rows| {
            if row == 0 || row > rows.len() {
                return Err(TrackerError::SheetApi {
                    status: 400,
                    message: format!("row {} is outside the grid of '{}'", row, sheet),
                });
            }
            rows.remove(row - 1);
            Ok(())
        })
    }

    async fn clear_below(&self, sheet: &str, start_row: usize) -> TrackerResult<()> {
        self.check_writable(sheet)?;
        if start_row == 0 {
            return Err(TrackerError::SheetApi { status: 400, message: "rows are numbered from 1".into() });
        }
        self.with_sheet(sheet, |rows| {
            rows.truncate(start_row - 1);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn trims_trailing_cells_and_rows() {
        let sheets = MemorySheets::with_sheets([("s", vec![row(&["a", "", ""]), row(&["", ""])])]);
        assert_eq!(sheets.get_values("s").await.unwrap(), vec![row(&["a"])]);
    }

    #[tokio::test]
    async fn append_lands_after_last_non_empty_row() {
        let sheets = MemorySheets::with_sheets([("s", vec![row(&["h"]), row(&[]), row(&[])])]);
        sheets.append_row("s", row(&["x"])).await.unwrap();
        assert_eq!(sheets.get_values("s").await.unwrap(), vec![row(&["h"]), row(&["x"])]);
    }

    #[tokio::test]
    async fn missing_sheet_is_reported() {
        let sheets = MemorySheets::new();
        assert!(matches!(sheets.get_values("nope").await, Err(TrackerError::SheetNotFound(_))));
        assert!(!sheets.worksheet_exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn failing_sheet_rejects_writes_but_allows_reads() {
        let sheets = MemorySheets::with_sheets([("s", vec![row(&["h"])])]);
        sheets.fail_writes_to("s");
        assert!(sheets.append_row("s", row(&["x"])).await.is_err());
        assert_eq!(sheets.get_values("s").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_below_keeps_rows_above_and_the_sheet() {
        let sheets = MemorySheets::with_sheets([("s", vec![row(&["h"]), row(&["x"]), row(&["y"])])]);
        sheets.clear_below("s", 2).await.unwrap();
        assert!(sheets.worksheet_exists("s").await.unwrap());
        assert_eq!(sheets.get_values("s").await.unwrap(), vec![row(&["h"])]);
        sheets.clear_below("s", 1).await.unwrap();
        assert!(sheets.get_values("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewrite_to_fewer_rows_leaves_nothing_stale() {
        let sheets = MemorySheets::with_sheets([("s", vec![row(&["h"]), row(&["a"]), row(&["b"]), row(&["c"])])]);
        sheets.rewrite("s", vec![row(&["h"]), row(&["c"])]).await.unwrap();
        assert_eq!(sheets.get_values("s").await.unwrap(), vec![row(&["h"]), row(&["c"])]);
    }

    #[tokio::test]
    async fn failed_rewrite_keeps_previous_content() {
        let before = vec![row(&["h"]), row(&["a"]), row(&["b"])];
        let sheets = MemorySheets::with_sheets([("s", before.clone())]);
        sheets.fail_writes_to("s");
        assert!(sheets.rewrite("s", vec![row(&["h"])]).await.is_err());
        assert_eq!(sheets.get_values("s").await.unwrap(), before);
    }
}
