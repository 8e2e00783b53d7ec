use async_trait::async_trait;
use crate::errors::TrackerResult;

/// The text cells of one sheet row
pub type Row = Vec<String>;

/// Defines the operations the tracker needs from a remote spreadsheet
///
/// Rows are addressed 1-based, the way the sheet itself numbers them: row 1 is the header,
/// data starts at row 2. Implementations drop trailing empty cells and trailing empty rows
/// from `get_values`, matching what the Sheets API returns.
#[async_trait]
pub trait SheetClient: Send + Sync {
    /// Lists the titles of every worksheet, in tab order
    async fn worksheet_titles(&self) -> TrackerResult<Vec<String>>;

    /// Creates an empty worksheet with the given grid size
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the worksheet was created
    /// * `Err(TrackerError::SheetExists)` if a worksheet with that title already exists
    async fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> TrackerResult<()>;

    /// Deletes a worksheet and everything in it
    async fn delete_worksheet(&self, title: &str) -> TrackerResult<()>;

    /// Reads every non-empty row of a worksheet, header included
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Row>)` with the rows in sheet order
    /// * `Err(TrackerError::SheetNotFound)` if the worksheet does not exist
    async fn get_values(&self, sheet: &str) -> TrackerResult<Vec<Row>>;

    /// Appends a row after the last non-empty row
    async fn append_row(&self, sheet: &str, row: Row) -> TrackerResult<()>;

    /// Overwrites consecutive rows starting at `start_row` (1-based)
    async fn update_rows(&self, sheet: &str, start_row: usize, rows: Vec<Row>) -> TrackerResult<()>;

    /// Deletes a single row (1-based), shifting the rows below it up
    async fn delete_row(&self, sheet: &str, row: usize) -> TrackerResult<()>;

    /// Clears every cell from `start_row` (1-based) down, leaving the rows above untouched
    async fn clear_below(&self, sheet: &str, start_row: usize) -> TrackerResult<()>;

    /// Replaces the whole content of a worksheet with `rows`
    ///
    /// The new rows are written over the top first and only then is whatever is left below them cleared.
    /// If the first write fails the sheet is unchanged. If the second fails, stale rows from the old content
    /// remain below the new ones.
    ///
    /// Rows are padded to a common width so short rows blank the old cells beside them.
    async fn rewrite(&self, sheet: &str, mut rows: Vec<Row>) -> TrackerResult<()> {
        let end = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, String::new());
        }
        self.update_rows(sheet, 1, rows).await?;
        self.clear_below(sheet, end + 1).await
    }

    async fn worksheet_exists(&self, title: &str) -> TrackerResult<bool> {
        Ok(self.worksheet_titles().await?.iter().any(|t| t == title))
    }
}
