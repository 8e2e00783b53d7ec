use std::collections::HashSet;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, warn};
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{ContainerId, ShipmentRecord, SHEET_HEADERS};
use crate::repositories::repository_trait::Repository;
use crate::services::sheets::{Row, SheetClient};

/// Sheet row of the first record; row 1 holds the header
const FIRST_DATA_ROW: usize = 2;

/// A repository of shipment records stored one per row in a worksheet
///
/// Positions are 0-based offsets into the data rows (`row = position + 2`). They are only valid
/// until the next write by anyone, so the key-addressed methods re-resolve the position right before writing.
pub struct ShipmentRepository {
    /// The sheet client used to read and write rows
    client: Arc<dyn SheetClient>,
    /// The worksheet this repository reads and writes
    sheet: String,
}

/// The header row shared by the active sheet and the archive sheets
pub fn header_row() -> Row {
    SHEET_HEADERS.iter().map(|h| h.to_string()).collect()
}

fn key_cell(row: &Row) -> &str {
    row.first().map(|c| c.trim()).unwrap_or("")
}

impl ShipmentRepository {
    /// Creates a new `ShipmentRepository`.
    ///
    /// # Arguments
    /// * `client`: The `SheetClient` to use for sheet operations.
    /// * `sheet`: The title of the worksheet holding the records.
    pub fn new(client: Arc<dyn SheetClient>, sheet: impl Into<String>) -> Self {
        Self { client, sheet: sheet.into() }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Reads the raw data rows (header excluded)
    async fn data_rows(&self) -> TrackerResult<Vec<Row>> {
        let mut rows = self.client.get_values(&self.sheet).await?;
        if rows.is_empty() {
            return Ok(rows);
        }
        rows.remove(0);
        Ok(rows)
    }

    /// Reads every decodable record together with its position
    ///
    /// Blank rows are skipped silently; rows that fail to decode are skipped with a warning.
    pub async fn list_positioned(&self) -> TrackerResult<Vec<(usize, ShipmentRecord)>> {
        let rows = self.data_rows().await?;
        let mut records = Vec::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            match ShipmentRecord::from_row(row) {
                Ok(record) => records.push((position, record)),
                Err(e) => {
                    let err = TrackerError::MalformedRow {
                        sheet: self.sheet.clone(),
                        row: position + FIRST_DATA_ROW,
                        reason: e.to_string(),
                    };
                    warn!("Skipping row: {}", err);
                }
            }
        }
        Ok(records)
    }

    /// Resolves the current position of a container number, reading the key column fresh
    pub async fn position_of(&self, container_id: &ContainerId) -> TrackerResult<Option<usize>> {
        let rows = self.data_rows().await?;
        Ok(rows.iter().position(|row| key_cell(row) == container_id.as_str()))
    }

    /// Looks up a record by container number
    pub async fn find(&self, container_id: &ContainerId) -> TrackerResult<Option<(usize, ShipmentRecord)>> {
        Ok(self.list_positioned().await?
            .into_iter()
            .find(|(_, r)| &r.container_id == container_id))
    }

    /// Overwrites the record at `position`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the row was overwritten
    /// * `Err(TrackerError::PositionOutOfRange)` if there is no data row at `position`
    /// * `Err(TrackerError::DuplicateKey)` if another row already carries the record's container number; nothing is written
    /// * `Err(TrackerError)` if the write fails
    pub async fn update(&self, position: usize, record: &ShipmentRecord) -> TrackerResult<()> {
        let rows = self.data_rows().await?;
        let len = rows.len();
        if position >= len {
            return Err(TrackerError::PositionOutOfRange { position, len });
        }
        let taken_elsewhere = rows.iter()
            .enumerate()
            .any(|(i, row)| i != position && key_cell(row) == record.container_id.as_str());
        if taken_elsewhere {
            return Err(TrackerError::DuplicateKey(record.container_id.to_string()));
        }
        self.write_at(position, record).await
    }

    async fn write_at(&self, position: usize, record: &ShipmentRecord) -> TrackerResult<()> {
        debug!("Updating {} at row {} of '{}'", record.container_id, position + FIRST_DATA_ROW, self.sheet);
        self.client
            .update_rows(&self.sheet, position + FIRST_DATA_ROW, vec![record.to_row()])
            .await
    }

    /// Deletes the record at `position`, shifting the records below it up
    pub async fn delete(&self, position: usize) -> TrackerResult<()> {
        let len = self.data_rows().await?.len();
        if position >= len {
            return Err(TrackerError::PositionOutOfRange { position, len });
        }
        debug!("Deleting row {} of '{}'", position + FIRST_DATA_ROW, self.sheet);
        self.client.delete_row(&self.sheet, position + FIRST_DATA_ROW).await
    }

    /// Overwrites the record with the same container number
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the record was found and overwritten
    /// * `Err(TrackerError::RecordNotFound)` if no row carries that container number
    pub async fn update_by_id(&self, record: &ShipmentRecord) -> TrackerResult<()> {
        let position = self.position_of(&record.container_id).await?
            .ok_or_else(|| TrackerError::RecordNotFound(record.container_id.to_string()))?;
        self.write_at(position, record).await
    }

    /// Deletes the record with the given container number
    pub async fn delete_by_id(&self, container_id: &ContainerId) -> TrackerResult<()> {
        let position = self.position_of(container_id).await?
            .ok_or_else(|| TrackerError::RecordNotFound(container_id.to_string()))?;
        debug!("Deleting {} at row {} of '{}'", container_id, position + FIRST_DATA_ROW, self.sheet);
        self.client.delete_row(&self.sheet, position + FIRST_DATA_ROW).await
    }

    /// Rewrites the worksheet as the header followed by `records`
    ///
    /// See `SheetClient::rewrite` for what a failed write leaves behind.
    pub async fn replace_all(&self, records: &[ShipmentRecord]) -> TrackerResult<()> {
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(header_row());
        rows.extend(records.iter().map(ShipmentRecord::to_row));
        self.client.rewrite(&self.sheet, rows).await
    }

    /// Container numbers of every data row, as written, including rows that no longer decode
    pub async fn container_ids(&self) -> TrackerResult<Vec<String>> {
        Ok(self.data_rows().await?
            .iter()
            .map(|row| key_cell(row).to_string())
            .filter(|key| !key.is_empty())
            .collect())
    }

    /// Removes every row whose container number is in `ids`, keeping all other rows as written
    ///
    /// The kept rows are written over the top of the sheet before the leftover rows below them are cleared,
    /// so a failed write leaves the sheet as it was rather than empty.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)`: The number of rows removed
    /// * `Err(TrackerError)` if the worksheet cannot be read or rewritten
    pub async fn remove_ids(&self, ids: &HashSet<String>) -> TrackerResult<usize> {
        let rows = self.data_rows().await?;
        let before = rows.len();
        let kept: Vec<Row> = rows.into_iter()
            .filter(|row| !ids.contains(key_cell(row)))
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Ok(0);
        }
        let mut table = Vec::with_capacity(kept.len() + 1);
        table.push(header_row());
        table.extend(kept);
        self.client.rewrite(&self.sheet, table).await?;
        Ok(removed)
    }

    /// Writes the header into an empty worksheet; a worksheet with content is left alone
    pub async fn ensure_header(&self) -> TrackerResult<()> {
        if self.client.get_values(&self.sheet).await?.is_empty() {
            self.client.update_rows(&self.sheet, 1, vec![header_row()]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<ShipmentRecord> for ShipmentRepository {
    async fn list_all(&self) -> TrackerResult<Vec<ShipmentRecord>> {
        Ok(self.list_positioned().await?.into_iter().map(|(_, r)| r).collect())
    }

    /// Appends a record, rejecting a container number that is already present
    ///
    /// The duplicate check reads the raw key column, so a row that no longer decodes still blocks its container number.
    ///
    /// # Returns
    /// * `Ok(())` if the record was appended
    /// * `Err(TrackerError::DuplicateKey)` if the container number is already present; nothing is written
    async fn append(&self, record: &ShipmentRecord) -> TrackerResult<()> {
        let rows = self.client.get_values(&self.sheet).await?;
        if rows.iter().skip(1).any(|row| key_cell(row) == record.container_id.as_str()) {
            return Err(TrackerError::DuplicateKey(record.container_id.to_string()));
        }
        if rows.is_empty() {
            self.client.update_rows(&self.sheet, 1, vec![header_row()]).await?;
        }
        debug!("Appending {} to '{}'", record.container_id, self.sheet);
        self.client.append_row(&self.sheet, record.to_row()).await
    }
}
