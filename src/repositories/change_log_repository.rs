use std::sync::Arc;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{info, warn};
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{parse_timestamp, ChangeLogEntry};
use crate::repositories::repository_trait::Repository;
use crate::services::sheets::SheetClient;

const LOG_HEADERS: [&str; 2] = ["timestamp", "message"];

/// A repository for the append-only change-log worksheet
pub struct ChangeLogRepository {
    /// The sheet client used to append audit lines
    client: Arc<dyn SheetClient>,
    /// The title of the change-log worksheet
    sheet: String,
}

impl ChangeLogRepository {
    /// Creates a new `ChangeLogRepository`.
    ///
    /// # Arguments
    /// * `client`: The `SheetClient` to use for sheet operations.
    /// * `sheet`: The title of the change-log worksheet.
    pub fn new(client: Arc<dyn SheetClient>, sheet: impl Into<String>) -> Self {
        Self { client, sheet: sheet.into() }
    }

    /// Writes an audit line, logging instead of failing when the sheet cannot be written
    ///
    /// An audit failure never undoes or fails the change it describes.
    pub async fn record(&self, logged_at: NaiveDateTime, message: impl Into<String>) {
        let entry = ChangeLogEntry::new(logged_at, message);
        info!("Change: {}", entry.message);
        if let Err(e) = self.append(&entry).await {
            warn!("Failed to write change log entry {:?}: {}", entry.message, e);
        }
    }

    async fn create_sheet(&self) -> TrackerResult<()> {
        match self.client.add_worksheet(&self.sheet, 1000, 2).await {
            Ok(()) | Err(TrackerError::SheetExists(_)) => {}
            Err(e) => return Err(e),
        }
        let header = LOG_HEADERS.iter().map(|h| h.to_string()).collect();
        self.client.update_rows(&self.sheet, 1, vec![header]).await
    }
}

#[async_trait]
impl Repository<ChangeLogEntry> for ChangeLogRepository {
    /// Reads the audit trail, oldest first. Lines with an unreadable timestamp are skipped.
    async fn list_all(&self) -> TrackerResult<Vec<ChangeLogEntry>> {
        let rows = match self.client.get_values(&self.sheet).await {
            Ok(rows) => rows,
            Err(TrackerError::SheetNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(rows.into_iter()
            .skip(1)
            .filter_map(|row| {
                let logged_at = parse_timestamp(row.first()?)?;
                let message = row.get(1).cloned().unwrap_or_default();
                Some(ChangeLogEntry { logged_at, message })
            })
            .collect())
    }

    /// Appends an audit line, creating the worksheet on first use
    async fn append(&self, entry: &ChangeLogEntry) -> TrackerResult<()> {
        match self.client.append_row(&self.sheet, entry.to_row()).await {
            Err(TrackerError::SheetNotFound(_)) => {
                self.create_sheet().await?;
                self.client.append_row(&self.sheet, entry.to_row()).await
            }
            other => other,
        }
    }
}
