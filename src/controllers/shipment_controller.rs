use std::path::Path;
use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::archive::{ArchiveManager, ArchiveOutcome, ArchivePreview, ArchiveScope, CutoverReport, RestoreFilter, RestoreReport};
use crate::config::Settings;
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{ChangeLogEntry, ContainerId, NewShipment, ShipmentEdit, ShipmentRecord, ShipmentStatus};
use crate::repositories::{ChangeLogRepository, Repository, ShipmentRepository};
use crate::services::export;
use crate::services::{Clock, SheetClient};

/// Grid size of a newly created main sheet
const MAIN_SHEET_ROWS: u32 = 1000;
const MAIN_SHEET_COLS: u32 = 7;

/// Counts of active records by status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

/// A container eligible for a barcode label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarcodeLabel {
    pub container_id: ContainerId,
    /// The text encoded in the barcode
    pub payload: String,
    pub destination: String,
    pub size_feet: u8,
}

/// The central controller for shipment records: validation, status transitions, store writes, archiving and audit lines
///
/// Every write addresses its record by container number, re-resolving the row right before writing.
pub struct ShipmentController {
    /// The application settings
    pub settings: Arc<Settings>,
    /// The sheet client shared by every store
    client: Arc<dyn SheetClient>,
    /// The active record store
    store: Arc<ShipmentRepository>,
    /// The audit trail
    change_log: Arc<ChangeLogRepository>,
    /// Daily cutover, snapshots and restores
    archive: ArchiveManager,
    /// Source of the current local time
    clock: Arc<dyn Clock>,
}

impl ShipmentController {
    /// Creates a new `ShipmentController`
    ///
    /// # Arguments
    ///
    /// * `settings`: The application settings
    /// * `client`: The sheet client every store reads and writes through
    /// * `clock`: The source of "now" for timestamps and archive sheet names
    pub fn new(settings: Arc<Settings>, client: Arc<dyn SheetClient>, clock: Arc<dyn Clock>) -> Self {
        info!("Initializing Shipment Controller on '{}'", settings.sheets.main_sheet);
        let store = Arc::new(ShipmentRepository::new(Arc::clone(&client), settings.sheets.main_sheet.clone()));
        let change_log = Arc::new(ChangeLogRepository::new(Arc::clone(&client), settings.sheets.log_sheet.clone()));
        let archive = ArchiveManager::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&change_log),
            settings.archive.clone(),
        );
        Self { settings, client, store, change_log, archive, clock }
    }

    pub fn store(&self) -> &ShipmentRepository {
        &self.store
    }

    pub fn archive_manager(&self) -> &ArchiveManager {
        &self.archive
    }

    /// Creates the main sheet if it is missing and makes sure it starts with the header row
    pub async fn ensure_ready(&self) -> TrackerResult<()> {
        let sheet = self.store.sheet();
        if !self.client.worksheet_exists(sheet).await? {
            info!("Creating main sheet '{}'", sheet);
            match self.client.add_worksheet(sheet, MAIN_SHEET_ROWS, MAIN_SHEET_COLS).await {
                Ok(()) | Err(TrackerError::SheetExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.store.ensure_header().await
    }

    /// Lists the active records in sheet order
    pub async fn list(&self) -> TrackerResult<Vec<ShipmentRecord>> {
        self.store.list_all().await
    }

    /// Looks up one active record
    pub async fn get(&self, container_id: &str) -> TrackerResult<ShipmentRecord> {
        let id = ContainerId::parse(container_id)?;
        self.store.find(&id).await?
            .map(|(_, record)| record)
            .ok_or_else(|| TrackerError::RecordNotFound(id.to_string()))
    }

    /// Validates a registration form and appends a pending record
    ///
    /// # Returns
    ///
    /// * `Ok(ShipmentRecord)`: The stored record
    /// * `Err(TrackerError)` if the form is invalid or the container number is already active; nothing is written then
    pub async fn register(&self, form: NewShipment) -> TrackerResult<ShipmentRecord> {
        let now = self.clock.now();
        let record = ShipmentRecord::register(form, now)?;
        self.store.append(&record).await?;
        self.change_log.record(now, format!("register: {}", record.container_id)).await;
        Ok(record)
    }

    /// Marks a pending record completed, stamping the completion time
    pub async fn complete(&self, container_id: &str) -> TrackerResult<ShipmentRecord> {
        self.set_status(container_id, ShipmentStatus::Completed).await
    }

    /// Returns a completed record to pending, clearing the completion time
    pub async fn reopen(&self, container_id: &str) -> TrackerResult<ShipmentRecord> {
        self.set_status(container_id, ShipmentStatus::Pending).await
    }

    async fn set_status(&self, container_id: &str, target: ShipmentStatus) -> TrackerResult<ShipmentRecord> {
        let now = self.clock.now();
        let mut record = self.get(container_id).await?;
        let from = record.status();
        record.transition(target, now)?;
        self.store.update_by_id(&record).await?;
        self.change_log
            .record(now, format!("status: {} {} -> {}", record.container_id, from, target))
            .await;
        Ok(record)
    }

    /// Flips the status of a record
    pub async fn toggle(&self, container_id: &str) -> TrackerResult<ShipmentRecord> {
        let now = self.clock.now();
        let mut record = self.get(container_id).await?;
        let from = record.status();
        let to = record.toggle(now);
        self.store.update_by_id(&record).await?;
        self.change_log
            .record(now, format!("status: {} {} -> {}", record.container_id, from, to))
            .await;
        Ok(record)
    }

    /// Applies an edit to a record. A status change in the edit follows the same rules as a toggle.
    pub async fn edit(&self, container_id: &str, edit: ShipmentEdit) -> TrackerResult<ShipmentRecord> {
        let now = self.clock.now();
        let mut record = self.get(container_id).await?;
        record.apply_edit(edit, now)?;
        self.store.update_by_id(&record).await?;
        self.change_log.record(now, format!("edit: {}", record.container_id)).await;
        Ok(record)
    }

    /// Removes a record from the active sheet
    pub async fn delete(&self, container_id: &str) -> TrackerResult<()> {
        let now = self.clock.now();
        let id = ContainerId::parse(container_id)?;
        self.store.delete_by_id(&id).await?;
        self.change_log.record(now, format!("delete: {}", id)).await;
        Ok(())
    }

    pub async fn summary(&self) -> TrackerResult<StatusSummary> {
        let records = self.store.list_all().await?;
        let completed = records.iter().filter(|r| r.is_completed()).count();
        Ok(StatusSummary { total: records.len(), pending: records.len() - completed, completed })
    }

    /// Pending containers, in sheet order, with their barcode payload
    pub async fn barcode_candidates(&self) -> TrackerResult<Vec<BarcodeLabel>> {
        Ok(self.store.list_all().await?
            .into_iter()
            .filter(|r| r.status() == ShipmentStatus::Pending)
            .map(|r| BarcodeLabel {
                payload: r.container_id.to_string(),
                destination: r.destination.label().to_string(),
                size_feet: r.size_feet.feet(),
                container_id: r.container_id,
            })
            .collect())
    }

    /// Runs the daily cutover for today's local date
    pub async fn cutover(&self) -> TrackerResult<CutoverReport> {
        self.archive.cutover(self.clock.now()).await
    }

    /// Archives `records` into today's daily or this month's monthly sheet without touching the active sheet
    pub async fn archive(&self, records: &[ShipmentRecord], scope: ArchiveScope) -> TrackerResult<ArchiveOutcome> {
        self.archive.archive(records, scope, self.clock.now()).await
    }

    /// Rolls up the daily archives of the month containing `month`, or of the current month
    pub async fn archive_month(&self, month: Option<NaiveDate>) -> TrackerResult<Option<ArchiveOutcome>> {
        let now = self.clock.now();
        self.archive.consolidate_month(month.unwrap_or_else(|| now.date()), now).await
    }

    pub async fn snapshot(&self) -> TrackerResult<String> {
        self.archive.snapshot(self.clock.now()).await
    }

    /// Deletes old snapshots, keeping `keep` or the configured number
    pub async fn prune_snapshots(&self, keep: Option<usize>) -> TrackerResult<Vec<String>> {
        self.archive
            .prune_snapshots(keep.unwrap_or(self.settings.archive.keep_snapshots))
            .await
    }

    pub async fn backups(&self) -> TrackerResult<Vec<String>> {
        self.archive.list_backups().await
    }

    pub async fn preview(&self, sheet: &str) -> TrackerResult<ArchivePreview> {
        self.archive.preview(sheet).await
    }

    /// Restores archived records; an empty selection restores every recoverable record
    pub async fn restore(&self, sheet: &str, selection: &[String]) -> TrackerResult<RestoreReport> {
        let filter = if selection.is_empty() {
            RestoreFilter::All
        } else {
            RestoreFilter::Only(selection.iter()
                .map(|id| ContainerId::parse(id))
                .collect::<TrackerResult<_>>()?)
        };
        self.archive.restore(sheet, &filter, self.clock.now()).await
    }

    /// The newest `limit` change-log lines, oldest first
    pub async fn history(&self, limit: usize) -> TrackerResult<Vec<ChangeLogEntry>> {
        let mut entries = self.change_log.list_all().await?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    /// Writes the active records to a CSV file
    pub async fn export(&self, path: &Path) -> TrackerResult<usize> {
        let records = self.store.list_all().await?;
        let written = export::export_csv(path, &records)?;
        info!("Exported {} records to {}", written, path.display());
        Ok(written)
    }
}
