use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};
use crate::archive::{newest_first, snapshot_sheet_name, ArchiveScope};
use crate::config::ArchiveSettings;
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{ContainerId, ShipmentRecord, ShipmentStatus};
use crate::repositories::{header_row, ChangeLogRepository, Repository, ShipmentRepository};
use crate::services::sheets::{Row, SheetClient};

/// Grid size of a newly created archive sheet
const ARCHIVE_ROWS: u32 = 100;
const ARCHIVE_COLS: u32 = 20;

/// What an `archive` call wrote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveOutcome {
    /// The archive sheet written to
    pub sheet: String,
    /// Records handed in by the caller
    pub archived: usize,
    /// Rows in the archive sheet after the merge
    pub total_rows: usize,
    /// `true` if the sheet was created by this call, `false` if an existing sheet was merged into
    pub created: bool,
}

/// Summary of a daily cutover
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoverReport {
    pub total: usize,
    pub archived: usize,
    pub carried_over: usize,
    /// `None` when there was nothing completed to archive
    pub archive: Option<ArchiveOutcome>,
    pub snapshot: Option<String>,
}

/// Which archived rows a restore may bring back
#[derive(Debug, Clone, Default)]
pub enum RestoreFilter {
    /// Every row whose container number is not active
    #[default]
    All,
    /// Only the listed container numbers, and only if they are not active
    Only(HashSet<ContainerId>),
}

impl RestoreFilter {
    fn admits(&self, id: &ContainerId) -> bool {
        match self {
            RestoreFilter::All => true,
            RestoreFilter::Only(ids) => ids.contains(id),
        }
    }
}

/// Result of a restore
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreReport {
    pub sheet: String,
    pub restored: Vec<ContainerId>,
    /// Archived rows left out because their container number is already active
    pub already_active: usize,
}

/// Contents of an archive sheet, as seen before a restore
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivePreview {
    pub sheet: String,
    pub pending: usize,
    pub completed: usize,
    /// Rows that a restore would bring back
    pub recoverable: Vec<ShipmentRecord>,
}

/// Moves records between the active sheet and the archive sheets
pub struct ArchiveManager {
    /// The sheet client shared with the active store
    client: Arc<dyn SheetClient>,
    /// The active record store
    active: Arc<ShipmentRepository>,
    /// Where audit lines go
    change_log: Arc<ChangeLogRepository>,
    /// Naming and housekeeping options
    settings: ArchiveSettings,
}

impl ArchiveManager {
    /// Creates a new `ArchiveManager`
    ///
    /// # Arguments
    ///
    /// * `client`: The sheet client; archive sheets live in the same spreadsheet as the active sheet
    /// * `active`: The active record store
    /// * `change_log`: The audit trail
    /// * `settings`: The `archive` section of the application settings
    pub fn new(
        client: Arc<dyn SheetClient>,
        active: Arc<ShipmentRepository>,
        change_log: Arc<ChangeLogRepository>,
        settings: ArchiveSettings,
    ) -> Self {
        Self { client, active, change_log, settings }
    }

    pub fn sheet_name(&self, scope: ArchiveScope, date: NaiveDate) -> String {
        scope.sheet_name(&self.settings.backup_prefix, date)
    }

    /// Writes `records` into the archive sheet for `scope` and `date`
    ///
    /// If the sheet already exists, its rows and the new rows are merged, keeping the latest row per container number,
    /// and the sheet is rewritten. Otherwise the sheet is created. Archived rows that no longer decode are carried over untouched.
    ///
    /// # Arguments
    ///
    /// * `records`: The records to archive
    /// * `scope`: Daily or monthly sheet
    /// * `now`: The current local time; picks the sheet and stamps the audit line
    ///
    /// # Returns
    ///
    /// * `Ok(ArchiveOutcome)` describing what was written
    /// * `Err(TrackerError)` with the failure detail; the active store is never touched by this call
    pub async fn archive(&self, records: &[ShipmentRecord], scope: ArchiveScope, now: NaiveDateTime) -> TrackerResult<ArchiveOutcome> {
        let sheet = self.sheet_name(scope, now.date());
        self.archive_into(&sheet, records, now).await
    }

    async fn archive_into(&self, sheet: &str, records: &[ShipmentRecord], now: NaiveDateTime) -> TrackerResult<ArchiveOutcome> {
        let new_rows: Vec<Row> = records.iter().map(ShipmentRecord::to_row).collect();

        let created = !self.client.worksheet_exists(sheet).await?;
        let rows = if created {
            self.client.add_worksheet(sheet, ARCHIVE_ROWS, ARCHIVE_COLS).await?;
            merge_keep_latest(new_rows)
        } else {
            let mut existing = self.client.get_values(sheet).await?;
            if !existing.is_empty() {
                existing.remove(0);
            }
            existing.extend(new_rows);
            merge_keep_latest(existing)
        };

        let total_rows = rows.len();
        self.write_table(sheet, rows).await?;

        let outcome = ArchiveOutcome { sheet: sheet.to_string(), archived: records.len(), total_rows, created };
        let verb = if outcome.created { "created" } else { "merged into" };
        self.change_log
            .record(now, format!("archive: {} records {} '{}' ({} rows)", outcome.archived, verb, outcome.sheet, outcome.total_rows))
            .await;
        Ok(outcome)
    }

    /// Runs the daily cutover: completed records move to today's archive sheet, pending records stay
    ///
    /// The active sheet is only rewritten after the archive write succeeded. When `snapshot_before_cutover` is set,
    /// a full snapshot is taken first and old snapshots are pruned. The snapshot just taken is always kept,
    /// even with `keep_snapshots` set to 0.
    ///
    /// # Returns
    ///
    /// * `Ok(CutoverReport)` with the counts
    /// * `Err(TrackerError)` if the snapshot, the archive or the active rewrite fails
    pub async fn cutover(&self, now: NaiveDateTime) -> TrackerResult<CutoverReport> {
        let snapshot = if self.settings.snapshot_before_cutover {
            let name = self.snapshot(now).await?;
            if let Err(e) = self.prune_snapshots_keeping(self.settings.keep_snapshots, Some(&name)).await {
                warn!("Failed to prune snapshots: {}", e);
            }
            Some(name)
        } else {
            None
        };

        let records = self.active.list_all().await?;
        let total = records.len();
        let (completed, pending): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.is_completed());

        let archive = if completed.is_empty() {
            info!("Cutover: nothing completed to archive");
            None
        } else {
            Some(self.archive(&completed, ArchiveScope::Daily, now).await?)
        };

        let archived_ids: HashSet<String> = completed.iter().map(|r| r.container_id.to_string()).collect();
        let removed = self.active.remove_ids(&archived_ids).await?;
        if removed != completed.len() {
            warn!("Cutover removed {} rows for {} archived records", removed, completed.len());
        }

        let report = CutoverReport {
            total,
            archived: completed.len(),
            carried_over: pending.len(),
            archive,
            snapshot,
        };
        self.change_log
            .record(now, format!(
                "cutover: {} total, {} archived, {} carried over",
                report.total, report.archived, report.carried_over
            ))
            .await;
        Ok(report)
    }

    /// Rolls the daily archive sheets of `month` up into the monthly archive sheet
    ///
    /// Daily sheets are read oldest first, so the monthly sheet keeps the latest row per container number.
    /// The daily sheets are left in place.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ArchiveOutcome))` for the monthly sheet
    /// * `Ok(None)` if the month has no daily archive sheets
    pub async fn consolidate_month(&self, month: NaiveDate, now: NaiveDateTime) -> TrackerResult<Option<ArchiveOutcome>> {
        let monthly = self.sheet_name(ArchiveScope::Monthly, month);
        let day_prefix = format!("{}-", monthly);
        let titles = self.client.worksheet_titles().await?;
        let mut daily = newest_first(&titles, &day_prefix);
        if daily.is_empty() {
            info!("No daily archives for '{}'", monthly);
            return Ok(None);
        }
        daily.reverse();

        let mut records = Vec::new();
        for sheet in &daily {
            records.extend(self.archived_records(sheet).await?);
        }
        let outcome = self.archive_into(&monthly, &records, now).await?;
        Ok(Some(outcome))
    }

    /// Copies every row of the active sheet, header included, into a new snapshot sheet
    ///
    /// # Returns
    ///
    /// * `Ok(String)`: The name of the snapshot sheet
    /// * `Err(TrackerError)` if the active sheet cannot be read or the snapshot cannot be written
    pub async fn snapshot(&self, now: NaiveDateTime) -> TrackerResult<String> {
        let name = snapshot_sheet_name(&self.settings.snapshot_prefix, now);
        let mut rows = self.client.get_values(self.active.sheet()).await?;
        if rows.is_empty() {
            rows.push(header_row());
        }
        let grid_rows = u32::try_from(rows.len()).unwrap_or(u32::MAX).max(ARCHIVE_ROWS);
        self.client.add_worksheet(&name, grid_rows, ARCHIVE_COLS).await?;
        self.client.update_rows(&name, 1, rows).await?;
        info!("Snapshot written to '{}'", name);
        Ok(name)
    }

    /// Deletes all but the newest `keep` snapshot sheets
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)`: The deleted sheet names
    pub async fn prune_snapshots(&self, keep: usize) -> TrackerResult<Vec<String>> {
        self.prune_snapshots_keeping(keep, None).await
    }

    /// `pinned` is never deleted and counts toward `keep`
    async fn prune_snapshots_keeping(&self, keep: usize, pinned: Option<&str>) -> TrackerResult<Vec<String>> {
        let titles = self.client.worksheet_titles().await?;
        let others = keep.saturating_sub(usize::from(pinned.is_some()));
        let stale: Vec<String> = newest_first(&titles, &self.settings.snapshot_prefix)
            .into_iter()
            .filter(|name| Some(name.as_str()) != pinned)
            .skip(others)
            .collect();
        for name in &stale {
            self.client.delete_worksheet(name).await?;
            info!("Deleted snapshot '{}'", name);
        }
        Ok(stale)
    }

    /// Lists archive sheets, newest first. Snapshots are not archives and are not listed.
    pub async fn list_backups(&self) -> TrackerResult<Vec<String>> {
        let titles = self.client.worksheet_titles().await?;
        Ok(newest_first(&titles, &self.settings.backup_prefix))
    }

    /// Counts an archive sheet's rows by status and lists the rows a restore would bring back
    pub async fn preview(&self, sheet: &str) -> TrackerResult<ArchivePreview> {
        let archived = self.archived_records(sheet).await?;
        let active: HashSet<String> = self.active.container_ids().await?.into_iter().collect();

        let pending = archived.iter().filter(|r| r.status() == ShipmentStatus::Pending).count();
        let completed = archived.len() - pending;
        let mut seen = HashSet::new();
        let recoverable = archived.into_iter()
            .filter(|r| !active.contains(r.container_id.as_str()))
            .filter(|r| seen.insert(r.container_id.clone()))
            .collect();

        Ok(ArchivePreview { sheet: sheet.to_string(), pending, completed, recoverable })
    }

    /// Re-inserts archived records whose container number is not active
    ///
    /// Records keep the status and timestamps they were archived with. A container number that appears
    /// more than once in the archive is restored once.
    ///
    /// # Arguments
    ///
    /// * `sheet`: The archive sheet to restore from
    /// * `filter`: All recoverable rows, or only selected container numbers
    /// * `now`: The current local time, for the audit line
    ///
    /// # Returns
    ///
    /// * `Ok(RestoreReport)` listing the restored container numbers
    /// * `Err(TrackerError::SheetNotFound)` if the archive sheet does not exist
    /// * `Err(TrackerError)` if a write fails; rows restored before the failure stay restored
    pub async fn restore(&self, sheet: &str, filter: &RestoreFilter, now: NaiveDateTime) -> TrackerResult<RestoreReport> {
        let archived = self.archived_records(sheet).await?;
        let mut active: HashSet<String> = self.active.container_ids().await?.into_iter().collect();

        let mut restored = Vec::new();
        let mut already_active = 0;
        for record in archived {
            if !filter.admits(&record.container_id) {
                continue;
            }
            if !active.insert(record.container_id.to_string()) {
                already_active += 1;
                continue;
            }
            match self.active.append(&record).await {
                Ok(()) => restored.push(record.container_id.clone()),
                // registered by someone else since the read above
                Err(TrackerError::DuplicateKey(_)) => already_active += 1,
                Err(e) => return Err(e),
            }
        }

        self.change_log
            .record(now, format!("restore: {} records from '{}'", restored.len(), sheet))
            .await;
        Ok(RestoreReport { sheet: sheet.to_string(), restored, already_active })
    }

    async fn archived_records(&self, sheet: &str) -> TrackerResult<Vec<ShipmentRecord>> {
        ShipmentRepository::new(Arc::clone(&self.client), sheet).list_all().await
    }

    /// Header plus `rows`, written over the existing content; see `SheetClient::rewrite`
    async fn write_table(&self, sheet: &str, rows: Vec<Row>) -> TrackerResult<()> {
        let mut table = Vec::with_capacity(rows.len() + 1);
        table.push(header_row());
        table.extend(rows);
        self.client.rewrite(sheet, table).await
    }
}

/// Drops blank rows and keeps only the last row per container number, in the order those last rows appear
pub fn merge_keep_latest(rows: Vec<Row>) -> Vec<Row> {
    let key = |row: &Row| row.first().map(|c| c.trim().to_string()).unwrap_or_default();
    let last: HashMap<String, usize> = rows.iter()
        .enumerate()
        .map(|(i, row)| (key(row), i))
        .collect();
    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| {
            let k = key(row);
            !k.is_empty() && last.get(&k) == Some(i)
        })
        .map(|(_, row)| row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn merge_keeps_the_last_occurrence() {
        let merged = merge_keep_latest(vec![
            row(&["AAAA0000001", "old"]),
            row(&["BBBB0000002", "b"]),
            row(&[]),
            row(&["AAAA0000001", "new"]),
        ]);
        assert_eq!(merged, vec![row(&["BBBB0000002", "b"]), row(&["AAAA0000001", "new"])]);
    }

    #[test]
    fn restore_filter_selects() {
        let a = ContainerId::parse("AAAA0000001").unwrap();
        let b = ContainerId::parse("BBBB0000002").unwrap();
        let only = RestoreFilter::Only([a.clone()].into_iter().collect());
        assert!(only.admits(&a));
        assert!(!only.admits(&b));
        assert!(RestoreFilter::All.admits(&b));
    }
}
