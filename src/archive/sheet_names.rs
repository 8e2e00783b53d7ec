use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How long a stretch of time one archive sheet covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveScope {
    /// `backup_<YYYY-MM-DD>`, written by the daily cutover
    Daily,
    /// `backup_<YYYY-MM>`
    Monthly,
}

impl ArchiveScope {
    /// The archive sheet covering `date`
    pub fn sheet_name(self, prefix: &str, date: NaiveDate) -> String {
        match self {
            ArchiveScope::Daily => format!("{}{}", prefix, date.format("%Y-%m-%d")),
            ArchiveScope::Monthly => format!("{}{}", prefix, date.format("%Y-%m")),
        }
    }
}

/// The snapshot sheet taken at `at`; names sort in time order
pub fn snapshot_sheet_name(prefix: &str, at: NaiveDateTime) -> String {
    format!("{}{}", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// Titles starting with `prefix`, newest first
pub fn newest_first<'a>(titles: impl IntoIterator<Item = &'a String>, prefix: &str) -> Vec<String> {
    let mut matching: Vec<String> = titles.into_iter()
        .filter(|t| t.starts_with(prefix))
        .cloned()
        .collect();
    matching.sort_unstable_by(|a, b| b.cmp(a));
    matching
}
