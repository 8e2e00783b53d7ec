//! # Archive
//!
//! Completed shipments leave the active sheet through archive sheets: one per day (`backup_<YYYY-MM-DD>`),
//! optionally one per month (`backup_<YYYY-MM>`), plus short-lived full snapshots (`tempbackup_<timestamp>`)
//! taken before a cutover. Archived rows can be restored into the active sheet as long as their container
//! number is not active again.

pub mod sheet_names;
pub mod archive_manager;

pub use sheet_names::*;
pub use archive_manager::*;
