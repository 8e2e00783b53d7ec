/// # Tracker Errors
/// This module defines the `TrackerError` enum, which encapsulates all potential errors that can occur within the container tracker.
/// The variants separate input validation failures (reported inline, nothing is written) from remote sheet failures
/// (surfaced to the user as-is, never retried).


use thiserror::Error;
use std::io;

use crate::models::ShipmentStatus;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// The container number does not match `^[A-Z]{4}\d{7}$`.
    #[error("Invalid container number: {0:?} (expected four capital letters followed by seven digits)")]
    InvalidContainerId(String),

    /// A required input field was left empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field value is not one of the accepted values.
    #[error("Invalid value for {field}: {value:?}")]
    InvalidField {
        field: &'static str,
        value: String,
    },

    /// The container number is already present in the active store.
    #[error("Container already registered: {0}")]
    DuplicateKey(String),

    /// The container number is not present in the active store.
    #[error("Container not found: {0}")]
    RecordNotFound(String),

    /// A status change that the shipment lifecycle does not allow.
    #[error("Invalid status transition for {container_id}: {from} -> {to}")]
    InvalidTransition {
        container_id: String,
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    /// A row read from a sheet could not be decoded into a record.
    #[error("Malformed row {row} in sheet '{sheet}': {reason}")]
    MalformedRow {
        sheet: String,
        row: usize,
        reason: String,
    },

    /// A row position outside the current sheet contents.
    #[error("Row position {position} out of range (sheet has {len} records)")]
    PositionOutOfRange {
        position: usize,
        len: usize,
    },

    /// The requested worksheet does not exist in the spreadsheet.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// The worksheet to be created already exists.
    #[error("Sheet already exists: {0}")]
    SheetExists(String),

    /// The sheet API answered with an error status.
    #[error("Sheet API error ({status}): {message}")]
    SheetApi {
        status: u16,
        message: String,
    },

    /// Transport-level failure talking to the sheet API.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Represents errors arising from misconfigurations or invalid settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Represents errors while writing an export file.
    #[error("Export error: {0}")]
    ExportError(#[from] csv::Error),
}

impl From<config::ConfigError> for TrackerError {
    fn from(err: config::ConfigError) -> Self {
        TrackerError::ConfigError(err.to_string())
    }
}

impl From<url::ParseError> for TrackerError {
    fn from(err: url::ParseError) -> Self {
        TrackerError::ConfigError(format!("invalid URL: {}", err))
    }
}

impl TrackerError {
    /// Whether the error was caused by user input rather than the remote store
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrackerError::InvalidContainerId(_)
                | TrackerError::MissingField(_)
                | TrackerError::InvalidField { .. }
                | TrackerError::DuplicateKey(_)
                | TrackerError::RecordNotFound(_)
                | TrackerError::InvalidTransition { .. }
        )
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
