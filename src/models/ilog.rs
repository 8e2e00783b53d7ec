//! # Change Log Entry

//! A single line of the append-only audit sheet: when it happened and what happened, as free text.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::models::TIMESTAMP_FORMAT;

/// Represents one audit line written to the change-log sheet after a mutating operation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChangeLogEntry {
    /// The local time the change was made
    pub logged_at: NaiveDateTime,
    /// Human-readable description of the change
    pub message: String,
}

impl ChangeLogEntry {
    pub fn new(logged_at: NaiveDateTime, message: impl Into<String>) -> Self {
        Self { logged_at, message: message.into() }
    }

    /// The two cells of the audit row: timestamp, message
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.logged_at.format(TIMESTAMP_FORMAT).to_string(),
            self.message.clone(),
        ]
    }
}
