//! # Shipment Record

//! This module defines `ShipmentRecord`, the single entity of the tracker, together with the validated `ContainerId` key
//! and the row codec that maps a record to and from the seven text cells of a sheet row.

use std::fmt;
use std::str::FromStr;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use crate::errors::{TrackerError, TrackerResult};
use crate::models::{ContainerSize, Destination, ShipmentStatus};

/// Header row shared by the active sheet and every archive sheet.
pub const SHEET_HEADERS: [&str; 7] = [
    "container_id",
    "destination",
    "size_feet",
    "seal_id",
    "status",
    "registered_at",
    "completed_at",
];

/// Cell format of every timestamp written by the tracker.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `^[A-Z]{4}\d{7}$`, ASCII only
fn is_container_number(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4..].iter().all(u8::is_ascii_digit)
}

/// A validated container number: four capital letters followed by seven digits (e.g. `ABCD1234567`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId(String);

impl ContainerId {
    /// Validates and wraps a container number
    ///
    /// # Returns
    ///
    /// * `Ok(ContainerId)` if the input matches the container number pattern exactly
    /// * `Err(TrackerError::MissingField)` if the input is empty
    /// * `Err(TrackerError::InvalidContainerId)` for anything else
    pub fn parse(input: &str) -> TrackerResult<Self> {
        if input.is_empty() {
            return Err(TrackerError::MissingField("container_id"));
        }
        if is_container_number(input) {
            Ok(ContainerId(input.to_string()))
        } else {
            Err(TrackerError::InvalidContainerId(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContainerId {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContainerId::parse(s)
    }
}

impl TryFrom<String> for ContainerId {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContainerId::parse(&value)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}

/// Input of the registration form, before validation.
#[derive(Debug, Clone, Default)]
pub struct NewShipment {
    pub container_id: String,
    pub destination: Destination,
    pub size_feet: ContainerSize,
    pub seal_id: String,
    /// Overrides the registration time (the form's work date); defaults to now
    pub registered_at: Option<NaiveDateTime>,
}

/// Editable fields of an existing record. The container number itself is never edited.
#[derive(Debug, Clone, Default)]
pub struct ShipmentEdit {
    pub destination: Option<Destination>,
    pub size_feet: Option<ContainerSize>,
    pub seal_id: Option<String>,
    pub status: Option<ShipmentStatus>,
    pub registered_at: Option<NaiveDateTime>,
}

/// One open shipment, as stored in one row of the active sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub container_id: ContainerId,
    pub destination: Destination,
    pub size_feet: ContainerSize,
    /// Kept as text so seal numbers with leading zeros survive
    pub seal_id: String,
    status: ShipmentStatus,
    pub registered_at: NaiveDateTime,
    completed_at: Option<NaiveDateTime>,
}

impl ShipmentRecord {
    /// Validates a registration form and creates a pending record
    ///
    /// # Arguments
    ///
    /// * `form`: The raw registration input
    /// * `now`: The current local time, used when the form carries no registration time
    ///
    /// # Returns
    ///
    /// * `Ok(ShipmentRecord)` with status `Pending` and no completion time
    /// * `Err(TrackerError)` if the container number or seal number is missing, or the container number is malformed
    pub fn register(form: NewShipment, now: NaiveDateTime) -> TrackerResult<Self> {
        if form.container_id.is_empty() {
            return Err(TrackerError::MissingField("container_id"));
        }
        let seal_id = form.seal_id.trim();
        if seal_id.is_empty() {
            return Err(TrackerError::MissingField("seal_id"));
        }
        Ok(Self {
            container_id: ContainerId::parse(&form.container_id)?,
            destination: form.destination,
            size_feet: form.size_feet,
            seal_id: seal_id.to_string(),
            status: ShipmentStatus::Pending,
            registered_at: form.registered_at.unwrap_or(now),
            completed_at: None,
        })
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<NaiveDateTime> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == ShipmentStatus::Completed
    }

    /// `pending -> completed`, stamping the completion time
    pub fn mark_completed(&mut self, now: NaiveDateTime) -> TrackerResult<()> {
        self.transition(ShipmentStatus::Completed, now)
    }

    /// `completed -> pending`, clearing the completion time
    pub fn reopen(&mut self) -> TrackerResult<()> {
        // the timestamp is unused on the way back to pending
        self.transition(ShipmentStatus::Pending, self.registered_at)
    }

    /// Flips the status, returning the new one
    pub fn toggle(&mut self, now: NaiveDateTime) -> ShipmentStatus {
        let target = self.status.toggled();
        self.set_status(target, now);
        target
    }

    /// Moves the record to `target`. Staying in the current status is rejected.
    pub fn transition(&mut self, target: ShipmentStatus, now: NaiveDateTime) -> TrackerResult<()> {
        if self.status == target {
            return Err(TrackerError::InvalidTransition {
                container_id: self.container_id.to_string(),
                from: self.status,
                to: target,
            });
        }
        self.set_status(target, now);
        Ok(())
    }

    fn set_status(&mut self, target: ShipmentStatus, now: NaiveDateTime) {
        self.status = target;
        self.completed_at = match target {
            ShipmentStatus::Completed => Some(now),
            ShipmentStatus::Pending => None,
        };
    }

    /// Applies an edit. A status change in the edit follows the same rules as `transition`,
    /// except that an unchanged status is accepted silently.
    pub fn apply_edit(&mut self, edit: ShipmentEdit, now: NaiveDateTime) -> TrackerResult<()> {
        if let Some(seal_id) = &edit.seal_id {
            if seal_id.trim().is_empty() {
                return Err(TrackerError::MissingField("seal_id"));
            }
        }
        if let Some(destination) = edit.destination {
            self.destination = destination;
        }
        if let Some(size_feet) = edit.size_feet {
            self.size_feet = size_feet;
        }
        if let Some(seal_id) = edit.seal_id {
            self.seal_id = seal_id.trim().to_string();
        }
        if let Some(registered_at) = edit.registered_at {
            self.registered_at = registered_at;
        }
        if let Some(status) = edit.status {
            if status != self.status {
                self.set_status(status, now);
            }
        }
        Ok(())
    }

    /// Encodes the record as the seven cells of a sheet row, in `SHEET_HEADERS` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.container_id.to_string(),
            self.destination.label().to_string(),
            self.size_feet.to_string(),
            self.seal_id.clone(),
            self.status.to_string(),
            self.registered_at.format(TIMESTAMP_FORMAT).to_string(),
            self.completed_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
        ]
    }

    /// Decodes a sheet row
    ///
    /// Missing trailing cells are treated as empty. A pending row never keeps a completion time;
    /// a completed row without one takes its registration time.
    ///
    /// # Arguments
    ///
    /// * `row`: The cell values of one data row
    ///
    /// # Returns
    ///
    /// * `Ok(ShipmentRecord)` if every required cell decodes
    /// * `Err(TrackerError)` naming the first cell that does not
    pub fn from_row(row: &[String]) -> TrackerResult<Self> {
        let cell = |i: usize| row.get(i).map(|c| c.trim()).unwrap_or("");

        let container_id = ContainerId::parse(cell(0))?;
        let destination = Destination::from_str(cell(1))?;
        let size_feet = ContainerSize::from_str(cell(2))?;
        let seal_id = cell(3).to_string();
        let status = ShipmentStatus::from_str(cell(4))?;
        let registered_at = parse_timestamp(cell(5))
            .ok_or_else(|| TrackerError::InvalidField { field: "registered_at", value: cell(5).to_string() })?;
        let completed_at = match cell(6) {
            "" => None,
            raw => Some(parse_timestamp(raw)
                .ok_or_else(|| TrackerError::InvalidField { field: "completed_at", value: raw.to_string() })?),
        };

        let completed_at = match status {
            ShipmentStatus::Pending => None,
            ShipmentStatus::Completed => Some(completed_at.unwrap_or(registered_at)),
        };

        Ok(Self {
            container_id,
            destination,
            size_feet,
            seal_id,
            status,
            registered_at,
            completed_at,
        })
    }
}

/// Parses a timestamp cell. Date-only cells (written by older sheets) read as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
