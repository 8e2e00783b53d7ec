//! # Site Clock
//!
//! Every timestamp the tracker writes is a naive local time at the site's fixed UTC offset.
//! The `Clock` trait lets the controller and the archive manager take "now" from somewhere other than the system clock.

use chrono::{FixedOffset, NaiveDateTime, Utc};
use parking_lot::Mutex;
use crate::errors::{TrackerError, TrackerResult};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The system clock shifted to a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SiteClock {
    offset: FixedOffset,
}

impl SiteClock {
    /// Creates a clock for the given whole-hour UTC offset
    ///
    /// # Returns
    ///
    /// * `Ok(SiteClock)` for offsets within ±23 hours
    /// * `Err(TrackerError::ConfigError)` otherwise
    pub fn new(offset_hours: i32) -> TrackerResult<Self> {
        let offset = offset_hours.checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| TrackerError::ConfigError(format!("invalid timezone offset: {} hours", offset_hours)))?;
        Ok(Self { offset })
    }
}

impl Clock for SiteClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
