//! Choosing how long to wait between polls.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::datetime::{duration, with_duration};
use crate::telemetry::Snapshot;

/// Default interval while the car is idle, about 10 polls per day.
pub const UPDATE_INTERVAL_NORMAL: Duration = duration::seconds(9000);

/// Default interval while the car is charging.
pub const UPDATE_INTERVAL_CHARGING: Duration = duration::minutes(5);

/// Which interval is in effect.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum PollMode {
    /// Slow polling, car not charging.
    Normal,

    /// Fast polling, car charging.
    Charging,
}

impl PollMode {
    /// Mode implied by the last successful snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Option<&Snapshot>) -> Self {
        if snapshot.is_some_and(Snapshot::is_charging) {
            PollMode::Charging
        } else {
            PollMode::Normal
        }
    }
}

/// The two poll intervals.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Interval while idle.
    #[serde(with = "with_duration", default = "default_normal")]
    pub normal: Duration,

    /// Interval while charging.
    #[serde(with = "with_duration", default = "default_charging")]
    pub charging: Duration,
}

const fn default_normal() -> Duration {
    UPDATE_INTERVAL_NORMAL
}

const fn default_charging() -> Duration {
    UPDATE_INTERVAL_CHARGING
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            normal: UPDATE_INTERVAL_NORMAL,
            charging: UPDATE_INTERVAL_CHARGING,
        }
    }
}

/// A schedule that would poll in a tight loop.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ScheduleError {
    /// Interval must be at least a second.
    #[error("{0} interval must be at least one second")]
    TooShort(&'static str),
}

impl Schedule {
    /// Create a schedule, rejecting sub-second intervals.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::TooShort` if either interval is under a second.
    pub fn new(normal: Duration, charging: Duration) -> Result<Self, ScheduleError> {
        let schedule = Self { normal, charging };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check both intervals are usable.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::TooShort` if either interval is under a second.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.normal < Duration::from_secs(1) {
            return Err(ScheduleError::TooShort("normal"));
        }
        if self.charging < Duration::from_secs(1) {
            return Err(ScheduleError::TooShort("charging"));
        }
        Ok(())
    }

    /// The interval for a mode.
    #[must_use]
    pub const fn interval(&self, mode: PollMode) -> Duration {
        match mode {
            PollMode::Normal => self.normal,
            PollMode::Charging => self.charging,
        }
    }

    /// How long to wait after the given snapshot.
    #[must_use]
    pub fn next_interval(&self, snapshot: Option<&Snapshot>) -> Duration {
        self.interval(PollMode::from_snapshot(snapshot))
    }
}
