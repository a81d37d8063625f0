//! Time helpers used for poll scheduling.

use chrono::{Local, Utc};
use std::time::Duration;

/// A Date and a Time for a given Timezone.
pub type DateTime<Tz> = chrono::DateTime<Tz>;

/// Convert a date time to a local string.
#[must_use]
pub fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    let local = dt.with_timezone(&Local);
    local.format("%Y-%m-%d %H:%M:%S %z").to_string()
}

/// Add a std duration to a UTC time, saturating at the far future.
#[must_use]
pub fn add_duration(dt: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| dt.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

const fn div_rem_u64(a: u64, b: u64) -> (u64, u64) {
    (a / b, a % b)
}

/// Serde serialization deserialization for a duration.
///
/// Durations are written as `HH:MM` or `HH:MM:SS`.
pub mod with_duration {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Deserialize a duration.
    ///
    /// # Errors
    ///
    /// If the duration is invalid.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<super::Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        super::duration::from_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("Invalid duration {s}")))
    }

    /// Serialize a duration.
    ///
    /// # Errors
    ///
    /// If the serializer fails.
    pub fn serialize<S>(duration: &super::Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::duration::to_string(duration))
    }
}

/// Duration constructors and formatting.
pub mod duration {
    use std::time::Duration;
    use thiserror::Error;

    /// Create a new Duration from hours.
    #[must_use]
    pub const fn hours(hours: u64) -> Duration {
        Duration::from_secs(hours * 3600)
    }

    /// Create a new Duration from minutes.
    #[must_use]
    pub const fn minutes(minutes: u64) -> Duration {
        Duration::from_secs(minutes * 60)
    }

    /// Create a new Duration from seconds.
    #[must_use]
    pub const fn seconds(seconds: u64) -> Duration {
        Duration::from_secs(seconds)
    }

    /// Get the hours, minutes and seconds of a duration.
    #[must_use]
    pub const fn hms(duration: &Duration) -> (u64, u64, u64) {
        let secs = duration.as_secs();
        let (minutes, secs) = super::div_rem_u64(secs, 60);
        let (hours, minutes) = super::div_rem_u64(minutes, 60);
        (hours, minutes, secs)
    }

    /// Turn a duration into a string.
    #[must_use]
    pub fn to_string(duration: &Duration) -> String {
        let (hours, minutes, seconds) = hms(duration);
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }

    /// An error that can occur when parsing a `Duration`.
    #[derive(Error, Debug, Eq, PartialEq)]
    pub enum DurationParseError {
        /// Wrong number of `:` separated parts.
        #[error("Expected HH:MM or HH:MM:SS")]
        InvalidFormat,

        /// A part was not a number.
        #[error("Invalid number {0}")]
        InvalidNumber(String),

        /// Minutes or seconds were 60 or more.
        #[error("Value out of range {0}")]
        OutOfRange(u64),
    }

    fn parse_part(part: &str) -> Result<u64, DurationParseError> {
        part.trim()
            .parse::<u64>()
            .map_err(|_| DurationParseError::InvalidNumber(part.to_string()))
    }

    fn in_range(value: u64) -> Result<u64, DurationParseError> {
        if value > 59 {
            Err(DurationParseError::OutOfRange(value))
        } else {
            Ok(value)
        }
    }

    /// Turn a string into a `Duration`
    ///
    /// # Errors
    ///
    /// If the string is not a valid `Duration`.
    pub fn from_str(s: &str) -> Result<Duration, DurationParseError> {
        let parts = s.split(':').collect::<Vec<&str>>();

        let (hours, minutes, seconds) = match parts.as_slice() {
            [hours, minutes] => (parse_part(hours)?, parse_part(minutes)?, 0),
            [hours, minutes, seconds] => (
                parse_part(hours)?,
                parse_part(minutes)?,
                parse_part(seconds)?,
            ),
            _ => return Err(DurationParseError::InvalidFormat),
        };

        let minutes = in_range(minutes)?;
        let seconds = in_range(seconds)?;

        hours
            .checked_mul(3600)
            .and_then(|x| x.checked_add(minutes * 60 + seconds))
            .map(Duration::from_secs)
            .ok_or(DurationParseError::OutOfRange(hours))
    }
}
