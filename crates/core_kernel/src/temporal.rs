//! Calendar types for effective-dated data
//!
//! Tariffs and insurance policies are effective over whole days. An
//! [`EffectiveRange`] is an inclusive range of calendar dates with an
//! optional end, and [`Timezone`] answers "what is today" in the hospital's
//! own calendar rather than in UTC.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use std::str::FromStr;

/// Timezone wrapper for the hospital's local calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name such as `Africa/Lagos`
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Returns the local calendar date of a UTC instant
    pub fn date_of(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// Returns today's date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Africa::Lagos)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// An inclusive range of calendar dates, open-ended when `to` is `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRange {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl EffectiveRange {
    /// Creates a range, rejecting an end date before the start date
    pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let Some(to) = to {
            if to < from {
                return Err(TemporalError::InvalidPeriod {
                    start: from.to_string(),
                    end: to.to_string(),
                });
            }
        }
        Ok(Self { from, to })
    }

    /// Creates an open-ended range starting on `from`
    pub fn starting(from: NaiveDate) -> Self {
        Self { from, to: None }
    }

    pub fn is_open_ended(&self) -> bool {
        self.to.is_none()
    }

    /// Returns true if `date` falls within the range (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && self.to.map_or(true, |to| date <= to)
    }

    /// Returns true if the two ranges share at least one day
    pub fn overlaps(&self, other: &EffectiveRange) -> bool {
        let self_starts_before_other_ends = other.to.map_or(true, |to| self.from <= to);
        let other_starts_before_self_ends = self.to.map_or(true, |to| other.from <= to);
        self_starts_before_other_ends && other_starts_before_self_ends
    }
}
