//! Recurring-job series templates and JSON import parsing.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::{ClientId, DateWindow, SeriesId};
use crate::models::Frequency;

/// A recurring-job template from which dated instances are generated.
///
/// `last_generated_date` is a monotonically advancing cursor marking the
/// latest date through which instances have been materialized. Only the
/// expansion engine advances it; template edits belong to the owning
/// application. Deactivation stops future generation but does not delete
/// existing instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSeries {
    /// Database ID (server-assigned).
    pub id: SeriesId,
    pub client_id: ClientId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Time-of-day inherited by generated instances.
    pub time_of_day: NaiveTime,
    /// Expected on-site duration inherited by generated instances.
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    pub active: bool,
    /// High-water mark of generation; `None` until the first expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated_date: Option<NaiveDate>,
}

impl RecurringSeries {
    /// A series whose end date precedes its start date can never produce an
    /// occurrence. Expansion reports it as a warning instead of failing.
    pub fn is_misconfigured(&self) -> bool {
        matches!(self.end_date, Some(end) if end < self.start_date)
    }

    /// Whether the series' effective range `[start_date, end_date or +inf]`
    /// intersects `window`.
    pub fn intersects(&self, window: &DateWindow) -> bool {
        if self.is_misconfigured() {
            return false;
        }
        let starts_in_time = self.start_date <= window.end;
        let ends_in_time = self.end_date.map_or(true, |end| end >= window.start);
        starts_in_time && ends_in_time
    }
}

/// A series template prior to insertion, without a server-assigned ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSeries {
    pub client_id: ClientId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub time_of_day: NaiveTime,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn default_duration_minutes() -> u32 {
    60
}

impl NewSeries {
    /// Attach a server-assigned ID, producing the stored form. A fresh
    /// series starts with no generation cursor.
    pub fn with_id(self, id: SeriesId) -> RecurringSeries {
        RecurringSeries {
            id,
            client_id: self.client_id,
            title: self.title,
            description: self.description,
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            time_of_day: self.time_of_day,
            duration_minutes: self.duration_minutes,
            active: self.active,
            last_generated_date: None,
        }
    }
}

/// Parse a series template from an external JSON payload.
///
/// The payload uses the wire format of §3: snake_case field names, ISO-8601
/// dates and times, and the closed frequency enumeration. Unknown frequency
/// strings are rejected by deserialization.
pub fn parse_series_json_str(json: &str) -> Result<NewSeries> {
    let series: NewSeries =
        serde_json::from_str(json).context("Failed to deserialize series JSON")?;
    Ok(series)
}
