//! Concrete job occurrences and their closed status/priority enumerations.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::{ClientId, GeographicLocation, JobId, SeriesId};
use crate::models::ValidationError;

/// Lifecycle status of a job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Enquiry,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Enquiry => "enquiry",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enquiry" => Ok(JobStatus::Enquiry),
            "scheduled" => Ok(JobStatus::Scheduled),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Dispatch priority of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Numeric weight for ordering; higher weight means more urgent.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::Urgent => 3,
            Priority::High => 2,
            Priority::Normal => 1,
            Priority::Low => 0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(ValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// A concrete, dated job occurrence.
///
/// Created either directly (standalone) or by the expansion engine
/// (series-linked). Once created, a series-linked instance is independent:
/// manual edits to date/time/status persist even if the series is
/// regenerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInstance {
    /// Database ID (server-assigned).
    pub id: JobId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: JobStatus,
    /// Back-reference to the originating series; `None` for standalone jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<SeriesId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub client_id: ClientId,
    /// Expected on-site duration in minutes.
    pub duration_minutes: u32,
    /// Job site location; standalone jobs may lack geocoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeographicLocation>,
}

impl JobInstance {
    /// Whether this instance was materialized from a recurring series.
    pub fn is_recurring(&self) -> bool {
        self.series_id.is_some()
    }

    /// Ordering key used by every window query: `(date, time, id)`.
    pub fn sort_key(&self) -> (NaiveDate, NaiveTime, i64) {
        (self.date, self.time, self.id.value())
    }
}

/// A job occurrence prior to insertion, without a server-assigned ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobInstance {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<SeriesId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub client_id: ClientId,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeographicLocation>,
}

impl NewJobInstance {
    /// Attach a server-assigned ID, producing the stored form.
    pub fn with_id(self, id: JobId) -> JobInstance {
        JobInstance {
            id,
            date: self.date,
            time: self.time,
            status: self.status,
            series_id: self.series_id,
            title: self.title,
            description: self.description,
            client_id: self.client_id,
            duration_minutes: self.duration_minutes,
            location: self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_job() -> NewJobInstance {
        NewJobInstance {
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            status: JobStatus::Scheduled,
            series_id: None,
            title: "Gutter clean".to_string(),
            description: String::new(),
            client_id: ClientId::new(7),
            duration_minutes: 60,
            location: None,
        }
    }

    #[test]
    fn test_status_parse_round_trip() {
        for s in ["enquiry", "scheduled", "in_progress", "completed", "cancelled"] {
            let status: JobStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
    }

    #[test]
    fn test_status_unknown_rejected() {
        assert!("pending".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_priority_weight_ordering() {
        assert!(Priority::Urgent.weight() > Priority::High.weight());
        assert!(Priority::High.weight() > Priority::Normal.weight());
        assert!(Priority::Normal.weight() > Priority::Low.weight());
    }

    #[test]
    fn test_priority_parse_unknown_rejected() {
        assert!("critical".parse::<Priority>().is_err());
    }

    #[test]
    fn test_with_id_marks_standalone() {
        let job = sample_new_job().with_id(JobId::new(1));
        assert!(!job.is_recurring());
        assert_eq!(job.id.value(), 1);
    }

    #[test]
    fn test_with_id_keeps_series_link() {
        let mut new_job = sample_new_job();
        new_job.series_id = Some(SeriesId::new(3));
        let job = new_job.with_id(JobId::new(2));
        assert!(job.is_recurring());
        assert_eq!(job.series_id, Some(SeriesId::new(3)));
    }

    #[test]
    fn test_sort_key_orders_by_date_then_time() {
        let early = sample_new_job().with_id(JobId::new(1));
        let mut later = sample_new_job();
        later.time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        let later = later.with_id(JobId::new(2));
        assert!(early.sort_key() < later.sort_key());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&JobStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
