//! Domain model types for the scheduling core.
//!
//! The loosely-typed frequency/status/priority strings used by the wire
//! format become closed enums here, exhaustively matched, so invalid states
//! are rejected at the parsing boundary instead of leaking into the engine.

pub mod frequency;
pub mod job;
pub mod series;

pub use frequency::Frequency;
pub use job::{JobInstance, JobStatus, NewJobInstance, Priority};
pub use series::{parse_series_json_str, NewSeries, RecurringSeries};

use chrono::{NaiveDate, NaiveTime};

use crate::api::JobId;

/// Input validation failure. Rejected before any computation runs; a value
/// that parses is guaranteed to be one of the closed variants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unrecognized frequency: {0:?}")]
    UnknownFrequency(String),

    #[error("unrecognized job status: {0:?}")]
    UnknownStatus(String),

    #[error("unrecognized priority: {0:?}")]
    UnknownPriority(String),

    #[error("unrecognized calendar view: {0:?}")]
    UnknownView(String),

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("invalid workday: work_end {work_end} must be after work_start {work_start}")]
    InvalidWorkday {
        work_start: NaiveTime,
        work_end: NaiveTime,
    },

    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("job {0} has no location; route ordering requires one")]
    MissingLocation(JobId),

    #[error("job {0} has zero duration")]
    ZeroDuration(JobId),
}
