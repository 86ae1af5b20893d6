//! Repository trait definitions: the abstract interface every storage
//! backend implements.
//!
//! The job and series stores are external collaborators; this crate only
//! fixes their contracts. Range queries return instances sorted by
//! `(date, time, id)`, and the series cursor advance is a compare-and-swap
//! so concurrent generations for the same series serialize on the store
//! rather than on in-process locks.

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::{DateWindow, JobId, SeriesId};
use crate::models::{JobInstance, NewJobInstance, NewSeries, RecurringSeries};

/// Outcome of a compare-and-swap cursor advance.
///
/// `Conflict` is a value, not an error: it means another writer already
/// advanced the cursor past the proposed date. Callers re-read and retry,
/// or accept the newer value; instance creation is dedup-checked
/// independently of the cursor, so no data corruption results either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAdvance {
    /// The cursor now stands at `cursor`.
    Advanced { cursor: NaiveDate },
    /// A concurrent update already moved the cursor past the proposed
    /// value; `current` is the value found in the store.
    Conflict { current: Option<NaiveDate> },
}

/// Store of concrete job occurrences (standalone and series-linked).
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a job, assigning its ID. Rejects a second instance for the
    /// same `(series_id, date)` pair with a validation error.
    async fn insert_job(&self, job: NewJobInstance) -> RepositoryResult<JobInstance>;

    async fn get_job(&self, id: JobId) -> RepositoryResult<JobInstance>;

    /// Replace a stored job wholesale (manual edits to date/time/status).
    async fn update_job(&self, job: &JobInstance) -> RepositoryResult<()>;

    /// All jobs with `date` inside `window`, sorted by `(date, time, id)`.
    async fn range_query(&self, window: &DateWindow) -> RepositoryResult<Vec<JobInstance>>;

    /// The instance materialized for `(series_id, date)`, if any.
    async fn find_by_series_date(
        &self,
        series_id: SeriesId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<JobInstance>>;
}

/// Store of recurring-series templates.
#[async_trait]
pub trait SeriesRepository: Send + Sync {
    /// Insert a series template, assigning its ID.
    async fn insert_series(&self, series: NewSeries) -> RepositoryResult<RecurringSeries>;

    async fn get_series(&self, id: SeriesId) -> RepositoryResult<RecurringSeries>;

    /// Active series whose effective range intersects `window`.
    async fn list_active(&self, window: &DateWindow) -> RepositoryResult<Vec<RecurringSeries>>;

    /// Flip the active flag; deactivation stops future generation without
    /// touching existing instances.
    async fn set_active(&self, id: SeriesId, active: bool) -> RepositoryResult<()>;

    /// Compare-and-swap advance of `last_generated_date`. The cursor is
    /// monotone: a proposal at or behind the stored value never rewinds it.
    async fn advance_cursor(
        &self,
        id: SeriesId,
        new_cursor: NaiveDate,
    ) -> RepositoryResult<CursorAdvance>;
}

/// Combined interface required by the service layer.
#[async_trait]
pub trait FullRepository: JobRepository + SeriesRepository {
    /// Cheap liveness probe of the backend.
    async fn health_check(&self) -> RepositoryResult<()>;
}
