//! High-level store functions that work with any repository implementation.
//!
//! These orchestrate repository calls and enforce cross-entity rules
//! (series linkage, cursor retry policy) so callers never talk to the
//! traits directly for routine operations.

use chrono::NaiveDate;

use crate::api::{DateWindow, SeriesId};
use crate::db::repository::{
    CursorAdvance, ErrorContext, FullRepository, RepositoryError, RepositoryResult,
};
use crate::models::{self, JobInstance, NewJobInstance, NewSeries, RecurringSeries};

/// Maximum CAS retries before an advance is reported as an internal error.
const CURSOR_RETRY_LIMIT: u32 = 3;

/// Store a new series template.
pub async fn store_series(
    repo: &dyn FullRepository,
    series: NewSeries,
) -> RepositoryResult<RecurringSeries> {
    let stored = repo.insert_series(series).await?;
    log::info!(
        "stored series {} ({} from {})",
        stored.id,
        stored.frequency,
        stored.start_date
    );
    Ok(stored)
}

/// Store a job, validating its series linkage first: the series must exist
/// and the job's date must lie inside the series' effective range.
pub async fn store_job(
    repo: &dyn FullRepository,
    job: NewJobInstance,
) -> RepositoryResult<JobInstance> {
    if let Some(series_id) = job.series_id {
        let series = repo
            .get_series(series_id)
            .await
            .map_err(|e| e.with_operation("store_job"))?;
        let after_start = job.date >= series.start_date;
        let before_end = series.end_date.map_or(true, |end| job.date <= end);
        if !(after_start && before_end) {
            return Err(RepositoryError::validation_with_context(
                "job date lies outside the series' effective range",
                ErrorContext::new("store_job")
                    .with_entity("job")
                    .with_details(format!("series_id={}, date={}", series_id, job.date)),
            ));
        }
    }
    repo.insert_job(job).await
}

/// Parse and store a series template from an external JSON payload.
pub async fn import_series_json(
    repo: &dyn FullRepository,
    json: &str,
) -> anyhow::Result<RecurringSeries> {
    let series = models::parse_series_json_str(json)?;
    let stored = store_series(repo, series).await?;
    Ok(stored)
}

/// Jobs scheduled on a single day, sorted by `(date, time, id)`.
pub async fn list_day_jobs(
    repo: &dyn FullRepository,
    date: NaiveDate,
) -> RepositoryResult<Vec<JobInstance>> {
    repo.range_query(&DateWindow::single_day(date)).await
}

/// Advance a series cursor through the CAS contract, retrying on conflict.
///
/// A conflict carrying a cursor at or past `target` is accepted as success:
/// another generation already covered the dates, and instance creation is
/// dedup-checked independently of the cursor. Returns the cursor value the
/// store settled on.
pub async fn advance_cursor_with_retry(
    repo: &dyn FullRepository,
    series_id: SeriesId,
    target: NaiveDate,
) -> RepositoryResult<NaiveDate> {
    for attempt in 0..CURSOR_RETRY_LIMIT {
        match repo.advance_cursor(series_id, target).await? {
            CursorAdvance::Advanced { cursor } => return Ok(cursor),
            CursorAdvance::Conflict { current } => match current {
                Some(current) if current >= target => {
                    log::debug!(
                        "cursor for series {} already at {} (target {})",
                        series_id,
                        current,
                        target
                    );
                    return Ok(current);
                }
                _ => {
                    log::warn!(
                        "cursor conflict on series {} (attempt {}), retrying",
                        series_id,
                        attempt + 1
                    );
                }
            },
        }
    }
    Err(RepositoryError::internal(format!(
        "cursor advance for series {} did not settle after {} attempts",
        series_id, CURSOR_RETRY_LIMIT
    )))
}

/// Cheap backend liveness probe.
pub async fn health_check(repo: &dyn FullRepository) -> RepositoryResult<()> {
    repo.health_check().await
}
