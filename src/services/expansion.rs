//! Recurring expansion engine.
//!
//! Materializes concrete job instances from a series template over a
//! requested window. Generation is idempotent and resumable: a
//! `(series_id, date)` dedup check protects manually edited instances, and
//! the series cursor only ever advances, so re-running an already-covered
//! window is a no-op.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{DateWindow, SeriesId};
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::db::services::advance_cursor_with_retry;
use crate::models::{JobInstance, JobStatus, NewJobInstance, RecurringSeries};

/// Non-fatal condition reported by expansion.
///
/// A misconfigured series must not abort a batch covering many series; the
/// caller surfaces the warning and the series simply produces nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SeriesWarning {
    /// `end_date` precedes `start_date`; the series can never occur.
    MisconfiguredRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

impl fmt::Display for SeriesWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesWarning::MisconfiguredRange {
                start_date,
                end_date,
            } => write!(
                f,
                "series end date {} precedes start date {}",
                end_date, start_date
            ),
        }
    }
}

/// Result of the pure expansion step.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Instances to create, in date order. Dates already present in the
    /// dedup set are absent here.
    pub instances: Vec<NewJobInstance>,
    /// Cursor value after this call: the latest candidate date processed,
    /// or the prior cursor when the window contributed nothing new.
    pub new_cursor: Option<NaiveDate>,
    pub warning: Option<SeriesWarning>,
}

/// Result of a store-coupled generation call.
#[derive(Debug, Clone)]
pub struct GeneratedInstances {
    /// Instances actually created this call, in date order.
    pub instances: Vec<JobInstance>,
    /// Cursor value the store settled on.
    pub cursor: Option<NaiveDate>,
    pub warning: Option<SeriesWarning>,
}

/// Expand a series over `window`, skipping dates present in `existing`.
///
/// Pure: no store access, no side effects. `existing` is the set of dates
/// for which an instance of this series already exists; those candidates
/// still count as processed (the cursor covers them) but produce no new
/// instance, which is what preserves manual edits and cancellations across
/// regenerations.
pub fn expand_series(
    series: &RecurringSeries,
    window: &DateWindow,
    existing: &HashSet<NaiveDate>,
) -> Expansion {
    if series.is_misconfigured() {
        // end_date is present by definition of is_misconfigured
        let end_date = series.end_date.unwrap_or(series.start_date);
        return Expansion {
            instances: Vec::new(),
            new_cursor: series.last_generated_date,
            warning: Some(SeriesWarning::MisconfiguredRange {
                start_date: series.start_date,
                end_date,
            }),
        };
    }

    let effective_end = match series.end_date {
        Some(end) => end.min(window.end),
        None => window.end,
    };

    // Candidates strictly after the cursor, inside the window, never before
    // the series anchor.
    let mut floor = window.start.max(series.start_date);
    if let Some(cursor) = series.last_generated_date {
        if let Some(after) = cursor.succ_opt() {
            floor = floor.max(after);
        }
    }

    let mut instances = Vec::new();
    let mut latest: Option<NaiveDate> = None;

    let mut n = first_occurrence_index(series, floor);
    while let Some(date) = series.frequency.occurrence(series.start_date, n) {
        if date > effective_end {
            break;
        }
        n += 1;
        if date < floor {
            continue;
        }
        latest = Some(date);
        if existing.contains(&date) {
            continue;
        }
        instances.push(NewJobInstance {
            date,
            time: series.time_of_day,
            status: JobStatus::Scheduled,
            series_id: Some(series.id),
            title: series.title.clone(),
            description: series.description.clone(),
            client_id: series.client_id,
            duration_minutes: series.duration_minutes,
            location: None,
        });
    }

    let new_cursor = match (series.last_generated_date, latest) {
        (Some(cursor), Some(latest)) => Some(cursor.max(latest)),
        (cursor, latest) => latest.or(cursor),
    };

    Expansion {
        instances,
        new_cursor,
        warning: None,
    }
}

/// Index of the first anchored occurrence at or after `floor`.
///
/// Fixed-step frequencies jump straight to it; monthly occurrences are
/// calendar-dependent, so the caller's loop starts at the anchor and skips.
fn first_occurrence_index(series: &RecurringSeries, floor: NaiveDate) -> u32 {
    let Some(step) = series.frequency.step_days() else {
        return 0;
    };
    let delta = (floor - series.start_date).num_days();
    if delta <= 0 {
        return 0;
    }
    let step = step as i64;
    ((delta + step - 1) / step).min(i64::from(u32::MAX)) as u32
}

/// Expand a stored series over `window` and persist the result.
///
/// Loads the series, builds the dedup set from a range query, creates the
/// missing instances, and advances the cursor through the CAS contract.
/// Concurrent calls for the same series serialize on that contract; calls
/// for different series are fully independent.
pub async fn generate_instances(
    repo: &dyn FullRepository,
    series_id: SeriesId,
    window: &DateWindow,
) -> RepositoryResult<GeneratedInstances> {
    let series = repo.get_series(series_id).await?;

    let existing: HashSet<NaiveDate> = repo
        .range_query(window)
        .await?
        .into_iter()
        .filter(|job| job.series_id == Some(series_id))
        .map(|job| job.date)
        .collect();

    let expansion = expand_series(&series, window, &existing);
    if let Some(warning) = expansion.warning {
        log::warn!("series {}: {}", series_id, warning);
    }

    let mut created = Vec::with_capacity(expansion.instances.len());
    for instance in expansion.instances {
        match repo.insert_job(instance).await {
            Ok(job) => created.push(job),
            Err(RepositoryError::Validation { .. }) => {
                // Lost a creation race to a concurrent generation; the
                // winner's instance stands and the cursor still advances.
                log::debug!("series {}: concurrent insert won, skipping", series_id);
            }
            Err(e) => return Err(e),
        }
    }

    let mut cursor = series.last_generated_date;
    if let Some(target) = expansion.new_cursor {
        if Some(target) != cursor {
            cursor = Some(advance_cursor_with_retry(repo, series_id, target).await?);
        }
    }

    log::info!(
        "series {}: {} new instances for {}",
        series_id,
        created.len(),
        window
    );

    Ok(GeneratedInstances {
        instances: created,
        cursor,
        warning: expansion.warning,
    })
}
