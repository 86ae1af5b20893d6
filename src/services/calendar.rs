//! Calendar window aggregation.
//!
//! Computes the date range for a requested view granularity, merges
//! standalone jobs with expanded recurring instances into one sorted,
//! annotated sequence, and drives view navigation as a small state machine
//! over `{view, anchor}`.

use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::api::{ClientId, DateWindow, JobId, SeriesId};
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::{JobInstance, JobStatus, ValidationError};
use crate::services::expansion::generate_instances;

/// Calendar view granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarView {
    Week,
    Month,
    Year,
}

impl CalendarView {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarView::Week => "week",
            CalendarView::Month => "month",
            CalendarView::Year => "year",
        }
    }
}

impl std::fmt::Display for CalendarView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CalendarView {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(CalendarView::Week),
            "month" => Ok(CalendarView::Month),
            "year" => Ok(CalendarView::Year),
            other => Err(ValidationError::UnknownView(other.to_string())),
        }
    }
}

/// One entry of a merged calendar window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub job_id: JobId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title: String,
    pub status: JobStatus,
    pub client_id: ClientId,
    pub duration_minutes: u32,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_series_id: Option<SeriesId>,
}

impl From<JobInstance> for CalendarEvent {
    fn from(job: JobInstance) -> Self {
        CalendarEvent {
            job_id: job.id,
            date: job.date,
            time: job.time,
            title: job.title,
            status: job.status,
            client_id: job.client_id,
            duration_minutes: job.duration_minutes,
            is_recurring: job.series_id.is_some(),
            recurring_series_id: job.series_id,
        }
    }
}

/// Compute the date range a view granularity covers around an anchor.
///
/// - week: Sunday through Saturday of the anchor's week
/// - month: first day of the previous month through last day of the next
///   month, so adjacent-month context survives navigation without
///   re-querying on every step
/// - year: Jan 1 through Dec 31 of the anchor's year
pub fn compute_window(view: CalendarView, anchor: NaiveDate) -> DateWindow {
    match view {
        CalendarView::Week => {
            let back = u64::from(anchor.weekday().num_days_from_sunday());
            let start = anchor.checked_sub_days(Days::new(back)).unwrap_or(anchor);
            let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
            DateWindow { start, end }
        }
        CalendarView::Month => {
            let first = anchor.with_day(1).unwrap_or(anchor);
            let start = first.checked_sub_months(Months::new(1)).unwrap_or(first);
            let end = first
                .checked_add_months(Months::new(2))
                .and_then(|d| d.pred_opt())
                .unwrap_or(first);
            DateWindow { start, end }
        }
        CalendarView::Year => {
            let start = NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap_or(anchor);
            let end = NaiveDate::from_ymd_opt(anchor.year(), 12, 31).unwrap_or(anchor);
            DateWindow { start, end }
        }
    }
}

/// Fetch the merged calendar window for a view around an anchor.
///
/// Expands every active series intersecting the window (independent series
/// concurrently), then range-queries the store once so standalone jobs,
/// previously materialized instances, and this call's new instances come
/// back as a single `(date, time)`-sorted sequence.
pub async fn fetch_window(
    repo: &dyn FullRepository,
    view: CalendarView,
    anchor: NaiveDate,
) -> RepositoryResult<Vec<CalendarEvent>> {
    let window = compute_window(view, anchor);

    let series_list = repo.list_active(&window).await?;
    let generations = join_all(
        series_list
            .iter()
            .map(|series| generate_instances(repo, series.id, &window)),
    )
    .await;
    for result in generations {
        result?;
    }

    let jobs = repo.range_query(&window).await?;
    Ok(jobs.into_iter().map(CalendarEvent::from).collect())
}

/// Blocking variant of [`fetch_window`] for synchronous callers (form
/// handlers and CRUD screens in the surrounding application).
pub fn fetch_window_blocking(
    repo: &dyn FullRepository,
    view: CalendarView,
    anchor: NaiveDate,
) -> RepositoryResult<Vec<CalendarEvent>> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        RepositoryError::internal(format!("Failed to create async runtime: {}", e))
    })?;
    runtime.block_on(fetch_window(repo, view, anchor))
}

/// Pure post-processing filter: the events of one series, for cross-view
/// highlighting. Never changes what was fetched.
pub fn highlight_series(events: &[CalendarEvent], target: SeriesId) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|e| e.recurring_series_id == Some(target))
        .cloned()
        .collect()
}

/// Navigation state machine over `{view, anchor}`.
///
/// `next`/`prev` shift the anchor by one unit of the current view.
/// Switching the view keeps the anchor; a drill-down (selecting a month
/// cell while in year view) sets both atomically as one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarNavigator {
    view: CalendarView,
    anchor: NaiveDate,
}

impl CalendarNavigator {
    pub fn new(view: CalendarView, anchor: NaiveDate) -> Self {
        Self { view, anchor }
    }

    pub fn view(&self) -> CalendarView {
        self.view
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// The window the current state displays.
    pub fn window(&self) -> DateWindow {
        compute_window(self.view, self.anchor)
    }

    pub fn next(&mut self) {
        self.anchor = self.shifted(1);
    }

    pub fn prev(&mut self) {
        self.anchor = self.shifted(-1);
    }

    /// Switch granularity around the unchanged anchor.
    pub fn set_view(&mut self, view: CalendarView) {
        self.view = view;
    }

    /// Drill into a different anchor and granularity as one transition.
    pub fn drill_down(&mut self, view: CalendarView, anchor: NaiveDate) {
        self.view = view;
        self.anchor = anchor;
    }

    fn shifted(&self, direction: i32) -> NaiveDate {
        let months = |count: u32| {
            if direction >= 0 {
                self.anchor.checked_add_months(Months::new(count))
            } else {
                self.anchor.checked_sub_months(Months::new(count))
            }
        };
        match self.view {
            CalendarView::Week => {
                if direction >= 0 {
                    self.anchor.checked_add_days(Days::new(7))
                } else {
                    self.anchor.checked_sub_days(Days::new(7))
                }
            }
            CalendarView::Month => months(1),
            CalendarView::Year => months(12),
        }
        .unwrap_or(self.anchor)
    }
}
