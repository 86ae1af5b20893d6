//! In-memory repository implementation.
//!
//! Reference implementation of the store contracts: a pair of locked maps
//! plus a `(series_id, date)` uniqueness index. Reads take a shared lock and
//! may run unbounded in parallel; the cursor CAS takes the write lock, which
//! is the per-series serialization point the expansion engine relies on.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::api::{DateWindow, JobId, SeriesId};
use crate::db::repository::{
    CursorAdvance, ErrorContext, FullRepository, JobRepository, RepositoryError, RepositoryResult,
    SeriesRepository,
};
use crate::models::{JobInstance, NewJobInstance, NewSeries, RecurringSeries};

#[derive(Default)]
struct State {
    jobs: BTreeMap<JobId, JobInstance>,
    series: BTreeMap<SeriesId, RecurringSeries>,
    /// Uniqueness index enforcing one instance per `(series_id, date)`.
    by_series_date: HashMap<(SeriesId, NaiveDate), JobId>,
}

/// In-memory implementation of [`FullRepository`].
#[derive(Default)]
pub struct LocalRepository {
    state: RwLock<State>,
    next_job_id: AtomicI64,
    next_series_id: AtomicI64,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_job_id(&self) -> JobId {
        JobId::new(self.next_job_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_series_id(&self) -> SeriesId {
        SeriesId::new(self.next_series_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Number of stored jobs (test/diagnostic helper).
    pub fn job_count(&self) -> usize {
        self.state.read().jobs.len()
    }
}

#[async_trait]
impl JobRepository for LocalRepository {
    async fn insert_job(&self, job: NewJobInstance) -> RepositoryResult<JobInstance> {
        let mut state = self.state.write();

        if let Some(series_id) = job.series_id {
            if state.by_series_date.contains_key(&(series_id, job.date)) {
                return Err(RepositoryError::validation_with_context(
                    "an instance already exists for this series and date",
                    ErrorContext::new("insert_job")
                        .with_entity("job")
                        .with_details(format!("series_id={}, date={}", series_id, job.date)),
                ));
            }
        }

        let id = self.next_job_id();
        let stored = job.with_id(id);
        if let Some(series_id) = stored.series_id {
            state.by_series_date.insert((series_id, stored.date), id);
        }
        state.jobs.insert(id, stored.clone());
        log::debug!("inserted job {} on {}", id, stored.date);
        Ok(stored)
    }

    async fn get_job(&self, id: JobId) -> RepositoryResult<JobInstance> {
        self.state.read().jobs.get(&id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "job not found",
                ErrorContext::new("get_job").with_entity("job").with_entity_id(id),
            )
        })
    }

    async fn update_job(&self, job: &JobInstance) -> RepositoryResult<()> {
        let mut state = self.state.write();

        let previous = state.jobs.get(&job.id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "job not found",
                ErrorContext::new("update_job")
                    .with_entity("job")
                    .with_entity_id(job.id),
            )
        })?;

        // A date edit moves the instance in the uniqueness index; the slot
        // it vacates becomes generatable again, the slot it takes must be free.
        if let Some(series_id) = job.series_id {
            if job.date != previous.date
                && state
                    .by_series_date
                    .get(&(series_id, job.date))
                    .is_some_and(|existing| *existing != job.id)
            {
                return Err(RepositoryError::validation_with_context(
                    "an instance already exists for this series and date",
                    ErrorContext::new("update_job")
                        .with_entity("job")
                        .with_entity_id(job.id),
                ));
            }
        }
        if let Some(series_id) = previous.series_id {
            state.by_series_date.remove(&(series_id, previous.date));
        }
        if let Some(series_id) = job.series_id {
            state.by_series_date.insert((series_id, job.date), job.id);
        }

        state.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn range_query(&self, window: &DateWindow) -> RepositoryResult<Vec<JobInstance>> {
        let state = self.state.read();
        let mut jobs: Vec<JobInstance> = state
            .jobs
            .values()
            .filter(|j| window.contains(j.date))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.sort_key());
        Ok(jobs)
    }

    async fn find_by_series_date(
        &self,
        series_id: SeriesId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<JobInstance>> {
        let state = self.state.read();
        Ok(state
            .by_series_date
            .get(&(series_id, date))
            .and_then(|id| state.jobs.get(id))
            .cloned())
    }
}

#[async_trait]
impl SeriesRepository for LocalRepository {
    async fn insert_series(&self, series: NewSeries) -> RepositoryResult<RecurringSeries> {
        let id = self.next_series_id();
        let stored = series.with_id(id);
        self.state.write().series.insert(id, stored.clone());
        log::debug!("inserted series {} ({})", id, stored.frequency);
        Ok(stored)
    }

    async fn get_series(&self, id: SeriesId) -> RepositoryResult<RecurringSeries> {
        self.state.read().series.get(&id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "series not found",
                ErrorContext::new("get_series")
                    .with_entity("series")
                    .with_entity_id(id),
            )
        })
    }

    async fn list_active(&self, window: &DateWindow) -> RepositoryResult<Vec<RecurringSeries>> {
        Ok(self
            .state
            .read()
            .series
            .values()
            .filter(|s| s.active && s.intersects(window))
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: SeriesId, active: bool) -> RepositoryResult<()> {
        let mut state = self.state.write();
        let series = state.series.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "series not found",
                ErrorContext::new("set_active")
                    .with_entity("series")
                    .with_entity_id(id),
            )
        })?;
        series.active = active;
        Ok(())
    }

    async fn advance_cursor(
        &self,
        id: SeriesId,
        new_cursor: NaiveDate,
    ) -> RepositoryResult<CursorAdvance> {
        let mut state = self.state.write();
        let series = state.series.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "series not found",
                ErrorContext::new("advance_cursor")
                    .with_entity("series")
                    .with_entity_id(id),
            )
        })?;

        match series.last_generated_date {
            Some(current) if current > new_cursor => {
                Ok(CursorAdvance::Conflict {
                    current: Some(current),
                })
            }
            Some(current) if current == new_cursor => {
                // Re-proposing the stored value is a no-op.
                Ok(CursorAdvance::Advanced { cursor: current })
            }
            _ => {
                series.last_generated_date = Some(new_cursor);
                Ok(CursorAdvance::Advanced { cursor: new_cursor })
            }
        }
    }
}

#[async_trait]
impl FullRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientId;
    use crate::models::{Frequency, JobStatus};
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, min, 0).unwrap()
    }

    fn new_job(date: NaiveDate, time: NaiveTime, series_id: Option<SeriesId>) -> NewJobInstance {
        NewJobInstance {
            date,
            time,
            status: JobStatus::Scheduled,
            series_id,
            title: "job".to_string(),
            description: String::new(),
            client_id: ClientId::new(1),
            duration_minutes: 60,
            location: None,
        }
    }

    fn new_series(start: NaiveDate) -> NewSeries {
        NewSeries {
            client_id: ClientId::new(1),
            title: "series".to_string(),
            description: String::new(),
            frequency: Frequency::Weekly,
            start_date: start,
            end_date: None,
            time_of_day: t(8, 0),
            duration_minutes: 60,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = LocalRepository::new();
        let a = repo.insert_job(new_job(d(2024, 1, 1), t(8, 0), None)).await.unwrap();
        let b = repo.insert_job(new_job(d(2024, 1, 2), t(8, 0), None)).await.unwrap();
        assert!(a.id < b.id);
    }

    #[tokio::test]
    async fn test_series_date_uniqueness_enforced() {
        let repo = LocalRepository::new();
        let series = repo.insert_series(new_series(d(2024, 1, 1))).await.unwrap();
        repo.insert_job(new_job(d(2024, 1, 1), t(8, 0), Some(series.id)))
            .await
            .unwrap();
        let dup = repo
            .insert_job(new_job(d(2024, 1, 1), t(9, 0), Some(series.id)))
            .await;
        assert!(matches!(dup, Err(RepositoryError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_standalone_jobs_not_date_constrained() {
        let repo = LocalRepository::new();
        repo.insert_job(new_job(d(2024, 1, 1), t(8, 0), None)).await.unwrap();
        assert!(repo.insert_job(new_job(d(2024, 1, 1), t(9, 0), None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_range_query_sorted_by_date_time() {
        let repo = LocalRepository::new();
        repo.insert_job(new_job(d(2024, 1, 3), t(8, 0), None)).await.unwrap();
        repo.insert_job(new_job(d(2024, 1, 1), t(14, 0), None)).await.unwrap();
        repo.insert_job(new_job(d(2024, 1, 1), t(7, 0), None)).await.unwrap();

        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let jobs = repo.range_query(&window).await.unwrap();
        let keys: Vec<_> = jobs.iter().map(|j| (j.date, j.time)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(jobs.len(), 3);
    }

    #[tokio::test]
    async fn test_cursor_cas_advances_then_conflicts() {
        let repo = LocalRepository::new();
        let series = repo.insert_series(new_series(d(2024, 1, 1))).await.unwrap();

        let first = repo.advance_cursor(series.id, d(2024, 1, 15)).await.unwrap();
        assert_eq!(first, CursorAdvance::Advanced { cursor: d(2024, 1, 15) });

        let behind = repo.advance_cursor(series.id, d(2024, 1, 8)).await.unwrap();
        assert_eq!(
            behind,
            CursorAdvance::Conflict {
                current: Some(d(2024, 1, 15))
            }
        );

        // Equal proposal is a no-op advance, not a conflict.
        let equal = repo.advance_cursor(series.id, d(2024, 1, 15)).await.unwrap();
        assert_eq!(equal, CursorAdvance::Advanced { cursor: d(2024, 1, 15) });
    }

    #[tokio::test]
    async fn test_update_job_moves_uniqueness_index() {
        let repo = LocalRepository::new();
        let series = repo.insert_series(new_series(d(2024, 1, 1))).await.unwrap();
        let mut job = repo
            .insert_job(new_job(d(2024, 1, 1), t(8, 0), Some(series.id)))
            .await
            .unwrap();

        job.date = d(2024, 1, 2);
        repo.update_job(&job).await.unwrap();

        // The vacated date is generatable again, the new one is taken.
        assert!(repo
            .find_by_series_date(series.id, d(2024, 1, 1))
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_series_date(series.id, d(2024, 1, 2))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_list_active_filters_inactive_and_disjoint() {
        let repo = LocalRepository::new();
        let active = repo.insert_series(new_series(d(2024, 1, 1))).await.unwrap();
        let inactive = repo.insert_series(new_series(d(2024, 1, 1))).await.unwrap();
        repo.set_active(inactive.id, false).await.unwrap();
        let mut far = new_series(d(2030, 1, 1));
        far.end_date = Some(d(2030, 12, 31));
        repo.insert_series(far).await.unwrap();

        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let listed = repo.list_active(&window).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);
    }
}
