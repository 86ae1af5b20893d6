//! Contract tests for the in-memory repository: sorted range queries,
//! `(series, date)` uniqueness, cursor CAS behavior under concurrency.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use fsm_rust::api::{ClientId, DateWindow, JobId};
use fsm_rust::db::repositories::LocalRepository;
use fsm_rust::db::repository::{
    CursorAdvance, FullRepository, JobRepository, RepositoryError, SeriesRepository,
};
use fsm_rust::models::{Frequency, JobStatus, NewJobInstance, NewSeries};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn t(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).unwrap()
}

fn job_on(date: NaiveDate, time: NaiveTime) -> NewJobInstance {
    NewJobInstance {
        date,
        time,
        status: JobStatus::Scheduled,
        series_id: None,
        title: "visit".to_string(),
        description: String::new(),
        client_id: ClientId::new(1),
        duration_minutes: 30,
        location: None,
    }
}

fn daily_series(start: NaiveDate) -> NewSeries {
    NewSeries {
        client_id: ClientId::new(1),
        title: "daily check".to_string(),
        description: String::new(),
        frequency: Frequency::Daily,
        start_date: start,
        end_date: None,
        time_of_day: t(8, 0),
        duration_minutes: 20,
        active: true,
    }
}

#[tokio::test]
async fn test_get_job_not_found() {
    let repo = LocalRepository::new();
    let err = repo.get_job(JobId::new(1)).await;
    assert!(matches!(err, Err(RepositoryError::NotFound { .. })));
}

#[tokio::test]
async fn test_range_query_excludes_outside_dates() {
    let repo = LocalRepository::new();
    repo.insert_job(job_on(d(2024, 3, 1), t(9, 0))).await.unwrap();
    repo.insert_job(job_on(d(2024, 3, 31), t(9, 0))).await.unwrap();
    repo.insert_job(job_on(d(2024, 4, 1), t(9, 0))).await.unwrap();

    let march = DateWindow::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
    let jobs = repo.range_query(&march).await.unwrap();
    assert_eq!(jobs.len(), 2);
}

#[tokio::test]
async fn test_range_query_tie_breaks_by_id() {
    let repo = LocalRepository::new();
    let first = repo.insert_job(job_on(d(2024, 3, 1), t(9, 0))).await.unwrap();
    let second = repo.insert_job(job_on(d(2024, 3, 1), t(9, 0))).await.unwrap();

    let window = DateWindow::single_day(d(2024, 3, 1));
    let jobs = repo.range_query(&window).await.unwrap();
    assert_eq!(jobs[0].id, first.id);
    assert_eq!(jobs[1].id, second.id);
}

#[tokio::test]
async fn test_find_by_series_date() {
    let repo = LocalRepository::new();
    let series = repo.insert_series(daily_series(d(2024, 1, 1))).await.unwrap();
    let mut linked = job_on(d(2024, 1, 5), t(8, 0));
    linked.series_id = Some(series.id);
    let stored = repo.insert_job(linked).await.unwrap();

    let found = repo
        .find_by_series_date(series.id, d(2024, 1, 5))
        .await
        .unwrap();
    assert_eq!(found.map(|j| j.id), Some(stored.id));

    let missing = repo
        .find_by_series_date(series.id, d(2024, 1, 6))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_cursor_advance_is_monotone() {
    let repo = LocalRepository::new();
    let series = repo.insert_series(daily_series(d(2024, 1, 1))).await.unwrap();

    assert_eq!(
        repo.advance_cursor(series.id, d(2024, 2, 1)).await.unwrap(),
        CursorAdvance::Advanced { cursor: d(2024, 2, 1) }
    );
    assert_eq!(
        repo.advance_cursor(series.id, d(2024, 1, 1)).await.unwrap(),
        CursorAdvance::Conflict {
            current: Some(d(2024, 2, 1))
        }
    );

    let stored = repo.get_series(series.id).await.unwrap();
    assert_eq!(stored.last_generated_date, Some(d(2024, 2, 1)));
}

#[tokio::test]
async fn test_concurrent_cursor_advances_settle_on_max() {
    let repo = Arc::new(LocalRepository::new());
    let series = repo.insert_series(daily_series(d(2024, 1, 1))).await.unwrap();

    let mut handles = Vec::new();
    for offset in 0..10u32 {
        let repo = Arc::clone(&repo);
        let id = series.id;
        handles.push(tokio::spawn(async move {
            let target = d(2024, 1, 1 + offset);
            repo.advance_cursor(id, target).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = repo.get_series(series.id).await.unwrap();
    assert_eq!(stored.last_generated_date, Some(d(2024, 1, 10)));
}

#[tokio::test]
async fn test_health_check() {
    let repo = LocalRepository::new();
    assert!(repo.health_check().await.is_ok());
}

#[tokio::test]
async fn test_set_active_unknown_series() {
    let repo = LocalRepository::new();
    let err = repo.set_active(fsm_rust::api::SeriesId::new(9), true).await;
    assert!(matches!(err, Err(RepositoryError::NotFound { .. })));
}
