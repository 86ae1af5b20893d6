//! Day-schedule optimizer.
//!
//! Given one worker's job list for a single day plus workday constraints,
//! computes a route ordering (nearest-neighbor heuristic) and a packed
//! time-slot assignment, reporting an efficiency score, feasibility
//! violations, and rule-based recommendations.
//!
//! The optimizer is a single-pass, stateless, idempotent function of its
//! inputs: identical requests produce byte-identical outputs, so callers
//! may cache results keyed by [`request_fingerprint`].

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::{GeographicLocation, JobId};
use crate::models::{JobInstance, Priority, ValidationError};

/// One job to place on the day's route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStop {
    pub id: JobId,
    pub duration_minutes: u32,
    pub location: GeographicLocation,
    pub priority: Priority,
    /// Earliest allowed start; `None` means the workday start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_time: Option<NaiveTime>,
    /// Latest allowed start; `None` means unconstrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_time: Option<NaiveTime>,
}

impl JobStop {
    /// Build a stop from a stored job instance. The instance must carry a
    /// location and a non-zero duration; priority is supplied by the
    /// dispatcher since instances do not persist one.
    pub fn from_instance(job: &JobInstance, priority: Priority) -> Result<Self, ValidationError> {
        let location = job.location.ok_or(ValidationError::MissingLocation(job.id))?;
        if job.duration_minutes == 0 {
            return Err(ValidationError::ZeroDuration(job.id));
        }
        Ok(JobStop {
            id: job.id,
            duration_minutes: job.duration_minutes,
            location,
            priority,
            earliest_time: None,
            latest_time: None,
        })
    }
}

/// Workday constraints for one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayConstraints {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    /// Fixed buffer inserted between consecutive stops.
    pub travel_buffer_minutes: u32,
    /// Average speed used for travel-time estimates.
    #[serde(default = "default_travel_speed_kmh")]
    pub travel_speed_kmh: f64,
}

fn default_travel_speed_kmh() -> f64 {
    40.0
}

/// A day's job list plus constraints; the optimizer's entire input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub jobs: Vec<JobStop>,
    pub constraints: DayConstraints,
}

/// One packed slot of the optimized day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSlot {
    pub job_id: JobId,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Estimated travel from the previous stop; zero for the first stop.
    pub travel_minutes_from_previous: u32,
}

/// Which feasibility bound a placement missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The computed start is later than the job's latest allowed start.
    StartsAfterLatest,
    /// The computed end runs past the end of the workday.
    OverrunsWorkday,
}

/// A job whose computed time falls outside its allowed window or the
/// workday bounds. Informational: the job is still scheduled, never
/// dropped, so a degraded plan remains actionable for a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityViolation {
    pub job_id: JobId,
    pub kind: ViolationKind,
    pub scheduled_start: NaiveTime,
    pub scheduled_end: NaiveTime,
    /// The bound that was missed.
    pub limit: NaiveTime,
}

/// The optimizer's entire output. Never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedSchedule {
    pub slots: Vec<ScheduledSlot>,
    /// `100 * work / (work + travel)`, clamped to `[0, 100]`.
    pub efficiency_score: f64,
    pub violations: Vec<FeasibilityViolation>,
    pub recommendations: Vec<String>,
    pub total_work_minutes: u32,
    pub total_travel_minutes: u32,
}

/// Compute a route ordering and packed slot assignment for one day.
///
/// Inputs are validated up front; the computation itself never fails.
/// Infeasible placements are flagged in `violations`, never dropped.
pub fn optimize_schedule(request: &ScheduleRequest) -> Result<OptimizedSchedule, ValidationError> {
    let constraints = &request.constraints;
    if constraints.work_end <= constraints.work_start {
        return Err(ValidationError::InvalidWorkday {
            work_start: constraints.work_start,
            work_end: constraints.work_end,
        });
    }
    for job in &request.jobs {
        if job.duration_minutes == 0 {
            return Err(ValidationError::ZeroDuration(job.id));
        }
    }

    let ordered = order_route(&request.jobs, constraints);
    let (slots, violations) = pack_slots(&ordered, constraints);

    let total_work_minutes: u32 = ordered.iter().map(|j| j.duration_minutes).sum();
    let total_travel_minutes: u32 = slots.iter().map(|s| s.travel_minutes_from_previous).sum();
    let efficiency_score = score(total_work_minutes, total_travel_minutes);
    let recommendations = build_recommendations(
        &slots,
        &violations,
        total_work_minutes,
        total_travel_minutes,
        constraints,
    );

    Ok(OptimizedSchedule {
        slots,
        efficiency_score,
        violations,
        recommendations,
        total_work_minutes,
        total_travel_minutes,
    })
}

/// Stable cache key: SHA-256 over the request's canonical JSON form.
pub fn request_fingerprint(request: &ScheduleRequest) -> String {
    let payload = serde_json::to_string(request).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Phase 1: nearest-neighbor route ordering.
///
/// Seeds with the job whose earliest allowed start comes first (tie-break:
/// highest priority, then lowest id), then repeatedly takes the unplaced
/// job with the least estimated travel from the last-placed stop
/// (tie-break: priority, earliest start, id). Greedy and deterministic,
/// not globally optimal; daily job counts are tens at most.
fn order_route<'a>(jobs: &'a [JobStop], constraints: &DayConstraints) -> Vec<&'a JobStop> {
    let mut remaining: Vec<&JobStop> = jobs.iter().collect();
    let mut ordered: Vec<&JobStop> = Vec::with_capacity(jobs.len());

    let earliest_of = |job: &JobStop| job.earliest_time.unwrap_or(constraints.work_start);

    while !remaining.is_empty() {
        let pick = match ordered.last() {
            None => remaining
                .iter()
                .enumerate()
                .min_by_key(|(_, job)| {
                    (
                        earliest_of(job),
                        std::cmp::Reverse(job.priority.weight()),
                        job.id,
                    )
                })
                .map(|(idx, _)| idx),
            Some(last) => {
                let last: &JobStop = last;
                remaining
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, job)| {
                        (
                            last.location
                                .travel_minutes_to(&job.location, constraints.travel_speed_kmh),
                            std::cmp::Reverse(job.priority.weight()),
                            earliest_of(job),
                            job.id,
                        )
                    })
                    .map(|(idx, _)| idx)
            }
        };
        match pick {
            Some(idx) => ordered.push(remaining.swap_remove(idx)),
            None => break,
        }
    }

    ordered
}

/// Phase 2: walk the ordered list packing start times.
///
/// `start_i = max(end_{i-1} + buffer, work_start, earliest_i)`. A job that
/// misses its latest start or overruns the workday is flagged but still
/// scheduled at the computed time.
fn pack_slots(
    ordered: &[&JobStop],
    constraints: &DayConstraints,
) -> (Vec<ScheduledSlot>, Vec<FeasibilityViolation>) {
    let work_start = minutes_of(constraints.work_start);
    let work_end = minutes_of(constraints.work_end);

    let mut slots = Vec::with_capacity(ordered.len());
    let mut violations = Vec::new();
    let mut prev_end: Option<u32> = None;
    let mut prev_location: Option<GeographicLocation> = None;

    for job in ordered {
        let travel = prev_location
            .map(|loc| loc.travel_minutes_to(&job.location, constraints.travel_speed_kmh))
            .unwrap_or(0);
        let earliest = job.earliest_time.map_or(work_start, minutes_of);

        let mut start = work_start.max(earliest);
        if let Some(prev) = prev_end {
            start = start.max(prev + constraints.travel_buffer_minutes);
        }
        let end = start + job.duration_minutes;

        if let Some(latest) = job.latest_time {
            let latest_min = minutes_of(latest);
            if start > latest_min {
                violations.push(FeasibilityViolation {
                    job_id: job.id,
                    kind: ViolationKind::StartsAfterLatest,
                    scheduled_start: time_from_minutes(start),
                    scheduled_end: time_from_minutes(end),
                    limit: latest,
                });
            }
        }
        if end > work_end {
            violations.push(FeasibilityViolation {
                job_id: job.id,
                kind: ViolationKind::OverrunsWorkday,
                scheduled_start: time_from_minutes(start),
                scheduled_end: time_from_minutes(end),
                limit: constraints.work_end,
            });
        }

        slots.push(ScheduledSlot {
            job_id: job.id,
            start: time_from_minutes(start),
            end: time_from_minutes(end),
            travel_minutes_from_previous: travel,
        });
        prev_end = Some(end);
        prev_location = Some(job.location);
    }

    (slots, violations)
}

fn score(work: u32, travel: u32) -> f64 {
    let total = work + travel;
    if total == 0 {
        return 100.0;
    }
    (100.0 * f64::from(work) / f64::from(total)).clamp(0.0, 100.0)
}

/// Deterministic rule evaluation over the computed metrics. Fixed templated
/// strings only, so output is reproducible and testable.
fn build_recommendations(
    slots: &[ScheduledSlot],
    violations: &[FeasibilityViolation],
    work: u32,
    travel: u32,
    constraints: &DayConstraints,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if work > 0 && travel * 4 > work {
        recommendations.push(format!(
            "Total travel time ({} min) exceeds 25% of working time; consider clustering jobs by area.",
            travel
        ));
    }

    if !violations.is_empty() {
        recommendations.push(format!(
            "{} job(s) fall outside their allowed time windows; consider moving them to another day.",
            violations.len()
        ));
    }

    let idle = idle_minutes(slots, constraints);
    if idle >= 60 {
        recommendations.push(format!(
            "The route contains {} min of idle time waiting on job time windows; consider tightening earliest-start constraints.",
            idle
        ));
    }

    let workday = minutes_of(constraints.work_end).saturating_sub(minutes_of(constraints.work_start));
    if !slots.is_empty() && violations.is_empty() && (work + travel) * 2 < workday {
        recommendations.push(
            "Less than half the workday is utilized; there is room for additional jobs.".to_string(),
        );
    }

    recommendations
}

/// Minutes spent waiting beyond the mandatory travel buffer, summed over
/// the whole route (including a late first start forced by an
/// earliest-time constraint).
fn idle_minutes(slots: &[ScheduledSlot], constraints: &DayConstraints) -> u32 {
    let mut idle = 0;
    let mut prev_end: Option<u32> = None;
    for slot in slots {
        let start = minutes_of(slot.start);
        let floor = match prev_end {
            Some(prev) => prev + constraints.travel_buffer_minutes,
            None => minutes_of(constraints.work_start),
        };
        idle += start.saturating_sub(floor);
        prev_end = Some(minutes_of(slot.end));
    }
    idle
}

fn minutes_of(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Clamped to end of day: any packed time past midnight is necessarily an
/// overrun violation already.
fn time_from_minutes(minutes: u32) -> NaiveTime {
    let clamped = minutes.min(23 * 60 + 59);
    NaiveTime::from_hms_opt(clamped / 60, clamped % 60, 0).unwrap_or(NaiveTime::MIN)
}
