//! Public API surface for the scheduling core.
//!
//! This file consolidates the identifier newtypes and shared value types,
//! and re-exports the DTO types produced by the service layer. All types
//! derive Serialize/Deserialize for JSON interchange.

pub use crate::services::batch::BatchOutcome;
pub use crate::services::calendar::CalendarEvent;
pub use crate::services::calendar::CalendarNavigator;
pub use crate::services::calendar::CalendarView;
pub use crate::services::expansion::Expansion;
pub use crate::services::expansion::GeneratedInstances;
pub use crate::services::expansion::SeriesWarning;
pub use crate::services::optimizer::DayConstraints;
pub use crate::services::optimizer::FeasibilityViolation;
pub use crate::services::optimizer::JobStop;
pub use crate::services::optimizer::OptimizedSchedule;
pub use crate::services::optimizer::ScheduleRequest;
pub use crate::services::optimizer::ScheduledSlot;
pub use crate::services::optimizer::ViolationKind;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::ValidationError;

/// Recurring-series identifier (database primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SeriesId(pub i64);

/// Job-instance identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub i64);

/// Client identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub i64);

impl SeriesId {
    pub fn new(value: i64) -> Self {
        SeriesId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl JobId {
    pub fn new(value: i64) -> Self {
        JobId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ClientId {
    pub fn new(value: i64) -> Self {
        ClientId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl From<SeriesId> for i64 {
    fn from(id: SeriesId) -> Self {
        id.0
    }
}

/// Inclusive calendar-date range used for both calendar display and
/// instance generation. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting an inverted range up front.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// A single-day window.
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Check if this window overlaps another (both inclusive).
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of days covered, counting both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Job site location (latitude, longitude).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeographicLocation {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeographicLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle (haversine) distance to another location in kilometers.
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }

    /// Estimated door-to-door travel time at a fixed average speed, rounded
    /// to whole minutes.
    pub fn travel_minutes_to(&self, other: &Self, speed_kmh: f64) -> u32 {
        if speed_kmh <= 0.0 {
            return 0;
        }
        (self.distance_km(other) / speed_kmh * 60.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_series_id_new() {
        let id = SeriesId::new(42);
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_job_id_equality() {
        let id1 = JobId::new(100);
        let id2 = JobId::new(100);
        let id3 = JobId::new(101);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_job_id_ordering() {
        assert!(JobId::new(1) < JobId::new(2));
    }

    #[test]
    fn test_client_id_display() {
        assert_eq!(ClientId::new(7).to_string(), "7");
    }

    #[test]
    fn test_ids_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(SeriesId::new(1));
        set.insert(SeriesId::new(2));
        set.insert(SeriesId::new(1)); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        assert!(DateWindow::new(d(2024, 2, 1), d(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_window_contains_endpoints() {
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert!(window.contains(d(2024, 1, 1)));
        assert!(window.contains(d(2024, 1, 31)));
        assert!(!window.contains(d(2024, 2, 1)));
    }

    #[test]
    fn test_window_overlaps() {
        let a = DateWindow::new(d(2024, 1, 1), d(2024, 1, 10)).unwrap();
        let b = DateWindow::new(d(2024, 1, 10), d(2024, 1, 20)).unwrap();
        let c = DateWindow::new(d(2024, 2, 1), d(2024, 2, 10)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_window_days_inclusive() {
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert_eq!(window.days(), 31);
    }

    #[test]
    fn test_single_day_window() {
        let window = DateWindow::single_day(d(2024, 6, 1));
        assert_eq!(window.days(), 1);
        assert!(window.contains(d(2024, 6, 1)));
    }

    #[test]
    fn test_location_validation() {
        assert!(GeographicLocation::new(91.0, 0.0).is_err());
        assert!(GeographicLocation::new(0.0, -181.0).is_err());
        assert!(GeographicLocation::new(-33.86, 151.21).is_ok());
    }

    #[test]
    fn test_distance_zero_to_self() {
        let loc = GeographicLocation::new(-33.86, 151.21).unwrap();
        assert!(loc.distance_km(&loc) < 1e-9);
    }

    #[test]
    fn test_distance_known_pair() {
        // Sydney CBD to Parramatta is roughly 20 km as the crow flies.
        let cbd = GeographicLocation::new(-33.8688, 151.2093).unwrap();
        let parramatta = GeographicLocation::new(-33.8150, 151.0011).unwrap();
        let km = cbd.distance_km(&parramatta);
        assert!((15.0..25.0).contains(&km), "got {} km", km);
    }

    #[test]
    fn test_travel_minutes_symmetric() {
        let a = GeographicLocation::new(-33.8688, 151.2093).unwrap();
        let b = GeographicLocation::new(-33.8150, 151.0011).unwrap();
        assert_eq!(a.travel_minutes_to(&b, 40.0), b.travel_minutes_to(&a, 40.0));
    }
}
