//! Recurrence frequency and pure date stepping.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::ValidationError;

/// How often a recurring series produces a job occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
}

impl Frequency {
    /// Wire representation (closed string enumeration).
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::BiWeekly => "bi_weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// Fixed step in days, when the frequency has one. Monthly steps are
    /// calendar-dependent and have no fixed day count.
    pub fn step_days(&self) -> Option<u64> {
        match self {
            Frequency::Daily => Some(1),
            Frequency::Weekly => Some(7),
            Frequency::BiWeekly => Some(14),
            Frequency::Monthly => None,
        }
    }

    /// The next occurrence strictly after `from`.
    ///
    /// Daily/weekly/bi-weekly add a fixed number of days. Monthly moves to
    /// the same day-of-month in the next month, clamped to the last valid
    /// day when the target month is shorter (a 31st yields Feb 28/29).
    ///
    /// Pure date arithmetic; `None` only on calendar overflow.
    pub fn next_occurrence(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self.step_days() {
            Some(step) => from.checked_add_days(Days::new(step)),
            None => from.checked_add_months(Months::new(1)),
        }
    }

    /// The `n`-th occurrence counted from a series anchor (`n = 0` is the
    /// anchor itself).
    ///
    /// For monthly series this preserves the anchor day-of-month and clamps
    /// per target month, so an anchor on the 31st yields Feb 28, Mar 31,
    /// Apr 30 rather than drifting to the 28th after the first short month.
    pub fn occurrence(&self, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self.step_days() {
            Some(step) => anchor.checked_add_days(Days::new(step * u64::from(n))),
            None => anchor.checked_add_months(Months::new(n)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "bi_weekly" => Ok(Frequency::BiWeekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(ValidationError::UnknownFrequency(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Frequency;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_daily_next() {
        assert_eq!(
            Frequency::Daily.next_occurrence(d(2024, 1, 1)),
            Some(d(2024, 1, 2))
        );
    }

    #[test]
    fn test_weekly_next() {
        assert_eq!(
            Frequency::Weekly.next_occurrence(d(2024, 1, 1)),
            Some(d(2024, 1, 8))
        );
    }

    #[test]
    fn test_bi_weekly_next() {
        assert_eq!(
            Frequency::BiWeekly.next_occurrence(d(2024, 1, 1)),
            Some(d(2024, 1, 15))
        );
    }

    #[test]
    fn test_monthly_next_plain() {
        assert_eq!(
            Frequency::Monthly.next_occurrence(d(2024, 3, 15)),
            Some(d(2024, 4, 15))
        );
    }

    #[test]
    fn test_monthly_clamps_to_short_month() {
        assert_eq!(
            Frequency::Monthly.next_occurrence(d(2023, 1, 31)),
            Some(d(2023, 2, 28))
        );
    }

    #[test]
    fn test_monthly_clamps_to_leap_february() {
        assert_eq!(
            Frequency::Monthly.next_occurrence(d(2024, 1, 31)),
            Some(d(2024, 2, 29))
        );
    }

    #[test]
    fn test_occurrence_zero_is_anchor() {
        assert_eq!(
            Frequency::Weekly.occurrence(d(2024, 1, 1), 0),
            Some(d(2024, 1, 1))
        );
    }

    #[test]
    fn test_occurrence_preserves_monthly_anchor_day() {
        let anchor = d(2024, 1, 31);
        assert_eq!(Frequency::Monthly.occurrence(anchor, 1), Some(d(2024, 2, 29)));
        assert_eq!(Frequency::Monthly.occurrence(anchor, 2), Some(d(2024, 3, 31)));
        assert_eq!(Frequency::Monthly.occurrence(anchor, 3), Some(d(2024, 4, 30)));
    }

    #[test]
    fn test_occurrence_fixed_step() {
        assert_eq!(
            Frequency::BiWeekly.occurrence(d(2024, 1, 1), 3),
            Some(d(2024, 2, 12))
        );
    }

    #[test]
    fn test_parse_known_values() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(
            "bi_weekly".parse::<Frequency>().unwrap(),
            Frequency::BiWeekly
        );
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
    }

    #[test]
    fn test_parse_unknown_value_is_rejected() {
        assert!("fortnightly".parse::<Frequency>().is_err());
        assert!("WEEKLY".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Frequency::BiWeekly).unwrap();
        assert_eq!(json, "\"bi_weekly\"");
        let back: Frequency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Frequency::BiWeekly);
    }
}
