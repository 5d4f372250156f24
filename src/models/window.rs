//! Hour-range rules attached to groups.
//!
//! All hour ranges are half-open `[start_hour, end_hour)` on a 24-hour
//! clock, so `end_hour = 24` covers the last hour of the day.
//! Weekdays follow the Sunday-first convention: `0 = Sunday .. 6 = Saturday`.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Generates a fresh rule identity.
pub(crate) fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A weekly recurring hour range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyWindow {
    /// Day of week (0 = Sunday).
    pub day: u8,
    /// First covered hour (inclusive).
    pub start_hour: u8,
    /// End hour (exclusive, may be 24).
    pub end_hour: u8,
}

impl WeeklyWindow {
    /// Creates a weekly window.
    pub fn new(day: u8, start_hour: u8, end_hour: u8) -> Self {
        Self {
            day,
            start_hour,
            end_hour,
        }
    }

    /// Whether the window covers `hour` on weekday `day`.
    #[inline]
    pub fn contains(&self, day: u8, hour: u8) -> bool {
        self.day == day && self.start_hour <= hour && hour < self.end_hour
    }
}

/// A rule for specific calendar dates.
///
/// An unavailable rule forbids its hours on its dates. An available rule
/// makes its hours the only permitted hours on its dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRule {
    /// Dates the rule applies to.
    pub dates: Vec<NaiveDate>,
    /// First covered hour (inclusive).
    pub start_hour: u8,
    /// End hour (exclusive).
    pub end_hour: u8,
    /// `true` = permissive window, `false` = exclusion.
    pub is_available: bool,
}

impl DateRule {
    /// Creates an exclusion for the given dates.
    pub fn unavailable(dates: Vec<NaiveDate>, start_hour: u8, end_hour: u8) -> Self {
        Self {
            dates,
            start_hour,
            end_hour,
            is_available: false,
        }
    }

    /// Creates a permissive window for the given dates.
    pub fn available(dates: Vec<NaiveDate>, start_hour: u8, end_hour: u8) -> Self {
        Self {
            dates,
            start_hour,
            end_hour,
            is_available: true,
        }
    }

    /// Whether the rule applies to `date`.
    #[inline]
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// Whether `hour` falls inside the rule's hours.
    #[inline]
    pub fn covers_hour(&self, hour: u8) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

/// A weekly staffing rule: capacity cap and/or forced coupling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRule {
    /// Day of week (0 = Sunday).
    pub day: u8,
    /// First covered hour (inclusive).
    pub start_hour: u8,
    /// End hour (exclusive).
    pub end_hour: u8,
    /// Maximum posts the group may hold under this rule.
    #[serde(default)]
    pub max_capacity: Option<u32>,
    /// Both posts of a covered hour must go to the same group.
    #[serde(default)]
    pub force_coupling: bool,
    /// Identity of the rule's usage counter.
    #[serde(default = "new_uid")]
    pub uid: String,
}

impl StaffingRule {
    /// Creates a rule with neither cap nor coupling.
    pub fn new(day: u8, start_hour: u8, end_hour: u8) -> Self {
        Self {
            day,
            start_hour,
            end_hour,
            max_capacity: None,
            force_coupling: false,
            uid: new_uid(),
        }
    }

    /// Sets the capacity cap.
    pub fn with_capacity(mut self, max: u32) -> Self {
        self.max_capacity = Some(max);
        self
    }

    /// Requires both posts to be held by the same group.
    pub fn with_coupling(mut self) -> Self {
        self.force_coupling = true;
        self
    }

    /// Whether the rule covers `hour` on weekday `day`.
    #[inline]
    pub fn contains(&self, day: u8, hour: u8) -> bool {
        self.day == day && self.start_hour <= hour && hour < self.end_hour
    }
}

/// A time-ranged override of a group's staffing size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingException {
    /// Start date.
    pub start_date: NaiveDate,
    /// Start hour on `start_date` (inclusive).
    pub start_hour: u8,
    /// End date.
    pub end_date: NaiveDate,
    /// End hour on `end_date` (exclusive).
    pub end_hour: u8,
    /// Staffing size in effect during the range.
    pub new_staffing_size: u32,
}

impl StaffingException {
    /// Creates an exception.
    pub fn new(
        start_date: NaiveDate,
        start_hour: u8,
        end_date: NaiveDate,
        end_hour: u8,
        new_staffing_size: u32,
    ) -> Self {
        Self {
            start_date,
            start_hour,
            end_date,
            end_hour,
            new_staffing_size,
        }
    }

    /// Start instant of the range.
    pub fn start(&self) -> NaiveDateTime {
        at_hour(self.start_date, self.start_hour)
    }

    /// End instant of the range (exclusive).
    pub fn end(&self) -> NaiveDateTime {
        at_hour(self.end_date, self.end_hour)
    }

    /// Whether the hour starting at `date hour:00` lies in the range.
    pub fn contains(&self, date: NaiveDate, hour: u8) -> bool {
        let t = at_hour(date, hour);
        self.start() <= t && t < self.end()
    }
}

/// `date` at `hour:00`; hour 24 rolls over to the next midnight.
pub(crate) fn at_hour(date: NaiveDate, hour: u8) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour))
}
