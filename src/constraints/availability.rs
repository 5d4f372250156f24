//! Weekly and date-specific availability rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::ConstraintView;
use crate::models::window::new_uid;
use crate::models::{DateRule, TimeSlot, ViolationType, WeeklyWindow};

/// Weekly hours the group can never guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailability {
    /// Forbidden weekly ranges.
    #[serde(default)]
    pub rules: Vec<WeeklyWindow>,
    #[serde(default = "new_uid")]
    pub uid: String,
}

impl Unavailability {
    /// Creates the constraint with a fresh uid.
    pub fn new(rules: Vec<WeeklyWindow>) -> Self {
        Self {
            rules,
            uid: new_uid(),
        }
    }

    /// Whether any rule forbids `hour` on weekday `day`.
    pub fn forbids(&self, day: u8, hour: u8) -> bool {
        self.rules.iter().any(|r| r.contains(day, hour))
    }

    pub(super) fn violation(
        &self,
        slot: &TimeSlot,
        view: &ConstraintView<'_>,
    ) -> Option<ViolationType> {
        // A permissive date rule replaces the weekly pattern for that date.
        if view.group.has_date_override(slot.date) {
            return None;
        }
        self.forbids(slot.day_of_week, slot.hour)
            .then_some(ViolationType::Unavailable)
    }
}

/// Weekly hours the group is committed elsewhere.
///
/// Guarding inside a window is discouraged, not forbidden. Committed
/// hours also count as active when the group's runs are scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWindow {
    /// Committed weekly ranges.
    #[serde(default)]
    pub windows: Vec<WeeklyWindow>,
    #[serde(default = "new_uid")]
    pub uid: String,
}

impl ActivityWindow {
    /// Creates the constraint with a fresh uid.
    pub fn new(windows: Vec<WeeklyWindow>) -> Self {
        Self {
            windows,
            uid: new_uid(),
        }
    }

    /// Whether `hour` on weekday `day` is committed.
    pub fn covers(&self, day: u8, hour: u8) -> bool {
        self.windows.iter().any(|w| w.contains(day, hour))
    }

    pub(super) fn score(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> f64 {
        if self.covers(slot.day_of_week, slot.hour) {
            -view.config().activity_window_penalty
        } else {
            0.0
        }
    }
}

/// Per-date exclusions and exclusive windows.
///
/// Resolution for one `(date, hour)`:
/// 1. a matching exclusion forbids,
/// 2. otherwise, if the date has permissive windows, the hour must fall
///    in one of them,
/// 3. otherwise the date imposes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpecific {
    /// Date rules in authoring order.
    #[serde(default)]
    pub constraints: Vec<DateRule>,
    #[serde(default = "new_uid")]
    pub uid: String,
}

impl DateSpecific {
    /// Creates the constraint with a fresh uid.
    pub fn new(constraints: Vec<DateRule>) -> Self {
        Self {
            constraints,
            uid: new_uid(),
        }
    }

    /// Whether a permissive rule exists for `date`.
    pub fn has_positive_for(&self, date: NaiveDate) -> bool {
        self.constraints
            .iter()
            .any(|r| r.is_available && r.applies_to(date))
    }

    /// Whether the rules allow `hour` on `date`.
    pub fn allows(&self, date: NaiveDate, hour: u8) -> bool {
        let mut has_positive = false;
        let mut in_positive = false;
        for rule in self.constraints.iter().filter(|r| r.applies_to(date)) {
            match (rule.is_available, rule.covers_hour(hour)) {
                (false, true) => return false,
                (false, false) => {}
                (true, covered) => {
                    has_positive = true;
                    in_positive |= covered;
                }
            }
        }
        !has_positive || in_positive
    }

    pub(super) fn violation(&self, slot: &TimeSlot) -> Option<ViolationType> {
        (!self.allows(slot.date, slot.hour)).then_some(ViolationType::DateRestricted)
    }
}
