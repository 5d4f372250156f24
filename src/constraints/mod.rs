//! Constraint engine.
//!
//! A [`Constraint`] is one of a closed set of rule kinds attached to a
//! group. Every kind answers the same questions:
//!
//! | Operation | Meaning |
//! |-----------|---------|
//! | [`check_validity`](Constraint::check_validity) | hard feasibility (never panics, `false` forbids) |
//! | [`calculate_score`](Constraint::calculate_score) | additive soft score for one post |
//! | [`on_assign`](Constraint::on_assign) / [`on_remove`](Constraint::on_remove) | usage-counter deltas |
//! | serde | `{"type": <tag>, ...fields}` |
//!
//! Consecutive and Rest are global: their per-post score is zero and
//! their contribution is computed over a whole timeline by
//! [`sequence::run_score`].
//!
//! # Kinds
//!
//! | Tag | Hard | Soft |
//! |-----|------|------|
//! | `unavailability` | weekday hour ranges forbidden | – |
//! | `activity_window` | – | penalty inside external commitments |
//! | `date_specific` | per-date exclusions / exclusive windows | – |
//! | `staffing_rules` | capacity cap, forced coupling | coupling bonus |
//! | `simultaneous` | both posts same group if disallowed | bonus if allowed |
//! | `consecutive` | – | run-length bonus/penalty |
//! | `rest` | – | gap penalty/bonus |

mod availability;
pub mod sequence;
mod staffing;

pub use availability::{ActivityWindow, DateSpecific, Unavailability};
pub use staffing::StaffingRules;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{ConstraintView, UsageDelta};
use crate::error::RosterError;
use crate::models::{DateRule, StaffingRule, TimeSlot, ViolationType, WeeklyWindow};

/// Whether a group may hold both posts of the same hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simultaneous {
    #[serde(default = "default_allowed")]
    pub allowed: bool,
}

fn default_allowed() -> bool {
    true
}

impl Simultaneous {
    fn violation(&self, view: &ConstraintView<'_>) -> Option<ViolationType> {
        (!self.allowed && view.sibling_is_self()).then_some(ViolationType::SimultaneousForbidden)
    }

    fn score(&self, view: &ConstraintView<'_>) -> f64 {
        if self.allowed && view.sibling_is_self() {
            view.config().simultaneous_bonus
        } else {
            0.0
        }
    }
}

/// A rule attached to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Weekly hours the group can never guard.
    Unavailability(Unavailability),
    /// Weekly hours the group is busy elsewhere.
    ActivityWindow(ActivityWindow),
    /// Rules for specific calendar dates.
    DateSpecific(DateSpecific),
    /// Capacity caps and coupling.
    StaffingRules(StaffingRules),
    /// Double-post permission.
    Simultaneous(Simultaneous),
    /// Run-length scoring.
    Consecutive,
    /// Rest-gap scoring.
    Rest,
}

impl Constraint {
    /// Type tags of the closed registry.
    pub const TYPE_TAGS: [&'static str; 7] = [
        "unavailability",
        "activity_window",
        "date_specific",
        "staffing_rules",
        "simultaneous",
        "consecutive",
        "rest",
    ];

    /// Creates an unavailability constraint.
    pub fn unavailability(rules: Vec<WeeklyWindow>) -> Self {
        Self::Unavailability(Unavailability::new(rules))
    }

    /// Creates an activity-window constraint.
    pub fn activity_window(windows: Vec<WeeklyWindow>) -> Self {
        Self::ActivityWindow(ActivityWindow::new(windows))
    }

    /// Creates a date-specific constraint.
    pub fn date_specific(rules: Vec<DateRule>) -> Self {
        Self::DateSpecific(DateSpecific::new(rules))
    }

    /// Creates a staffing-rules constraint.
    pub fn staffing(rules: Vec<StaffingRule>) -> Self {
        Self::StaffingRules(StaffingRules::new(rules))
    }

    /// Creates a simultaneous-guarding constraint.
    pub fn simultaneous(allowed: bool) -> Self {
        Self::Simultaneous(Simultaneous { allowed })
    }

    /// Registry tag of this kind.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Unavailability(_) => "unavailability",
            Self::ActivityWindow(_) => "activity_window",
            Self::DateSpecific(_) => "date_specific",
            Self::StaffingRules(_) => "staffing_rules",
            Self::Simultaneous(_) => "simultaneous",
            Self::Consecutive => "consecutive",
            Self::Rest => "rest",
        }
    }

    /// Whether the kind can veto an assignment.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            Self::Unavailability(_)
                | Self::DateSpecific(_)
                | Self::StaffingRules(_)
                | Self::Simultaneous(_)
        )
    }

    /// The hard violation assigning `view.group` to `slot` would cause.
    pub fn violation(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> Option<ViolationType> {
        match self {
            Self::Unavailability(c) => c.violation(slot, view),
            Self::DateSpecific(c) => c.violation(slot),
            Self::StaffingRules(c) => c.violation(slot, view),
            Self::Simultaneous(c) => c.violation(view),
            Self::ActivityWindow(_) | Self::Consecutive | Self::Rest => None,
        }
    }

    /// Hard check: `false` forbids the assignment.
    #[inline]
    pub fn check_validity(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> bool {
        self.violation(slot, view).is_none()
    }

    /// Soft score of the assignment (positive = good).
    pub fn calculate_score(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> f64 {
        match self {
            Self::ActivityWindow(c) => c.score(slot, view),
            Self::StaffingRules(c) => c.score(slot, view),
            Self::Simultaneous(c) => c.score(view),
            Self::Unavailability(_) | Self::DateSpecific(_) | Self::Consecutive | Self::Rest => 0.0,
        }
    }

    /// Usage changes caused by assigning the owning group to `slot`.
    pub fn on_assign(&self, slot: &TimeSlot) -> UsageDelta {
        match self {
            Self::StaffingRules(c) => c.usage_delta(slot, 1),
            _ => UsageDelta::new(),
        }
    }

    /// Usage changes caused by removing the owning group from `slot`.
    pub fn on_remove(&self, slot: &TimeSlot) -> UsageDelta {
        match self {
            Self::StaffingRules(c) => c.usage_delta(slot, -1),
            _ => UsageDelta::new(),
        }
    }

    /// Deserializes one constraint entry.
    ///
    /// # Errors
    /// - [`RosterError::UnknownConstraintType`] if the tag is not registered.
    /// - [`RosterError::Json`] if the tag is missing or the fields are malformed.
    pub fn from_value(value: Value) -> Result<Self, RosterError> {
        if let Some(tag) = value.get("type").and_then(Value::as_str) {
            if !Self::TYPE_TAGS.contains(&tag) {
                return Err(RosterError::UnknownConstraintType(tag.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serializes to a `{"type": ...}` object.
    pub fn to_value(&self) -> Result<Value, RosterError> {
        Ok(serde_json::to_value(self)?)
    }
}
