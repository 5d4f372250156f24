//! Group (crew) model.
//!
//! A group is a crew that can be assigned to guard posts. Its workload is
//! given by exactly one specifier: a proportional `staffing_size` share
//! or a fixed `weekly_guard_quota`. Every group carries one Simultaneous,
//! one Consecutive and one Rest constraint; they are injected on
//! construction and on load when absent.
//!
//! # Persisted Format
//!
//! ```json
//! {"id": "A", "name": "Alpha", "staffing_size": 4, "weekly_guard_quota": null,
//!  "staffing_exceptions": [], "constraints": [{"type": "rest"}],
//!  "can_guard_simultaneously": true, "color": "#c8e6c9"}
//! ```
//!
//! Older documents without `constraints` but with the flat
//! `hard_unavailability_rules`, `primary_activity_windows`,
//! `date_constraints` and `staffing_rules` arrays are migrated on load.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{StaffingException, TimeSlot, ViolationType};
use crate::constraints::Constraint;
use crate::context::{ConstraintView, UsageDelta};
use crate::error::RosterError;

/// Staffing size assumed when neither an exception nor a base size applies.
pub const DEFAULT_STAFFING_SIZE: u32 = 4;

/// Shortest desired run length.
pub const MIN_RUN_LENGTH: u32 = 2;

/// Workload specifier of a valid group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Share of the remaining posts proportional to this size.
    Proportional(u32),
    /// Fixed number of posts per 7-day period.
    WeeklyQuota(u32),
}

/// A crew that can be assigned to guard posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GroupRecord")]
pub struct Group {
    /// Unique group identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Notional headcount (proportional workload).
    pub staffing_size: Option<u32>,
    /// Fixed posts per 7 days (quota workload).
    pub weekly_guard_quota: Option<u32>,
    /// Time-ranged overrides of the staffing size.
    pub staffing_exceptions: Vec<StaffingException>,
    /// Rules in authoring order.
    pub constraints: Vec<Constraint>,
    /// Whether the group may hold both posts of one hour.
    pub can_guard_simultaneously: bool,
    /// Display colour (`#rrggbb`).
    pub color: String,
}

impl Group {
    /// Creates a group with no workload specifier and the default rules.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut group = Self {
            id: id.into(),
            name: name.into(),
            staffing_size: None,
            weekly_guard_quota: None,
            staffing_exceptions: Vec::new(),
            constraints: Vec::new(),
            can_guard_simultaneously: true,
            color: pastel_color(),
        };
        group.ensure_default_constraints();
        group
    }

    /// Sets a proportional workload.
    pub fn with_staffing_size(mut self, size: u32) -> Self {
        self.staffing_size = Some(size);
        self
    }

    /// Sets a fixed weekly quota.
    pub fn with_weekly_quota(mut self, quota: u32) -> Self {
        self.weekly_guard_quota = Some(quota);
        self
    }

    /// Sets simultaneous-guarding permission.
    pub fn with_simultaneous(mut self, allowed: bool) -> Self {
        self.can_guard_simultaneously = allowed;
        self.ensure_default_constraints();
        self
    }

    /// Adds a constraint.
    ///
    /// A Simultaneous constraint replaces the permission flag; repeated
    /// Consecutive or Rest constraints are ignored.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        match &constraint {
            Constraint::Simultaneous(s) => return self.with_simultaneous(s.allowed),
            Constraint::Consecutive | Constraint::Rest if self.constraints.contains(&constraint) => {
                return self
            }
            _ => {}
        }
        self.constraints.push(constraint);
        self
    }

    /// Adds a staffing exception.
    pub fn with_exception(mut self, exception: StaffingException) -> Self {
        self.staffing_exceptions.push(exception);
        self
    }

    /// Sets the display colour.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Injects the Simultaneous, Consecutive and Rest constraints if absent
    /// and syncs the Simultaneous constraint with the permission flag.
    pub fn ensure_default_constraints(&mut self) {
        let allowed = self.can_guard_simultaneously;
        let mut has_simultaneous = false;
        for c in &mut self.constraints {
            if let Constraint::Simultaneous(s) = c {
                s.allowed = allowed;
                has_simultaneous = true;
            }
        }
        if !has_simultaneous {
            self.constraints.push(Constraint::simultaneous(allowed));
        }
        if !self.has_consecutive() {
            self.constraints.push(Constraint::Consecutive);
        }
        if !self.has_rest() {
            self.constraints.push(Constraint::Rest);
        }
    }

    // ================================
    // Workload
    // ================================

    /// The workload specifier, if exactly one is set.
    pub fn workload(&self) -> Option<Workload> {
        match (self.staffing_size, self.weekly_guard_quota) {
            (Some(size), None) => Some(Workload::Proportional(size)),
            (None, Some(quota)) => Some(Workload::WeeklyQuota(quota)),
            _ => None,
        }
    }

    /// Whether the group is usable by the allocator.
    pub fn validate(&self) -> bool {
        self.workload().is_some()
    }

    /// Staffing size in effect at `date hour:00`.
    ///
    /// The first matching exception wins, then the base size, then
    /// [`DEFAULT_STAFFING_SIZE`].
    pub fn effective_staffing(&self, date: NaiveDate, hour: u8) -> u32 {
        self.staffing_exceptions
            .iter()
            .find(|e| e.contains(date, hour))
            .map(|e| e.new_staffing_size)
            .or(self.staffing_size)
            .unwrap_or(DEFAULT_STAFFING_SIZE)
    }

    /// Desired consecutive run length at `date hour:00`.
    pub fn desired_run_length(&self, date: NaiveDate, hour: u8) -> u32 {
        (self.effective_staffing(date, hour) / 2).max(MIN_RUN_LENGTH)
    }

    // ================================
    // Rule queries
    // ================================

    /// Whether the group may hold both posts of one hour.
    #[inline]
    pub fn allows_simultaneous(&self) -> bool {
        self.can_guard_simultaneously
    }

    /// Whether a permissive date rule exists for `date`.
    pub fn has_date_override(&self, date: NaiveDate) -> bool {
        self.constraints.iter().any(|c| match c {
            Constraint::DateSpecific(ds) => ds.has_positive_for(date),
            _ => false,
        })
    }

    /// Whether a staffing rule forces coupling at `slot`.
    pub fn forces_coupling(&self, slot: &TimeSlot) -> bool {
        self.constraints.iter().any(|c| match c {
            Constraint::StaffingRules(sr) => sr.forces_coupling(slot),
            _ => false,
        })
    }

    /// Whether an activity window commits the group at `hour` on `day`.
    pub fn is_committed(&self, day: u8, hour: u8) -> bool {
        self.constraints.iter().any(|c| match c {
            Constraint::ActivityWindow(aw) => aw.covers(day, hour),
            _ => false,
        })
    }

    /// Whether run lengths are scored.
    pub fn has_consecutive(&self) -> bool {
        self.constraints.contains(&Constraint::Consecutive)
    }

    /// Whether rest gaps are scored.
    pub fn has_rest(&self) -> bool {
        self.constraints.contains(&Constraint::Rest)
    }

    // ================================
    // Evaluation
    // ================================

    /// First hard violation of assigning this group to `slot`.
    pub fn violation(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> Option<ViolationType> {
        self.constraints
            .iter()
            .filter(|c| c.is_hard())
            .find_map(|c| c.violation(slot, view))
    }

    /// Every hard violation of assigning this group to `slot`, one per
    /// violated constraint in authoring order.
    pub fn violations(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> Vec<ViolationType> {
        self.constraints
            .iter()
            .filter(|c| c.is_hard())
            .filter_map(|c| c.violation(slot, view))
            .collect()
    }

    /// Whether every hard constraint passes.
    #[inline]
    pub fn is_available(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> bool {
        self.violation(slot, view).is_none()
    }

    /// Sum of per-post soft scores.
    pub fn slot_score(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.calculate_score(slot, view))
            .sum()
    }

    /// Usage changes of assigning this group to `slot`.
    pub fn on_assign(&self, slot: &TimeSlot) -> UsageDelta {
        let mut delta = UsageDelta::new();
        for c in &self.constraints {
            delta.extend(c.on_assign(slot));
        }
        delta
    }

    /// Usage changes of removing this group from `slot`.
    pub fn on_remove(&self, slot: &TimeSlot) -> UsageDelta {
        let mut delta = UsageDelta::new();
        for c in &self.constraints {
            delta.extend(c.on_remove(slot));
        }
        delta
    }

    // ================================
    // Persistence
    // ================================

    /// Loads a group from a JSON value.
    ///
    /// # Errors
    /// - [`RosterError::UnknownConstraintType`] for an unregistered constraint tag.
    /// - [`RosterError::Json`] if required fields are missing or malformed.
    pub fn from_value(value: Value) -> Result<Self, RosterError> {
        let record: GroupRecord = serde_json::from_value(value)?;
        Self::try_from(record)
    }

    /// Loads a group from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, RosterError> {
        Self::from_value(serde_json::from_str(s)?)
    }

    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Result<Value, RosterError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Loads a JSON array of groups.
pub fn load_groups(s: &str) -> Result<Vec<Group>, RosterError> {
    let values: Vec<Value> = serde_json::from_str(s)?;
    values.into_iter().map(Group::from_value).collect()
}

/// Serializes groups as a pretty JSON array.
pub fn save_groups(groups: &[Group]) -> Result<String, RosterError> {
    Ok(serde_json::to_string_pretty(groups)?)
}

/// Random light colour.
fn pastel_color() -> String {
    let mut rng = rand::rng();
    let [r, g, b]: [u8; 3] = std::array::from_fn(|_| rng.random_range(180..=255));
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct GroupRecord {
    id: String,
    name: String,
    #[serde(default)]
    staffing_size: Option<u32>,
    #[serde(default)]
    weekly_guard_quota: Option<u32>,
    #[serde(default)]
    staffing_exceptions: Vec<StaffingException>,
    #[serde(default)]
    constraints: Option<Vec<Value>>,
    #[serde(default = "default_true")]
    can_guard_simultaneously: bool,
    #[serde(default)]
    color: Option<String>,
    // Flat rule arrays of older documents
    #[serde(default)]
    hard_unavailability_rules: Option<Value>,
    #[serde(default)]
    primary_activity_windows: Option<Value>,
    #[serde(default)]
    date_constraints: Option<Value>,
    #[serde(default)]
    staffing_rules: Option<Value>,
}

impl GroupRecord {
    fn constraint_entries(&mut self) -> Vec<Value> {
        if let Some(entries) = self.constraints.take() {
            return entries;
        }
        let legacy = [
            ("unavailability", "rules", self.hard_unavailability_rules.take()),
            ("activity_window", "windows", self.primary_activity_windows.take()),
            ("date_specific", "constraints", self.date_constraints.take()),
            ("staffing_rules", "rules", self.staffing_rules.take()),
        ];
        legacy
            .into_iter()
            .filter_map(|(tag, field, value)| {
                let value = value?;
                let non_empty = value.as_array().is_some_and(|a| !a.is_empty());
                non_empty.then(|| json!({ "type": tag, field: value }))
            })
            .collect()
    }
}

impl TryFrom<GroupRecord> for Group {
    type Error = RosterError;

    fn try_from(mut record: GroupRecord) -> Result<Self, Self::Error> {
        let mut constraints = Vec::new();
        for entry in record.constraint_entries() {
            match Constraint::from_value(entry) {
                Ok(c) => constraints.push(c),
                Err(e @ RosterError::UnknownConstraintType(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(group = %record.id, error = %e, "Skipping malformed constraint");
                }
            }
        }

        let mut group = Group {
            id: record.id,
            name: record.name,
            staffing_size: record.staffing_size,
            weekly_guard_quota: record.weekly_guard_quota,
            staffing_exceptions: record.staffing_exceptions,
            constraints,
            can_guard_simultaneously: record.can_guard_simultaneously,
            color: record.color.unwrap_or_else(pastel_color),
        };
        group.ensure_default_constraints();
        Ok(group)
    }
}
