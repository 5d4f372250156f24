//! Staffing rules: capacity caps and forced coupling.
//!
//! Every covered assignment increments the rule's usage counter by one.
//! Capacity is checked against the ledger:
//!
//! ```text
//! usage(rule) + increment <= max_capacity
//!
//! increment = 0   if the assignment is already counted
//!           = 2   during fill, the group's coupling is forced at this
//!                 hour and the sibling post is still empty
//!           = 1   otherwise
//! ```
//!
//! A coupled pair lands on both posts at once, so every capped rule
//! covering the hour is charged twice, whether or not it couples.

use serde::{Deserialize, Serialize};

use crate::context::{ConstraintView, UsageDelta};
use crate::models::window::new_uid;
use crate::models::{StaffingRule, TimeSlot, ViolationType};

/// A group's staffing rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRules {
    /// Weekly rules.
    #[serde(default)]
    pub rules: Vec<StaffingRule>,
    #[serde(default = "new_uid")]
    pub uid: String,
}

impl StaffingRules {
    /// Creates the constraint with a fresh uid.
    pub fn new(rules: Vec<StaffingRule>) -> Self {
        Self {
            rules,
            uid: new_uid(),
        }
    }

    /// Rules covering `slot`'s weekday and hour.
    pub fn matching<'a>(&'a self, slot: &'a TimeSlot) -> impl Iterator<Item = &'a StaffingRule> {
        self.rules
            .iter()
            .filter(move |r| r.contains(slot.day_of_week, slot.hour))
    }

    /// Whether any covering rule forces coupling.
    pub fn forces_coupling(&self, slot: &TimeSlot) -> bool {
        self.matching(slot).any(|r| r.force_coupling)
    }

    pub(super) fn violation(
        &self,
        slot: &TimeSlot,
        view: &ConstraintView<'_>,
    ) -> Option<ViolationType> {
        let increment = if view.counted {
            0
        } else if view.initial_fill
            && view.other_group_id.is_none()
            && view.group.forces_coupling(slot)
        {
            2
        } else {
            1
        };
        for rule in self.matching(slot) {
            if let Some(max) = rule.max_capacity {
                if view.usage(&rule.uid) + increment > i64::from(max) {
                    return Some(ViolationType::CapacityExceeded);
                }
            }

            if rule.force_coupling {
                if !view.group.allows_simultaneous() {
                    return Some(ViolationType::CouplingBroken);
                }
                if view.other_group_id.is_some_and(|other| other != view.group_id()) {
                    return Some(ViolationType::CouplingBroken);
                }
            }
        }
        None
    }

    pub(super) fn score(&self, slot: &TimeSlot, view: &ConstraintView<'_>) -> f64 {
        let coupled = self.matching(slot).filter(|r| r.force_coupling).count();
        coupled as f64 * view.config().staffing_rule_bonus
    }

    pub(super) fn usage_delta(&self, slot: &TimeSlot, amount: i64) -> UsageDelta {
        let mut delta = UsageDelta::new();
        for rule in self.matching(slot) {
            delta.add(rule.uid.as_str(), amount);
        }
        delta
    }
}
