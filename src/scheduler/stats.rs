//! Roster coverage statistics.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Assigned posts | Posts held by the group |
//! | Distinct hours | Hours in which the group holds at least one post |
//! | Simultaneous hours | Hours in which the group holds both posts |
//! | Fill target | Posts the group would receive from an empty roster |
//! | Target gap | `assigned - target` |
//! | Empty / disabled / locked | Schedule-wide post counts |

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::quota::QuotaPlan;
use crate::models::{Group, Schedule};

/// Per-group statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Posts held.
    pub assigned_posts: usize,
    /// Hours with at least one post held.
    pub distinct_hours: usize,
    /// Hours with both posts held.
    pub simultaneous_hours: usize,
    /// Fill target over the whole range, if the group has a valid workload.
    pub target: Option<i64>,
}

impl GroupStats {
    /// Assigned minus target.
    pub fn target_gap(&self) -> Option<i64> {
        self.target.map(|t| self.assigned_posts as i64 - t)
    }
}

/// Statistics over a whole roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterStats {
    /// Total posts in the range.
    pub total_posts: usize,
    /// Posts without a group.
    pub empty_posts: usize,
    /// Posts taken out of rotation.
    pub disabled_posts: usize,
    /// Locked posts.
    pub locked_posts: usize,
    /// Statistics keyed by group id.
    pub by_group: BTreeMap<String, GroupStats>,
}

impl RosterStats {
    /// Computes statistics for `schedule` against `groups`.
    ///
    /// Targets are those the fill allocator would set for the same range
    /// with every post that is not disabled empty and unlocked.
    pub fn calculate(schedule: &Schedule, groups: &[Group]) -> Self {
        let mut stats = Self {
            total_posts: schedule.slots.len(),
            ..Default::default()
        };

        let mut hours: BTreeMap<&str, HashSet<(NaiveDate, u8)>> = BTreeMap::new();
        let mut posts_per_hour: BTreeMap<(&str, NaiveDate, u8), usize> = BTreeMap::new();
        for slot in &schedule.slots {
            if slot.is_locked {
                stats.locked_posts += 1;
            }
            if slot.is_disabled() {
                stats.disabled_posts += 1;
            } else if slot.is_empty() {
                stats.empty_posts += 1;
            }
            if let Some(id) = slot.assigned_group() {
                hours.entry(id).or_default().insert((slot.date, slot.hour));
                *posts_per_hour.entry((id, slot.date, slot.hour)).or_insert(0) += 1;
            }
        }

        let usable: Vec<&Group> = groups.iter().filter(|g| g.validate()).collect();
        let plan = QuotaPlan::compute(&usable, &blank_copy(schedule));

        for group in groups {
            let id = group.id.as_str();
            let simultaneous_hours = posts_per_hour
                .iter()
                .filter(|((g, _, _), n)| *g == id && **n >= 2)
                .count();
            stats.by_group.insert(
                group.id.clone(),
                GroupStats {
                    assigned_posts: schedule.count_assigned(id),
                    distinct_hours: hours.get(id).map_or(0, HashSet::len),
                    simultaneous_hours,
                    target: plan.target(id),
                },
            );
        }
        stats
    }

    /// Statistics of one group.
    pub fn group(&self, id: &str) -> Option<&GroupStats> {
        self.by_group.get(id)
    }

    /// Fraction of in-rotation posts that are assigned (0.0..1.0).
    pub fn coverage(&self) -> f64 {
        let in_rotation = self.total_posts - self.disabled_posts;
        if in_rotation == 0 {
            return 1.0;
        }
        (in_rotation - self.empty_posts) as f64 / in_rotation as f64
    }
}

/// Copy of `schedule` with every post that is not disabled cleared.
fn blank_copy(schedule: &Schedule) -> Schedule {
    let mut blank = schedule.clone();
    for slot in blank.slots.iter_mut().filter(|s| !s.is_disabled()) {
        slot.group_id = None;
        slot.is_locked = false;
    }
    blank
}
