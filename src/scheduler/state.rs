//! Scoring state shared by the optimizer, validation and reporting.
//!
//! [`ScheduleState`] wraps a [`ScheduleContext`] with a group lookup and
//! a [`ScoreCache`] of per-group run scores. The cache is a side table
//! keyed by group position: every slot mutation that touches a group must
//! invalidate that group's entry.
//!
//! # Total Score
//!
//! ```text
//! total = Σ_g run_score(g) + Σ_hours simultaneous_bonus
//! ```
//!
//! where an hour earns the bonus when one group holds both posts and is
//! allowed to.

use std::collections::HashMap;

use crate::config::ScoringConfig;
use crate::constraints::sequence;
use crate::context::{ConstraintView, HourPoint, ScheduleContext};
use crate::models::{Group, Schedule, TimeSlot, Violation, ViolationType};

/// Memoized per-group run scores.
#[derive(Debug, Clone, Default)]
pub struct ScoreCache {
    values: Vec<Option<f64>>,
}

impl ScoreCache {
    /// Creates an empty cache for `n` groups.
    pub fn new(n: usize) -> Self {
        Self {
            values: vec![None; n],
        }
    }

    /// Cached value of group `g`.
    #[inline]
    pub fn get(&self, g: usize) -> Option<f64> {
        self.values.get(g).copied().flatten()
    }

    /// Stores the value of group `g`.
    pub fn set(&mut self, g: usize, value: f64) {
        if let Some(v) = self.values.get_mut(g) {
            *v = Some(value);
        }
    }

    /// Drops the value of group `g`.
    pub fn invalidate(&mut self, g: usize) {
        if let Some(v) = self.values.get_mut(g) {
            *v = None;
        }
    }
}

/// Context, group lookup and score cache for one run.
#[derive(Debug, Clone)]
pub struct ScheduleState<'a> {
    groups: &'a [Group],
    positions: HashMap<&'a str, usize>,
    ctx: ScheduleContext,
    cache: ScoreCache,
}

impl<'a> ScheduleState<'a> {
    /// Builds the state for `schedule`.
    pub fn new(schedule: &Schedule, groups: &'a [Group], config: ScoringConfig) -> Self {
        let positions = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.as_str(), i))
            .collect();
        Self {
            groups,
            positions,
            ctx: ScheduleContext::build(schedule, groups, config),
            cache: ScoreCache::new(groups.len()),
        }
    }

    /// Groups in input order.
    pub fn groups(&self) -> &'a [Group] {
        self.groups
    }

    /// Position of the group with `id`.
    #[inline]
    pub fn group_index(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Position of the group holding `slot`, if it is a known group.
    #[inline]
    pub fn holder(&self, slot: &TimeSlot) -> Option<usize> {
        slot.assigned_group().and_then(|id| self.group_index(id))
    }

    /// Run context.
    pub fn context(&self) -> &ScheduleContext {
        &self.ctx
    }

    /// Mutable run context.
    pub fn context_mut(&mut self) -> &mut ScheduleContext {
        &mut self.ctx
    }

    /// Scoring weights.
    pub fn config(&self) -> &ScoringConfig {
        self.ctx.config()
    }

    // ================================
    // Scores
    // ================================

    /// Consecutive + Rest score of group `g`, recomputed from the slots.
    pub fn fresh_group_score(&self, slots: &[TimeSlot], g: usize) -> f64 {
        sequence::run_score(
            &self.groups[g],
            self.ctx.timeline().points(),
            slots,
            self.ctx.config(),
        )
    }

    /// Consecutive + Rest score of group `g`, served from the cache.
    pub fn group_consecutive_score(&mut self, slots: &[TimeSlot], g: usize) -> f64 {
        if let Some(v) = self.cache.get(g) {
            return v;
        }
        let v = self.fresh_group_score(slots, g);
        self.cache.set(g, v);
        v
    }

    /// Drops the cached score of group `g`.
    pub fn invalidate(&mut self, g: usize) {
        self.cache.invalidate(g);
    }

    /// Simultaneous bonus earned at one hour.
    pub fn simultaneous_score_at(&self, slots: &[TimeSlot], point: &HourPoint) -> f64 {
        let [Some(p1), Some(p2)] = point.posts else {
            return 0.0;
        };
        match (self.holder(&slots[p1]), self.holder(&slots[p2])) {
            (Some(a), Some(b)) if a == b && self.groups[a].allows_simultaneous() => {
                self.ctx.config().simultaneous_bonus
            }
            _ => 0.0,
        }
    }

    /// Simultaneous bonus over the whole range.
    pub fn simultaneous_score(&self, slots: &[TimeSlot]) -> f64 {
        self.ctx
            .timeline()
            .points()
            .iter()
            .map(|p| self.simultaneous_score_at(slots, p))
            .sum()
    }

    /// Total score of the schedule.
    pub fn total_score(&mut self, slots: &[TimeSlot]) -> f64 {
        let runs: f64 = (0..self.groups.len())
            .map(|g| self.group_consecutive_score(slots, g))
            .sum();
        runs + self.simultaneous_score(slots)
    }

    // ================================
    // Hard checks
    // ================================

    /// First hard violation at `slots[idx]`, evaluated as already counted.
    pub fn slot_violation(&self, slots: &[TimeSlot], idx: usize) -> Option<Violation> {
        let slot = &slots[idx];
        let id = slot.assigned_group()?;
        let Some(g) = self.group_index(id) else {
            return Some(Violation::new(ViolationType::UnknownGroup, id, slot.key()));
        };
        let group = &self.groups[g];
        let view: ConstraintView<'_> = self.ctx.view(slots, idx, group);
        group
            .violation(slot, &view)
            .map(|v| Violation::new(v, id, slot.key()))
    }

    /// Every hard violation at `slots[idx]`, one per violated constraint.
    pub fn slot_violations(&self, slots: &[TimeSlot], idx: usize) -> Vec<Violation> {
        let slot = &slots[idx];
        let Some(id) = slot.assigned_group() else {
            return Vec::new();
        };
        let Some(g) = self.group_index(id) else {
            return vec![Violation::new(ViolationType::UnknownGroup, id, slot.key())];
        };
        let group = &self.groups[g];
        let view = self.ctx.view(slots, idx, group);
        group
            .violations(slot, &view)
            .into_iter()
            .map(|v| Violation::new(v, id, slot.key()))
            .collect()
    }

    /// Whether the known groups on both posts of the hour at timeline
    /// position `point` pass every hard constraint.
    pub fn hour_is_feasible(&self, slots: &[TimeSlot], point: usize) -> bool {
        self.ctx.timeline().points()[point]
            .slot_indices()
            .filter_map(|idx| self.slot_violation(slots, idx))
            .all(|v| v.violation_type == ViolationType::UnknownGroup)
    }

    /// All hard violations in slot order.
    pub fn violations(&self, slots: &[TimeSlot]) -> Vec<Violation> {
        (0..slots.len())
            .flat_map(|idx| self.slot_violations(slots, idx))
            .collect()
    }
}
