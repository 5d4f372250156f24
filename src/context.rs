//! Run-scoped schedule context.
//!
//! A [`ScheduleContext`] is rebuilt at the start of every fill, optimize
//! or validate call. It owns:
//!
//! - a [`SlotIndex`] from `(date, hour, position)` to the slot's position
//!   in `Schedule::slots`,
//! - a [`UsageLedger`] of per-rule usage counters (staffing capacity),
//! - the chronological [`Timeline`] of the planning range.
//!
//! Constraints never see the context directly. Each call receives a
//! [`ConstraintView`]: an immutable snapshot of the acting group, the
//! sibling post's group and the ledger. Assignment hooks return
//! [`UsageDelta`]s which the caller applies or reverts, so a tentative
//! move can always be undone exactly.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::config::ScoringConfig;
use crate::models::{Group, Schedule, SlotKey, TimeSlot};

// ================================
// Slot index
// ================================

/// Map from slot identity to index into the slot vector.
#[derive(Debug, Clone, Default)]
pub struct SlotIndex {
    map: HashMap<SlotKey, usize>,
}

impl SlotIndex {
    /// Indexes a slot vector. Later duplicates shadow earlier ones.
    pub fn build(slots: &[TimeSlot]) -> Self {
        let map = slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key(), i))
            .collect();
        Self { map }
    }

    /// Index of the slot with `key`.
    #[inline]
    pub fn get(&self, key: &SlotKey) -> Option<usize> {
        self.map.get(key).copied()
    }

    /// Index of the other post in the same hour as `slot`.
    #[inline]
    pub fn sibling_of(&self, slot: &TimeSlot) -> Option<usize> {
        self.get(&slot.key().sibling())
    }

    /// Number of indexed slots.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ================================
// Usage ledger
// ================================

/// Changes to rule usage counters produced by one assignment or removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageDelta {
    entries: Vec<(String, i64)>,
}

impl UsageDelta {
    /// Creates an empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change for one rule.
    pub fn add(&mut self, uid: impl Into<String>, amount: i64) {
        self.entries.push((uid.into(), amount));
    }

    /// Appends all entries of `other`.
    pub fn extend(&mut self, other: UsageDelta) {
        self.entries.extend(other.entries);
    }

    /// The same changes with opposite sign.
    pub fn negated(mut self) -> Self {
        for (_, amount) in &mut self.entries {
            *amount = -*amount;
        }
        self
    }

    /// Whether the delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(uid, amount)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(uid, a)| (uid.as_str(), *a))
    }
}

/// Per-rule usage counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageLedger {
    counters: HashMap<String, i64>,
}

impl UsageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current usage of a rule.
    #[inline]
    pub fn get(&self, uid: &str) -> i64 {
        self.counters.get(uid).copied().unwrap_or(0)
    }

    /// Applies a delta.
    pub fn apply(&mut self, delta: &UsageDelta) {
        for (uid, amount) in delta.iter() {
            *self.counters.entry(uid.to_string()).or_insert(0) += amount;
        }
    }

    /// Undoes a previously applied delta.
    pub fn revert(&mut self, delta: &UsageDelta) {
        for (uid, amount) in delta.iter() {
            *self.counters.entry(uid.to_string()).or_insert(0) -= amount;
        }
    }
}

// ================================
// Timeline
// ================================

/// One hour of the planning range with its (up to two) post slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourPoint {
    pub date: NaiveDate,
    pub hour: u8,
    pub day_of_week: u8,
    /// Slot indices of position 1 and position 2.
    pub posts: [Option<usize>; 2],
}

impl HourPoint {
    /// Slot indices present at this hour.
    pub fn slot_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.posts.iter().flatten().copied()
    }
}

/// Chronological sequence of every hour between the schedule's start and
/// end date (inclusive).
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    points: Vec<HourPoint>,
    point_of_slot: HashMap<usize, usize>,
}

impl Timeline {
    /// Builds the timeline of `schedule`'s date range.
    pub fn build(schedule: &Schedule, index: &SlotIndex) -> Self {
        let mut points = Vec::new();
        let mut point_of_slot = HashMap::new();
        for date in schedule.dates() {
            let day_of_week = date.weekday().num_days_from_sunday() as u8;
            for hour in 0..24u8 {
                let posts = [1u8, 2].map(|pos| index.get(&SlotKey::new(date, hour, pos)));
                for idx in posts.iter().flatten() {
                    point_of_slot.insert(*idx, points.len());
                }
                points.push(HourPoint {
                    date,
                    hour,
                    day_of_week,
                    posts,
                });
            }
        }
        Self {
            points,
            point_of_slot,
        }
    }

    /// All hour points in chronological order.
    pub fn points(&self) -> &[HourPoint] {
        &self.points
    }

    /// Timeline position of a slot.
    pub fn point_of(&self, slot_idx: usize) -> Option<usize> {
        self.point_of_slot.get(&slot_idx).copied()
    }

    /// Number of hours.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ================================
// Context
// ================================

/// Shared state for one fill/optimize/validate run.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    index: SlotIndex,
    usage: UsageLedger,
    timeline: Timeline,
    config: ScoringConfig,
}

impl ScheduleContext {
    /// Indexes the schedule and replays every existing assignment through
    /// its group's hooks to seed the usage counters.
    pub fn build(schedule: &Schedule, groups: &[Group], config: ScoringConfig) -> Self {
        let index = SlotIndex::build(&schedule.slots);
        let timeline = Timeline::build(schedule, &index);
        let by_id: HashMap<&str, &Group> = groups.iter().map(|g| (g.id.as_str(), g)).collect();

        let mut usage = UsageLedger::new();
        for slot in &schedule.slots {
            if let Some(group) = slot.assigned_group().and_then(|id| by_id.get(id)) {
                usage.apply(&group.on_assign(slot));
            }
        }

        Self {
            index,
            usage,
            timeline,
            config,
        }
    }

    /// Slot index.
    pub fn index(&self) -> &SlotIndex {
        &self.index
    }

    /// Usage counters.
    pub fn usage(&self) -> &UsageLedger {
        &self.usage
    }

    /// Mutable usage counters.
    pub fn usage_mut(&mut self) -> &mut UsageLedger {
        &mut self.usage
    }

    /// Planning-range timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Scoring weights.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Group id on the sibling post of `slots[slot_idx]`.
    pub fn sibling_group<'a>(&self, slots: &'a [TimeSlot], slot_idx: usize) -> Option<&'a str> {
        self.index
            .sibling_of(&slots[slot_idx])
            .and_then(|i| slots[i].assigned_group())
    }

    /// View for evaluating `group` at `slots[slot_idx]`.
    ///
    /// The sibling group is read from the live slots. The returned view is
    /// `counted`: the group's own assignment at this slot is assumed to be
    /// in the ledger already. Use [`ConstraintView::proposed`] for a
    /// candidate that is not yet assigned.
    pub fn view<'a>(
        &'a self,
        slots: &'a [TimeSlot],
        slot_idx: usize,
        group: &'a Group,
    ) -> ConstraintView<'a> {
        ConstraintView {
            group,
            other_group_id: self.sibling_group(slots, slot_idx),
            initial_fill: false,
            counted: true,
            usage: &self.usage,
            config: &self.config,
        }
    }

    /// Applies `group`'s assignment hooks for `slot` and returns the delta.
    pub fn record_assign(&mut self, group: &Group, slot: &TimeSlot) -> UsageDelta {
        let delta = group.on_assign(slot);
        self.usage.apply(&delta);
        delta
    }

    /// Applies `group`'s removal hooks for `slot` and returns the delta.
    pub fn record_remove(&mut self, group: &Group, slot: &TimeSlot) -> UsageDelta {
        let delta = group.on_remove(slot);
        self.usage.apply(&delta);
        delta
    }
}

/// Read view handed to each constraint call.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintView<'a> {
    /// Group being evaluated.
    pub group: &'a Group,
    /// Group on the other post of the same hour.
    pub other_group_id: Option<&'a str>,
    /// Set during the initial fill (enables coupled-pair capacity).
    pub initial_fill: bool,
    /// Whether the ledger already includes this assignment.
    pub counted: bool,
    usage: &'a UsageLedger,
    config: &'a ScoringConfig,
}

impl<'a> ConstraintView<'a> {
    /// Creates a counted view.
    pub fn new(
        group: &'a Group,
        other_group_id: Option<&'a str>,
        usage: &'a UsageLedger,
        config: &'a ScoringConfig,
    ) -> Self {
        Self {
            group,
            other_group_id,
            initial_fill: false,
            counted: true,
            usage,
            config,
        }
    }

    /// Marks the assignment as proposed (not yet in the ledger).
    pub fn proposed(mut self) -> Self {
        self.counted = false;
        self
    }

    /// Marks the call as part of the initial fill.
    pub fn during_fill(mut self) -> Self {
        self.initial_fill = true;
        self
    }

    /// Acting group id.
    #[inline]
    pub fn group_id(&self) -> &'a str {
        &self.group.id
    }

    /// Whether the sibling post holds the acting group.
    #[inline]
    pub fn sibling_is_self(&self) -> bool {
        self.other_group_id == Some(self.group_id())
    }

    /// Current usage of a rule.
    #[inline]
    pub fn usage(&self, uid: &str) -> i64 {
        self.usage.get(uid)
    }

    /// Scoring weights.
    #[inline]
    pub fn config(&self) -> &'a ScoringConfig {
        self.config
    }
}
