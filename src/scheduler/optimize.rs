//! Best-improvement exchange search.
//!
//! # Algorithm
//!
//! Mutable posts (unlocked, not disabled, empty or held by a known group)
//! are grouped into time buckets, one per hour. For each bucket `t1` in
//! chronological order, every later bucket `t2` (optionally within
//! `max_radius` buckets) is scanned for moves:
//!
//! - a block swap exchanging both posts when both buckets have two,
//! - every single swap between a post of `t1` and a post of `t2`.
//!
//! Each move is applied tentatively (hooks, usage ledger, slots),
//! rejected if a touched hour breaks a hard constraint, otherwise scored
//! as the change in the affected groups' run scores plus the change in
//! simultaneous bonus at the touched hours, and then always reverted.
//! The best strictly improving move for `t1` is committed before moving
//! on. One pass is one forward scan; the search never accepts a
//! non-improving move, so the total score never decreases.
//!
//! # Complexity
//! O(b² × h) per pass, b = buckets, h = hours in range.
//!
//! # Reference
//! Aarts & Lenstra (2003), "Local Search in Combinatorial Optimization", Ch. 1

use std::ops::ControlFlow;

use super::state::ScheduleState;
use crate::config::ScoringConfig;
use crate::context::UsageDelta;
use crate::models::{Group, Schedule};

/// Smallest score gain treated as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Progress callback: receives the percentage of buckets processed and
/// may stop the search between buckets.
pub type ProgressFn<'p> = dyn FnMut(f64) -> ControlFlow<()> + 'p;

/// Search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Forward scans over all buckets.
    pub passes: usize,
    /// Maximum bucket distance between swap partners.
    pub max_radius: Option<usize>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            passes: 1,
            max_radius: None,
        }
    }
}

impl OptimizeOptions {
    /// Sets the number of passes.
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    /// Caps the bucket distance of swap partners.
    pub fn with_max_radius(mut self, radius: usize) -> Self {
        self.max_radius = Some(radius);
        self
    }
}

/// Summary of one optimize call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptimizeOutcome {
    /// Passes completed (a stopped pass is not counted).
    pub passes: usize,
    /// Moves committed.
    pub moves_committed: usize,
    /// Total score before the search.
    pub score_before: f64,
    /// Total score after the search.
    pub score_after: f64,
}

/// Candidate exchange between two buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Single(usize, usize),
    Block([usize; 2], [usize; 2]),
}

impl Move {
    fn pairs(&self) -> Vec<(usize, usize)> {
        match *self {
            Move::Single(a, b) => vec![(a, b)],
            Move::Block([a1, a2], [b1, b2]) => vec![(a1, b1), (a2, b2)],
        }
    }
}

/// Mutable posts of one hour.
#[derive(Debug, Clone)]
struct Bucket {
    point: usize,
    slots: Vec<usize>,
}

/// Best-improvement exchange search.
#[derive(Debug, Clone)]
pub struct LocalSearch<'a> {
    groups: &'a [Group],
    config: ScoringConfig,
    options: OptimizeOptions,
}

impl<'a> LocalSearch<'a> {
    /// Creates a search over `groups`.
    pub fn new(groups: &'a [Group], config: ScoringConfig) -> Self {
        Self {
            groups,
            config,
            options: OptimizeOptions::default(),
        }
    }

    /// Sets the search limits.
    pub fn with_options(mut self, options: OptimizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Improves `schedule` in place.
    pub fn run(
        &self,
        schedule: &mut Schedule,
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> OptimizeOutcome {
        let mut state = ScheduleState::new(schedule, self.groups, self.config);
        let score_before = state.total_score(&schedule.slots);
        let mut outcome = OptimizeOutcome {
            score_before,
            score_after: score_before,
            ..Default::default()
        };

        let buckets = self.buckets(schedule, &state);
        if buckets.len() < 2 {
            return outcome;
        }
        let total_steps = (buckets.len() * self.options.passes) as f64;

        'passes: for pass in 0..self.options.passes {
            let mut committed_this_pass = 0;
            for (i, t1) in buckets.iter().enumerate() {
                if let Some(best) = self.best_move(schedule, &mut state, &buckets, i) {
                    self.commit(schedule, &mut state, best);
                    committed_this_pass += 1;
                }

                if let Some(callback) = progress.as_mut() {
                    let done = (pass * buckets.len() + i + 1) as f64;
                    if callback(done / total_steps * 100.0).is_break() {
                        tracing::info!(bucket = t1.point, "Optimization stopped by caller");
                        outcome.moves_committed += committed_this_pass;
                        break 'passes;
                    }
                }
            }
            outcome.moves_committed += committed_this_pass;
            outcome.passes += 1;
            tracing::debug!(pass, committed = committed_this_pass, "Completed optimization pass");
        }

        outcome.score_after = state.total_score(&schedule.slots);
        outcome
    }

    fn buckets(&self, schedule: &Schedule, state: &ScheduleState<'_>) -> Vec<Bucket> {
        state
            .context()
            .timeline()
            .points()
            .iter()
            .enumerate()
            .filter_map(|(point, hour)| {
                let slots: Vec<usize> = hour
                    .slot_indices()
                    .filter(|&idx| {
                        let slot = &schedule.slots[idx];
                        !slot.is_locked
                            && !slot.is_disabled()
                            && (slot.is_empty() || state.holder(slot).is_some())
                    })
                    .collect();
                (!slots.is_empty()).then_some(Bucket { point, slots })
            })
            .collect()
    }

    fn candidate_moves(&self, schedule: &Schedule, t1: &Bucket, t2: &Bucket) -> Vec<Move> {
        let holder = |idx: usize| schedule.slots[idx].group_id.as_deref();
        let mut moves = Vec::new();

        if let ([a1, a2], [b1, b2]) = (t1.slots.as_slice(), t2.slots.as_slice()) {
            if holder(*a1) != holder(*b1) && holder(*a2) != holder(*b2) {
                moves.push(Move::Block([*a1, *a2], [*b1, *b2]));
            }
        }
        for &a in &t1.slots {
            for &b in &t2.slots {
                if holder(a) != holder(b) {
                    moves.push(Move::Single(a, b));
                }
            }
        }
        moves
    }

    fn best_move(
        &self,
        schedule: &mut Schedule,
        state: &mut ScheduleState<'_>,
        buckets: &[Bucket],
        i: usize,
    ) -> Option<Move> {
        let t1 = &buckets[i];
        let end = match self.options.max_radius {
            Some(r) => (i + 1 + r).min(buckets.len()),
            None => buckets.len(),
        };

        let mut best: Option<(f64, Move)> = None;
        for t2 in &buckets[i + 1..end] {
            for mv in self.candidate_moves(schedule, t1, t2) {
                if let Some(delta) = self.evaluate(schedule, state, mv, t1.point, t2.point) {
                    if delta > IMPROVEMENT_EPSILON && best.map_or(true, |(b, _)| delta > b) {
                        best = Some((delta, mv));
                    }
                }
            }
        }
        best.map(|(_, mv)| mv)
    }

    /// Score change of `mv`, or `None` if it breaks a hard constraint.
    /// Leaves the schedule and ledger exactly as found.
    fn evaluate(
        &self,
        schedule: &mut Schedule,
        state: &mut ScheduleState<'_>,
        mv: Move,
        p1: usize,
        p2: usize,
    ) -> Option<f64> {
        let affected = self.affected_groups(schedule, state, mv);
        let runs_before: f64 = affected
            .iter()
            .map(|&g| state.group_consecutive_score(&schedule.slots, g))
            .sum();
        let sim_before = self.simultaneous_at(schedule, state, p1, p2);

        let deltas = apply(schedule, state, mv);
        let feasible = state.hour_is_feasible(&schedule.slots, p1)
            && state.hour_is_feasible(&schedule.slots, p2);
        let delta = feasible.then(|| {
            let runs_after: f64 = affected
                .iter()
                .map(|&g| state.fresh_group_score(&schedule.slots, g))
                .sum();
            let sim_after = self.simultaneous_at(schedule, state, p1, p2);
            (runs_after - runs_before) + (sim_after - sim_before)
        });
        revert(schedule, state, mv, deltas);
        delta
    }

    fn commit(&self, schedule: &mut Schedule, state: &mut ScheduleState<'_>, mv: Move) {
        let affected = self.affected_groups(schedule, state, mv);
        apply(schedule, state, mv);
        for g in affected {
            state.invalidate(g);
        }
    }

    fn affected_groups(&self, schedule: &Schedule, state: &ScheduleState<'_>, mv: Move) -> Vec<usize> {
        let mut groups: Vec<usize> = mv
            .pairs()
            .into_iter()
            .flat_map(|(a, b)| [a, b])
            .filter_map(|idx| state.holder(&schedule.slots[idx]))
            .collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    fn simultaneous_at(&self, schedule: &Schedule, state: &ScheduleState<'_>, p1: usize, p2: usize) -> f64 {
        let points = state.context().timeline().points();
        state.simultaneous_score_at(&schedule.slots, &points[p1])
            + state.simultaneous_score_at(&schedule.slots, &points[p2])
    }
}

/// Applies `mv`: removal hooks, slot exchange, assignment hooks.
fn apply(schedule: &mut Schedule, state: &mut ScheduleState<'_>, mv: Move) -> Vec<UsageDelta> {
    let groups = state.groups();
    let mut deltas = Vec::new();
    for (a, b) in mv.pairs() {
        for idx in [a, b] {
            if let Some(g) = state.holder(&schedule.slots[idx]) {
                deltas.push(state.context_mut().record_remove(&groups[g], &schedule.slots[idx]));
            }
        }
        let taken = schedule.slots[a].group_id.take();
        schedule.slots[a].group_id = std::mem::replace(&mut schedule.slots[b].group_id, taken);
        for idx in [a, b] {
            if let Some(g) = state.holder(&schedule.slots[idx]) {
                deltas.push(state.context_mut().record_assign(&groups[g], &schedule.slots[idx]));
            }
        }
    }
    deltas
}

/// Undoes an [`apply`] of the same move.
fn revert(schedule: &mut Schedule, state: &mut ScheduleState<'_>, mv: Move, deltas: Vec<UsageDelta>) {
    for delta in deltas.iter().rev() {
        state.context_mut().usage_mut().revert(delta);
    }
    for (a, b) in mv.pairs().into_iter().rev() {
        let taken = schedule.slots[a].group_id.take();
        schedule.slots[a].group_id = std::mem::replace(&mut schedule.slots[b].group_id, taken);
    }
}
