//! Greedy initial-fill allocator.
//!
//! # Algorithm
//!
//! 1. Compute per-group targets ([`QuotaPlan`]).
//! 2. Shuffle the fillable posts (empty and unlocked).
//! 3. For each post, pick the feasible group with the highest
//!    `progress + Σ soft scores + continuity` (first encountered wins ties).
//! 4. If the winner's staffing rule forces coupling and the sibling post
//!    is empty, assign both posts at once and count two toward the quota.
//!    A coupled group whose sibling post cannot take it is not a candidate.
//! 5. Replay the assignment hooks into the usage ledger.
//!
//! Posts without a feasible group stay empty.
//!
//! # Complexity
//! O(p × g × c) where p = fillable posts, g = groups, c = constraints per group.

use rand::seq::SliceRandom;
use rand::Rng;

use super::quota::QuotaPlan;
use crate::config::ScoringConfig;
use crate::context::{ConstraintView, ScheduleContext};
use crate::models::{Group, Schedule};

/// Summary of one fill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// Posts assigned by this run.
    pub assigned: usize,
    /// Fillable posts left empty.
    pub unfilled: usize,
    /// Hours filled as coupled pairs.
    pub coupled_pairs: usize,
}

/// Chosen group for one post.
struct Choice {
    group: usize,
    coupled_sibling: Option<usize>,
}

/// Greedy quota-driven allocator.
#[derive(Debug, Clone)]
pub struct FillAllocator<'a> {
    groups: &'a [Group],
    config: ScoringConfig,
}

impl<'a> FillAllocator<'a> {
    /// Creates an allocator over `groups`.
    pub fn new(groups: &'a [Group], config: ScoringConfig) -> Self {
        Self { groups, config }
    }

    /// Fills every fillable post of `schedule` that some group can take.
    pub fn run<R: Rng + ?Sized>(&self, schedule: &mut Schedule, rng: &mut R) -> FillOutcome {
        let mut outcome = FillOutcome::default();

        let candidates: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| {
                let usable = g.validate();
                if !usable {
                    tracing::warn!(group = %g.id, "Group has no single workload specifier, excluded from fill");
                }
                usable
            })
            .map(|(i, _)| i)
            .collect();

        let mut order: Vec<usize> = (0..schedule.slots.len())
            .filter(|&i| schedule.slots[i].is_fillable())
            .collect();
        if candidates.is_empty() || order.is_empty() {
            outcome.unfilled = order.len();
            return outcome;
        }

        let usable: Vec<&Group> = candidates.iter().map(|&i| &self.groups[i]).collect();
        let mut quota = QuotaPlan::compute(&usable, schedule);
        let mut ctx = ScheduleContext::build(schedule, self.groups, self.config);

        order.shuffle(rng);

        for &idx in &order {
            if !schedule.slots[idx].is_fillable() {
                // Taken as the sibling of a coupled pair.
                continue;
            }
            let Some(choice) = self.select(schedule, &ctx, &quota, &candidates, idx) else {
                continue;
            };

            let group = &self.groups[choice.group];
            let mut posts = vec![idx];
            posts.extend(choice.coupled_sibling);
            for &post in &posts {
                schedule.slots[post].group_id = Some(group.id.clone());
                ctx.record_assign(group, &schedule.slots[post]);
            }
            quota.record(&group.id, posts.len() as i64);
            outcome.assigned += posts.len();
            if choice.coupled_sibling.is_some() {
                outcome.coupled_pairs += 1;
            }
        }

        outcome.unfilled = order
            .iter()
            .filter(|&&i| schedule.slots[i].is_fillable())
            .count();
        outcome
    }

    fn select(
        &self,
        schedule: &Schedule,
        ctx: &ScheduleContext,
        quota: &QuotaPlan,
        candidates: &[usize],
        idx: usize,
    ) -> Option<Choice> {
        let slot = &schedule.slots[idx];
        let sibling = ctx.index().sibling_of(slot);
        let other = sibling.and_then(|i| schedule.slots[i].assigned_group());
        let sibling_fillable = sibling.is_some_and(|i| schedule.slots[i].is_fillable());

        let mut best: Option<(f64, Choice)> = None;
        for &gi in candidates {
            let group = &self.groups[gi];

            let coupled = group.forces_coupling(slot) && other.is_none();
            if coupled && !sibling_fillable {
                continue;
            }

            let view = ConstraintView::new(group, other, ctx.usage(), ctx.config())
                .proposed()
                .during_fill();
            if !group.is_available(slot, &view) {
                continue;
            }

            let mut score = quota.progress_score(&group.id, &self.config) + group.slot_score(slot, &view);
            if group.allows_simultaneous() && view.sibling_is_self() {
                score += self.config.simultaneous_continuity_bonus;
            }

            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                let choice = Choice {
                    group: gi,
                    coupled_sibling: if coupled { sibling } else { None },
                };
                best = Some((score, choice));
            }
        }
        best.map(|(_, choice)| choice)
    }
}
