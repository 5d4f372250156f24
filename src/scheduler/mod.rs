//! Roster construction and improvement.
//!
//! [`Scheduler`] bundles the groups, scoring weights and an optional seed,
//! and exposes the four operations a caller needs:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `fill` | Greedy quota-driven assignment of every empty post |
//! | `optimize` | Best-improvement exchange search, never lowers the score |
//! | `validate` | One message per hard-constraint violation |
//! | `score` | Consecutive + Rest + Simultaneous total |
//!
//! Manual edits follow a propose/validate/rollback protocol: edit the
//! [`Schedule`] directly, call `validate`, and undo the edit if the list
//! is not empty.
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Aarts & Lenstra (2003), "Local Search in Combinatorial Optimization"

mod fill;
mod optimize;
mod quota;
mod state;
mod stats;

pub use fill::{FillAllocator, FillOutcome};
pub use optimize::{LocalSearch, OptimizeOptions, OptimizeOutcome, ProgressFn};
pub use quota::QuotaPlan;
pub use state::{ScheduleState, ScoreCache};
pub use stats::{GroupStats, RosterStats};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::ScoringConfig;
use crate::models::{Group, Schedule, Violation};

/// Entry point for fill, optimize and validation.
#[derive(Debug, Clone)]
pub struct Scheduler {
    groups: Vec<Group>,
    config: ScoringConfig,
    seed: Option<u64>,
}

impl Scheduler {
    /// Creates a scheduler with default weights and an OS-seeded shuffle.
    pub fn new(groups: Vec<Group>) -> Self {
        Self {
            groups,
            config: ScoringConfig::default(),
            seed: None,
        }
    }

    /// Sets the scoring weights.
    pub fn with_config(mut self, config: ScoringConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes fills reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Groups in input order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Scoring weights.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Assigns every empty, unlocked post that some group can take.
    #[tracing::instrument(skip_all, fields(slots = schedule.slots.len()))]
    pub fn fill(&self, schedule: &mut Schedule) -> FillOutcome {
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let outcome = FillAllocator::new(&self.groups, self.config).run(schedule, &mut rng);
        tracing::info!(
            assigned = outcome.assigned,
            unfilled = outcome.unfilled,
            coupled_pairs = outcome.coupled_pairs,
            "Fill complete"
        );
        outcome
    }

    /// Improves `schedule` in place without lowering its score.
    ///
    /// `progress` receives the percentage of hour buckets processed and
    /// may return `ControlFlow::Break` to stop after the current bucket.
    #[tracing::instrument(skip_all, fields(passes = options.passes))]
    pub fn optimize(
        &self,
        schedule: &mut Schedule,
        options: &OptimizeOptions,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> OptimizeOutcome {
        let outcome = LocalSearch::new(&self.groups, self.config)
            .with_options(*options)
            .run(schedule, progress);
        tracing::info!(
            moves = outcome.moves_committed,
            before = outcome.score_before,
            after = outcome.score_after,
            "Optimization complete"
        );
        outcome
    }

    /// Hard-constraint violations in slot order.
    pub fn violations(&self, schedule: &Schedule) -> Vec<Violation> {
        ScheduleState::new(schedule, &self.groups, self.config).violations(&schedule.slots)
    }

    /// One human-readable message per hard-constraint violation.
    pub fn validate(&self, schedule: &Schedule) -> Vec<String> {
        self.violations(schedule)
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    /// Total score: Consecutive + Rest over all groups plus Simultaneous.
    pub fn score(&self, schedule: &Schedule) -> f64 {
        ScheduleState::new(schedule, &self.groups, self.config).total_score(&schedule.slots)
    }

    /// Coverage and quota statistics.
    pub fn stats(&self, schedule: &Schedule) -> RosterStats {
        RosterStats::calculate(schedule, &self.groups)
    }
}
