//! Run scoring for the global Consecutive and Rest kinds.
//!
//! # Algorithm
//!
//! Walk the chronological hour sequence once. An hour is *active* for a
//! group if it holds either post or an activity window marks the hour
//! as committed. A maximal span of active hours is a run.
//!
//! - When a run closes, score its length `L` against the desired length
//!   `D` at its last hour: `L × bonus` if `L ≤ D`, otherwise
//!   `-(L - D)^exponent × multiplier`.
//! - When a new run opens, score the idle hours `R` since the previous
//!   run: `-(min - R) × rest_penalty` below the minimum, a flat
//!   `-short_rest_penalty` below the short threshold, `+long_rest_bonus`
//!   from the long threshold on, zero in between.
//!
//! Cost: O(hours in range).

use crate::config::ScoringConfig;
use crate::context::HourPoint;
use crate::models::{Group, TimeSlot};

/// Score of one closed run of `length` hours.
pub fn consecutive_score(length: u32, desired: u32, config: &ScoringConfig) -> f64 {
    if length <= desired {
        f64::from(length) * config.consecutive_bonus_per_hour
    } else {
        let excess = f64::from(length - desired);
        -excess.powf(config.consecutive_penalty_exponent) * config.consecutive_penalty_multiplier
    }
}

/// Score of `rest` idle hours between two runs.
pub fn rest_score(rest: f64, config: &ScoringConfig) -> f64 {
    if rest < config.min_rest_hours {
        -(config.min_rest_hours - rest) * config.rest_penalty
    } else if rest < config.short_rest_hours {
        -config.short_rest_penalty
    } else if rest >= config.long_rest_hours {
        config.long_rest_bonus
    } else {
        0.0
    }
}

/// Whether `group` is active at `point`.
#[inline]
pub fn is_active(group: &Group, point: &HourPoint, slots: &[TimeSlot]) -> bool {
    point.slot_indices().any(|i| slots[i].is_held_by(&group.id))
        || group.is_committed(point.day_of_week, point.hour)
}

/// Combined Consecutive + Rest score of `group` over `points`.
///
/// Returns zero for a group carrying neither kind.
pub fn run_score(
    group: &Group,
    points: &[HourPoint],
    slots: &[TimeSlot],
    config: &ScoringConfig,
) -> f64 {
    let score_runs = group.has_consecutive();
    let score_rest = group.has_rest();
    if !score_runs && !score_rest {
        return 0.0;
    }

    let mut score = 0.0;
    let mut run_len = 0u32;
    let mut prev_end: Option<usize> = None;

    let close = |end: usize, len: u32| -> f64 {
        if !score_runs {
            return 0.0;
        }
        let p = &points[end];
        consecutive_score(len, group.desired_run_length(p.date, p.hour), config)
    };

    for (i, point) in points.iter().enumerate() {
        if is_active(group, point, slots) {
            if run_len == 0 && score_rest {
                if let Some(end) = prev_end {
                    score += rest_score((i - end - 1) as f64, config);
                }
            }
            run_len += 1;
        } else if run_len > 0 {
            score += close(i - 1, run_len);
            prev_end = Some(i - 1);
            run_len = 0;
        }
    }
    if run_len > 0 {
        score += close(points.len() - 1, run_len);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SlotIndex, Timeline};
    use crate::models::{Schedule, StaffingException, SlotKey};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn place(schedule: &mut Schedule, date: NaiveDate, hours: std::ops::Range<u8>, id: &str) {
        for h in hours {
            let idx = schedule.index_of(&SlotKey::new(date, h, 1)).unwrap();
            schedule.slots[idx].group_id = Some(id.to_string());
        }
    }

    fn score_of(group: &Group, schedule: &Schedule) -> f64 {
        let index = SlotIndex::build(&schedule.slots);
        let tl = Timeline::build(schedule, &index);
        run_score(group, tl.points(), &schedule.slots, &ScoringConfig::default())
    }

    #[test]
    fn test_consecutive_score_curve() {
        let c = ScoringConfig::default();
        assert_eq!(consecutive_score(2, 2, &c), 40.0);
        assert_eq!(consecutive_score(3, 2, &c), -500.0);
        assert_eq!(consecutive_score(5, 2, &c), -4500.0);
    }

    #[test]
    fn test_rest_score_bands() {
        let c = ScoringConfig::default();
        assert_eq!(rest_score(0.0, &c), -6000.0);
        assert_eq!(rest_score(5.0, &c), -1000.0);
        assert_eq!(rest_score(6.0, &c), -300.0);
        assert_eq!(rest_score(15.0, &c), -300.0);
        assert_eq!(rest_score(16.0, &c), 0.0);
        assert_eq!(rest_score(23.0, &c), 0.0);
        assert_eq!(rest_score(24.0, &c), 100.0);
    }

    #[test]
    fn test_single_run() {
        let group = Group::new("A", "Alpha").with_staffing_size(4);
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        place(&mut s, d(7), 3..5, "A");
        // One run of 2 with desired 2, no rest gaps
        assert_eq!(score_of(&group, &s), 40.0);
    }

    #[test]
    fn test_two_runs_with_short_rest() {
        let group = Group::new("A", "Alpha").with_staffing_size(4);
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        place(&mut s, d(7), 0..2, "A");
        place(&mut s, d(7), 10..12, "A");
        // rest = 8 idle hours
        assert_eq!(score_of(&group, &s), 40.0 + 40.0 - 300.0);
    }

    #[test]
    fn test_run_across_midnight() {
        let group = Group::new("A", "Alpha").with_staffing_size(8);
        let mut s = Schedule::create_empty(d(7), d(8)).unwrap();
        place(&mut s, d(7), 22..24, "A");
        place(&mut s, d(8), 0..2, "A");
        // desired = 8 / 2 = 4, one run of 4
        assert_eq!(score_of(&group, &s), 80.0);
    }

    #[test]
    fn test_both_posts_count_once() {
        let group = Group::new("A", "Alpha").with_staffing_size(4);
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        for pos in [1, 2] {
            let idx = s.index_of(&SlotKey::new(d(7), 6, pos)).unwrap();
            s.slots[idx].group_id = Some("A".into());
        }
        assert_eq!(score_of(&group, &s), 20.0);
    }

    #[test]
    fn test_exception_changes_desired_length() {
        let group = Group::new("A", "Alpha")
            .with_staffing_size(4)
            .with_exception(StaffingException::new(d(7), 0, d(8), 0, 12));
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        place(&mut s, d(7), 0..6, "A");
        // desired = 12 / 2 = 6
        assert_eq!(score_of(&group, &s), 120.0);
    }

    #[test]
    fn test_committed_hours_extend_runs() {
        use crate::constraints::Constraint;
        use crate::models::WeeklyWindow;
        let group = Group::new("A", "Alpha")
            .with_staffing_size(4)
            .with_constraint(Constraint::activity_window(vec![WeeklyWindow::new(0, 5, 6)]));
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        place(&mut s, d(7), 3..5, "A");
        // 3..6 is one run of 3, desired 2
        assert_eq!(score_of(&group, &s), -500.0);
    }

    #[test]
    fn test_idle_group_scores_zero() {
        let group = Group::new("A", "Alpha").with_staffing_size(4);
        let s = Schedule::create_empty(d(7), d(7)).unwrap();
        assert_eq!(score_of(&group, &s), 0.0);
    }
}
