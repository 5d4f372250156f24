//! End-to-end roster scenarios: fill, optimize, validate and persistence.

use std::ops::ControlFlow;

use chrono::NaiveDate;
use u_roster::config::ScoringConfig;
use u_roster::constraints::Constraint;
use u_roster::models::{
    load_groups, save_groups, DateRule, Group, Schedule, SlotKey, StaffingException,
    StaffingRule, WeeklyWindow,
};
use u_roster::scheduler::{OptimizeOptions, Scheduler};
use u_roster::validation::{validate_groups, validate_layout};
use u_roster::RosterError;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// 2024-01-07 (Sunday) through 2024-01-13.
fn week() -> Schedule {
    Schedule::create_empty(d(7), d(13)).unwrap()
}

fn mixed_groups() -> Vec<Group> {
    vec![
        Group::new("A", "Alpha")
            .with_staffing_size(4)
            .with_constraint(Constraint::staffing(vec![
                StaffingRule::new(1, 20, 24).with_coupling()
            ])),
        Group::new("B", "Bravo")
            .with_staffing_size(3)
            .with_simultaneous(false)
            .with_constraint(Constraint::unavailability(vec![
                WeeklyWindow::new(0, 0, 6),
                WeeklyWindow::new(2, 12, 18),
            ])),
        Group::new("C", "Charlie")
            .with_weekly_quota(20)
            .with_constraint(Constraint::activity_window(vec![WeeklyWindow::new(
                3, 8, 16,
            )])),
    ]
}

// ================================
// Fill
// ================================

#[test]
fn test_quota_and_proportional_split() {
    let scheduler = Scheduler::new(vec![
        Group::new("A", "Alpha").with_staffing_size(4),
        Group::new("B", "Bravo").with_weekly_quota(10),
    ])
    .with_seed(2024);
    let mut s = week();
    assert_eq!(s.slots.len(), 336);

    let outcome = scheduler.fill(&mut s);
    assert_eq!(outcome.assigned, 336);
    assert_eq!(s.count_assigned("B"), 10);
    assert_eq!(s.count_assigned("A"), 326);
}

#[test]
fn test_weekly_unavailability_respected() {
    let groups = vec![
        Group::new("X", "Xray")
            .with_staffing_size(4)
            .with_constraint(Constraint::unavailability(vec![WeeklyWindow::new(0, 0, 6)])),
        Group::new("Y", "Yankee").with_staffing_size(4),
    ];
    for seed in [1, 2, 3] {
        let scheduler = Scheduler::new(groups.clone()).with_seed(seed);
        let mut s = Schedule::create_empty(d(7), d(20)).unwrap();
        scheduler.fill(&mut s);
        assert!(s
            .slots
            .iter()
            .filter(|slot| slot.day_of_week == 0 && slot.hour < 6)
            .all(|slot| !slot.is_held_by("X")));
        assert!(scheduler.validate(&s).is_empty());
    }
}

#[test]
fn test_positive_date_rule_lifts_weekly_block() {
    let scheduler = Scheduler::new(vec![Group::new("X", "Xray")
        .with_staffing_size(4)
        .with_constraint(Constraint::unavailability(vec![WeeklyWindow::new(0, 0, 24)]))
        .with_constraint(Constraint::date_specific(vec![DateRule::available(
            vec![d(7)],
            8,
            12,
        )]))])
    .with_seed(5);
    let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
    scheduler.fill(&mut s);

    for slot in &s.slots {
        assert_eq!(slot.is_held_by("X"), (8..12).contains(&slot.hour));
    }
}

#[test]
fn test_coupled_hours_never_split() {
    for seed in [11, 12, 13, 14] {
        let scheduler = Scheduler::new(mixed_groups()).with_seed(seed);
        let mut s = week();
        scheduler.fill(&mut s);

        for hour in 20..24 {
            let p1 = s.get_slot(d(8), hour, 1).unwrap().assigned_group();
            let p2 = s.get_slot(d(8), hour, 2).unwrap().assigned_group();
            if p1 == Some("A") || p2 == Some("A") {
                assert!(p1 == p2 || p1.is_none() || p2.is_none(), "seed {seed} hour {hour}");
            }
        }
    }
}

#[test]
fn test_capacity_never_exceeded() {
    let groups = vec![
        Group::new("A", "Alpha")
            .with_staffing_size(6)
            .with_constraint(Constraint::staffing(vec![
                StaffingRule::new(0, 0, 24).with_capacity(5)
            ])),
        Group::new("B", "Bravo").with_staffing_size(2),
    ];
    let scheduler = Scheduler::new(groups).with_seed(8);
    let mut s = week();
    scheduler.fill(&mut s);
    let sunday = |s: &Schedule| {
        s.slots
            .iter()
            .filter(|x| x.day_of_week == 0 && x.is_held_by("A"))
            .count()
    };
    assert!(sunday(&s) <= 5);

    scheduler.optimize(&mut s, &OptimizeOptions::default().with_passes(2), None);
    assert!(sunday(&s) <= 5);
    assert!(scheduler.validate(&s).is_empty());
}

#[test]
fn test_coupled_pairs_respect_overlapping_cap() {
    let groups = vec![
        Group::new("A", "Alpha")
            .with_staffing_size(8)
            .with_constraint(Constraint::staffing(vec![
                StaffingRule::new(0, 20, 24).with_coupling(),
                StaffingRule::new(0, 0, 24).with_capacity(5),
            ])),
        Group::new("B", "Bravo").with_staffing_size(1),
    ];
    for seed in 0..200 {
        let scheduler = Scheduler::new(groups.clone()).with_seed(seed);
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        scheduler.fill(&mut s);
        assert!(s.count_assigned("A") <= 5, "seed {seed}: {} posts", s.count_assigned("A"));
        assert!(scheduler.validate(&s).is_empty(), "seed {seed}");
    }
}

#[test]
fn test_staffing_exception_changes_run_length() {
    let group = Group::new("A", "Alpha")
        .with_staffing_size(4)
        .with_exception(StaffingException::new(d(8), 0, d(9), 0, 12));
    assert_eq!(group.desired_run_length(d(7), 10), 2);
    assert_eq!(group.desired_run_length(d(8), 10), 6);
    assert_eq!(group.desired_run_length(d(9), 0), 2);
}

// ================================
// Optimize
// ================================

#[test]
fn test_optimize_is_monotone_and_feasible() {
    for seed in [21, 22, 23] {
        let scheduler = Scheduler::new(mixed_groups()).with_seed(seed);
        let mut s = Schedule::create_empty(d(7), d(9)).unwrap();
        scheduler.fill(&mut s);
        assert!(scheduler.validate(&s).is_empty(), "fill infeasible for seed {seed}");

        let mut last = scheduler.score(&s);
        for _ in 0..2 {
            let outcome = scheduler.optimize(&mut s, &OptimizeOptions::default(), None);
            assert!(outcome.score_after >= last);
            last = outcome.score_after;
            assert!(scheduler.validate(&s).is_empty(), "optimize infeasible for seed {seed}");
        }
    }
}

#[test]
fn test_optimize_keeps_locked_and_disabled_posts() {
    let scheduler = Scheduler::new(mixed_groups()).with_seed(3);
    let mut s = Schedule::create_empty(d(7), d(8)).unwrap();
    s.set_slot(d(7), 10, 1, Some("C".into()), true);
    s.disable_slot(&SlotKey::new(d(7), 11, 2)).unwrap();
    scheduler.fill(&mut s);
    scheduler.optimize(&mut s, &OptimizeOptions::default(), None);

    let locked = s.get_slot(d(7), 10, 1).unwrap();
    assert!(locked.is_locked && locked.is_held_by("C"));
    assert!(s.get_slot(d(7), 11, 2).unwrap().is_disabled());
}

#[test]
fn test_optimize_can_be_stopped() {
    let scheduler = Scheduler::new(mixed_groups()).with_seed(4);
    let mut s = Schedule::create_empty(d(7), d(8)).unwrap();
    scheduler.fill(&mut s);

    let mut calls = 0;
    let mut stop_early = |_pct: f64| {
        calls += 1;
        if calls >= 5 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };
    let outcome = scheduler.optimize(&mut s, &OptimizeOptions::default(), Some(&mut stop_early));
    assert_eq!(calls, 5);
    assert!(outcome.score_after >= outcome.score_before);
    assert!(scheduler.validate(&s).is_empty());
}

// ================================
// Manual edits
// ================================

#[test]
fn test_manual_swap_rejected_and_rolled_back() {
    let groups = vec![
        Group::new("A", "Alpha").with_staffing_size(4),
        Group::new("B", "Bravo").with_staffing_size(4).with_simultaneous(false),
    ];
    let scheduler = Scheduler::new(groups);
    let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
    s.assign(&SlotKey::new(d(7), 3, 1), Some("B".into())).unwrap();
    s.assign(&SlotKey::new(d(7), 3, 2), Some("A".into())).unwrap();
    s.assign(&SlotKey::new(d(7), 5, 2), Some("B".into())).unwrap();
    assert!(scheduler.validate(&s).is_empty());
    let snapshot = s.clone();

    let a = SlotKey::new(d(7), 3, 2);
    let b = SlotKey::new(d(7), 5, 2);
    s.swap_slots(&a, &b).unwrap();
    let messages = scheduler.validate(&s);
    assert!(!messages.is_empty());

    s.swap_slots(&a, &b).unwrap();
    assert_eq!(s, snapshot);
    assert!(scheduler.validate(&s).is_empty());
}

#[test]
fn test_validate_reports_each_broken_rule() {
    let scheduler = Scheduler::new(vec![Group::new("B", "Bravo")
        .with_staffing_size(4)
        .with_simultaneous(false)
        .with_constraint(Constraint::unavailability(vec![WeeklyWindow::new(0, 0, 6)]))]);
    let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
    s.assign(&SlotKey::new(d(7), 3, 1), Some("B".into())).unwrap();
    s.assign(&SlotKey::new(d(7), 3, 2), Some("B".into())).unwrap();

    let messages = scheduler.validate(&s);
    assert_eq!(messages.len(), 4);
    assert_eq!(messages.iter().filter(|m| m.contains("may not hold both posts")).count(), 2);
    assert_eq!(messages.iter().filter(|m| m.contains("is unavailable")).count(), 2);
}

#[test]
fn test_unknown_group_reported() {
    let scheduler = Scheduler::new(vec![Group::new("A", "Alpha").with_staffing_size(4)]);
    let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
    s.assign(&SlotKey::new(d(7), 0, 1), Some("ghost".into())).unwrap();
    let messages = scheduler.validate(&s);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("ghost"));
}

#[test]
fn test_edit_missing_slot_is_error() {
    let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
    let outside = SlotKey::new(d(9), 0, 1);
    assert!(matches!(
        s.assign(&outside, Some("A".into())),
        Err(RosterError::SlotNotFound(_))
    ));
}

// ================================
// Persistence
// ================================

#[test]
fn test_groups_round_trip() {
    let groups = mixed_groups();
    let text = save_groups(&groups).unwrap();
    let loaded = load_groups(&text).unwrap();
    assert_eq!(loaded, groups);
}

#[test]
fn test_every_constraint_kind_round_trips() {
    let group = Group::new("A", "Alpha")
        .with_staffing_size(4)
        .with_simultaneous(false)
        .with_constraint(Constraint::unavailability(vec![WeeklyWindow::new(0, 0, 6)]))
        .with_constraint(Constraint::activity_window(vec![WeeklyWindow::new(1, 9, 17)]))
        .with_constraint(Constraint::date_specific(vec![
            DateRule::unavailable(vec![d(8), d(9)], 0, 24),
            DateRule::available(vec![d(7)], 10, 14),
        ]))
        .with_constraint(Constraint::staffing(vec![
            StaffingRule::new(5, 0, 12).with_capacity(3).with_coupling()
        ]))
        .with_exception(StaffingException::new(d(7), 6, d(8), 6, 2))
        .with_color("#abcdef");

    let loaded = Group::from_value(group.to_value().unwrap()).unwrap();
    assert_eq!(loaded, group);
    assert_eq!(loaded.constraints.len(), 7);
}

#[test]
fn test_unknown_constraint_type_is_fatal() {
    let text = r#"{"id": "A", "name": "Alpha", "staffing_size": 4,
        "constraints": [{"type": "moon_phase"}]}"#;
    let err = Group::from_json_str(text).unwrap_err();
    assert!(matches!(err, RosterError::UnknownConstraintType(tag) if tag == "moon_phase"));
}

#[test]
fn test_malformed_constraint_is_skipped() {
    let text = r#"{"id": "A", "name": "Alpha", "staffing_size": 4,
        "constraints": [{"type": "unavailability", "rules": "nope"},
                        {"type": "rest"}]}"#;
    let group = Group::from_json_str(text).unwrap();
    assert!(group.has_rest());
    assert!(!group
        .constraints
        .iter()
        .any(|c| matches!(c, Constraint::Unavailability(_))));
}

#[test]
fn test_legacy_group_migrated() {
    let text = r#"{"id": "L", "name": "Legacy", "staffing_size": 3,
        "hard_unavailability_rules": [{"day": 0, "start_hour": 0, "end_hour": 6}],
        "staffing_rules": [{"day": 5, "start_hour": 20, "end_hour": 24, "force_coupling": true}]}"#;
    let group = Group::from_json_str(text).unwrap();
    let tags: Vec<_> = group.constraints.iter().map(Constraint::type_tag).collect();
    assert!(tags.contains(&"unavailability"));
    assert!(tags.contains(&"staffing_rules"));
    assert!(group.has_consecutive() && group.has_rest());
    assert!(group.color.starts_with('#'));
}

#[test]
fn test_schedule_round_trip() {
    let scheduler = Scheduler::new(mixed_groups()).with_seed(6);
    let mut s = Schedule::create_empty(d(7), d(8)).unwrap();
    s.set_slot(d(7), 1, 1, Some("B".into()), true);
    scheduler.fill(&mut s);

    let loaded = Schedule::from_json_str(&s.to_json_string().unwrap()).unwrap();
    assert_eq!(loaded, s);
    assert!(validate_layout(&loaded).is_ok());
}

#[test]
fn test_legacy_week_schedule_upgraded() {
    let text = r#"{"week_start_date": "2024-01-07",
        "slots": [{"day": 1, "hour": 0, "position": 1, "group_id": "A", "is_locked": true},
                  {"day": 6, "hour": 23, "position": 2, "group_id": null}]}"#;
    let s = Schedule::from_json_str(text).unwrap();
    assert_eq!(s.start_date, d(7));
    assert_eq!(s.end_date, d(13));
    assert_eq!(s.slots[0].date, d(8));
    assert_eq!(s.slots[0].day_of_week, 1);
    assert!(s.slots[0].is_locked);
    assert_eq!(s.slots[1].date, d(13));
    assert_eq!(s.slots[1].day_of_week, 6);
}

#[test]
fn test_config_overrides_change_scores() {
    let cfg = ScoringConfig::from_toml_str("SIMULTANEOUS_BONUS = 0\nconsecutive_bonus_per_hour = 0")
        .unwrap();
    let scheduler = Scheduler::new(vec![Group::new("A", "Alpha").with_staffing_size(4)])
        .with_config(cfg);
    let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
    s.assign(&SlotKey::new(d(7), 0, 1), Some("A".into())).unwrap();
    s.assign(&SlotKey::new(d(7), 0, 2), Some("A".into())).unwrap();
    assert_eq!(scheduler.score(&s), 0.0);
}

#[test]
fn test_structural_validation_of_inputs() {
    assert!(validate_groups(&mixed_groups()).is_ok());
    assert!(validate_layout(&week()).is_ok());
}
