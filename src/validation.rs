//! Structural validation of roster inputs.
//!
//! Checks groups and schedule layout before scheduling. Detects:
//! - Duplicate group ids and duplicate slot keys
//! - Missing or conflicting workload specifiers
//! - Hour windows outside `0..=24` or empty
//! - Staffing exceptions that end before they start
//! - Slots outside the schedule range or with an invalid hour, post or weekday
//!
//! Hard-constraint violations of an assigned roster are reported by
//! [`Scheduler::validate`](crate::scheduler::Scheduler::validate) instead.

use std::collections::HashSet;

use crate::constraints::Constraint;
use crate::models::{day_of_week, Group, Schedule, POSTS_PER_HOUR};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same id or key.
    DuplicateId,
    /// A group has neither or both of staffing size and weekly quota.
    InvalidWorkload,
    /// An hour window is empty or leaves the day.
    InvalidWindow,
    /// A staffing exception ends before it starts or sets a zero size.
    InvalidException,
    /// The schedule does not hold exactly two posts per hour of its range.
    SlotCountMismatch,
    /// A slot has an hour, post, date or weekday that does not fit.
    InvalidSlot,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a group list.
///
/// Checks:
/// 1. No duplicate group ids
/// 2. Exactly one of `staffing_size` / `weekly_guard_quota`, and no zero staffing size
/// 3. Every weekly, date and staffing window satisfies `start < end <= 24` and `day < 7`
/// 4. Staffing exceptions end after they start and set a positive size
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_groups(groups: &[Group]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    for group in groups {
        if !ids.insert(group.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate group ID: {}", group.id),
            ));
        }

        match (group.staffing_size, group.weekly_guard_quota) {
            (Some(_), Some(_)) => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkload,
                format!("Group '{}' sets both staffing size and weekly quota", group.id),
            )),
            (None, None) => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkload,
                format!("Group '{}' sets neither staffing size nor weekly quota", group.id),
            )),
            (Some(0), None) => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkload,
                format!("Group '{}' has a zero staffing size", group.id),
            )),
            _ => {}
        }

        for (day, start, end) in windows(group) {
            if day.is_some_and(|d| d > 6) || start >= end || end > 24 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidWindow,
                    format!(
                        "Group '{}' has an invalid window: day {:?}, {}..{}",
                        group.id, day, start, end
                    ),
                ));
            }
        }

        for exc in &group.staffing_exceptions {
            if exc.end() < exc.start() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidException,
                    format!(
                        "Group '{}' has a staffing exception ending before it starts ({} {}:00 .. {} {}:00)",
                        group.id, exc.start_date, exc.start_hour, exc.end_date, exc.end_hour
                    ),
                ));
            }
            if exc.new_staffing_size == 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidException,
                    format!("Group '{}' has a staffing exception with zero size", group.id),
                ));
            }
        }
    }

    finish(errors)
}

/// `(day, start_hour, end_hour)` of every hour window of a group.
/// Date rules carry no weekday.
fn windows(group: &Group) -> Vec<(Option<u8>, u8, u8)> {
    let mut out = Vec::new();
    for constraint in &group.constraints {
        match constraint {
            Constraint::Unavailability(c) => {
                out.extend(c.rules.iter().map(|w| (Some(w.day), w.start_hour, w.end_hour)));
            }
            Constraint::ActivityWindow(c) => {
                out.extend(c.windows.iter().map(|w| (Some(w.day), w.start_hour, w.end_hour)));
            }
            Constraint::DateSpecific(c) => {
                out.extend(c.constraints.iter().map(|r| (None, r.start_hour, r.end_hour)));
            }
            Constraint::StaffingRules(c) => {
                out.extend(c.rules.iter().map(|r| (Some(r.day), r.start_hour, r.end_hour)));
            }
            Constraint::Simultaneous(_) | Constraint::Consecutive | Constraint::Rest => {}
        }
    }
    out
}

/// Validates the slot layout of a schedule.
///
/// Checks:
/// 1. Exactly `2 × 24 × days` slots
/// 2. No duplicate `(date, hour, position)` keys
/// 3. Hour below 24 and position 1 or 2
/// 4. Date inside the schedule range with a matching weekday
pub fn validate_layout(schedule: &Schedule) -> ValidationResult {
    let mut errors = Vec::new();

    let expected = schedule.days_in_range().max(0) as usize * 24 * POSTS_PER_HOUR;
    if schedule.slots.len() != expected {
        errors.push(ValidationError::new(
            ValidationErrorKind::SlotCountMismatch,
            format!(
                "Expected {} slots for {}..{}, found {}",
                expected,
                schedule.start_date,
                schedule.end_date,
                schedule.slots.len()
            ),
        ));
    }

    let mut keys = HashSet::new();
    for slot in &schedule.slots {
        let key = slot.key();
        if !keys.insert(key) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate slot: {key}"),
            ));
        }
        if slot.hour >= 24 || !(1..=POSTS_PER_HOUR).contains(&usize::from(slot.position)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidSlot,
                format!("Slot {key} has an invalid hour or post"),
            ));
        }
        if !schedule.contains_date(slot.date) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidSlot,
                format!("Slot {key} lies outside the schedule range"),
            ));
        }
        if slot.day_of_week != day_of_week(slot.date) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidSlot,
                format!(
                    "Slot {key} has weekday {} but its date falls on {}",
                    slot.day_of_week,
                    day_of_week(slot.date)
                ),
            ));
        }
    }

    finish(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRule, StaffingException, StaffingRule, WeeklyWindow};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn kinds(result: ValidationResult) -> Vec<ValidationErrorKind> {
        result.unwrap_err().into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_valid_groups() {
        let groups = vec![
            Group::new("A", "a").with_staffing_size(4),
            Group::new("B", "b")
                .with_weekly_quota(10)
                .with_constraint(Constraint::unavailability(vec![WeeklyWindow::new(0, 0, 24)])),
        ];
        assert!(validate_groups(&groups).is_ok());
    }

    #[test]
    fn test_duplicate_group_id() {
        let groups = vec![
            Group::new("A", "a").with_staffing_size(4),
            Group::new("A", "again").with_staffing_size(2),
        ];
        assert_eq!(kinds(validate_groups(&groups)), vec![ValidationErrorKind::DuplicateId]);
    }

    #[test]
    fn test_workload_specifiers() {
        let groups = vec![
            Group::new("A", "a"),
            Group::new("B", "b").with_staffing_size(2).with_weekly_quota(3),
            Group::new("C", "c").with_staffing_size(0),
        ];
        let errors = validate_groups(&groups).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.kind == ValidationErrorKind::InvalidWorkload));
    }

    #[test]
    fn test_invalid_windows() {
        let groups = vec![Group::new("A", "a")
            .with_staffing_size(4)
            .with_constraint(Constraint::unavailability(vec![WeeklyWindow::new(7, 0, 6)]))
            .with_constraint(Constraint::activity_window(vec![WeeklyWindow::new(1, 10, 10)]))
            .with_constraint(Constraint::date_specific(vec![DateRule::unavailable(vec![d(8)], 5, 25)]))
            .with_constraint(Constraint::staffing(vec![StaffingRule::new(2, 8, 4)]))];
        assert_eq!(
            kinds(validate_groups(&groups)),
            vec![ValidationErrorKind::InvalidWindow; 4]
        );
    }

    #[test]
    fn test_invalid_exception() {
        let groups = vec![Group::new("A", "a")
            .with_staffing_size(4)
            .with_exception(StaffingException::new(d(9), 0, d(8), 0, 2))
            .with_exception(StaffingException::new(d(8), 0, d(9), 0, 0))];
        assert_eq!(
            kinds(validate_groups(&groups)),
            vec![ValidationErrorKind::InvalidException; 2]
        );
    }

    #[test]
    fn test_layout_of_fresh_schedule() {
        let s = Schedule::create_empty(d(7), d(13)).unwrap();
        assert!(validate_layout(&s).is_ok());
    }

    #[test]
    fn test_layout_problems() {
        let mut s = Schedule::create_empty(d(7), d(7)).unwrap();
        let dup = s.slots[0].clone();
        s.slots[1].position = 3;
        s.slots[2].day_of_week = 4;
        s.slots[3].date = d(20);
        s.slots[3].day_of_week = day_of_week(d(20));
        s.slots.push(dup);

        let kinds = kinds(validate_layout(&s));
        assert!(kinds.contains(&ValidationErrorKind::SlotCountMismatch));
        assert!(kinds.contains(&ValidationErrorKind::DuplicateId));
        assert_eq!(
            kinds.iter().filter(|k| **k == ValidationErrorKind::InvalidSlot).count(),
            3
        );
    }
}
