//! Rostering domain models.
//!
//! Value types for guard-duty planning: the hour-range rules attached to
//! groups, post slots, groups and the schedule that holds the slots.
//!
//! # Vocabulary
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`TimeSlot`] | one guard post for one hour (two posts per hour) |
//! | [`Group`] | a crew assigned to posts |
//! | [`Schedule`] | a date range plus all of its slots |
//! | [`WeeklyWindow`] | a recurring weekday hour range |
//! | [`DateRule`] | an hour range on specific calendar dates |
//! | [`StaffingRule`] | capacity cap and/or coupling for a weekday hour range |
//! | [`StaffingException`] | a time-ranged staffing size override |

mod group;
mod schedule;
mod slot;
pub(crate) mod window;

pub use group::{load_groups, save_groups, Group, Workload, DEFAULT_STAFFING_SIZE, MIN_RUN_LENGTH};
pub use schedule::{day_of_week, Schedule, Violation, ViolationType};
pub use slot::{sibling_position, SlotKey, TimeSlot, DISABLED_GROUP_ID, POSTS_PER_HOUR};
pub use window::{DateRule, StaffingException, StaffingRule, WeeklyWindow};
