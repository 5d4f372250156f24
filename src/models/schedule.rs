//! Schedule model.
//!
//! A schedule is a date range plus every post slot in it: 24 hours × 2
//! posts per day, generated eagerly by [`Schedule::create_empty`].
//! Manual edits (`set_slot`, `assign`, `swap_slots`, `disable_slot`) act
//! directly on the slots; together with
//! [`Scheduler::validate`](crate::scheduler::Scheduler::validate) they
//! form the propose / validate / roll back protocol for hand edits.
//!
//! # Persisted Format
//!
//! ```json
//! {"start_date": "2024-01-07", "end_date": "2024-01-13",
//!  "slots": [{"date": "2024-01-07", "day_of_week": 0, "hour": 0,
//!             "position": 1, "group_id": null, "is_locked": false}]}
//! ```
//!
//! Single-week documents carrying `week_start_date` and a `day` index per
//! slot are upgraded to dated slots on load.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{SlotKey, TimeSlot, DISABLED_GROUP_ID};
use crate::error::RosterError;

/// Weekday number with Sunday = 0.
#[inline]
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A planning range with all of its post slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord")]
pub struct Schedule {
    /// First date (inclusive).
    pub start_date: NaiveDate,
    /// Last date (inclusive).
    pub end_date: NaiveDate,
    /// Post slots, ordered by date, hour, position when created here.
    pub slots: Vec<TimeSlot>,
}

/// A hard-constraint breach found in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Offending group.
    pub group_id: String,
    /// Offending slot.
    pub slot: SlotKey,
    /// Human-readable description.
    pub message: String,
}

/// Classification of hard-constraint breaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// Weekly unavailability.
    Unavailable,
    /// Date-specific exclusion or outside a date's permitted windows.
    DateRestricted,
    /// Staffing rule capacity exceeded.
    CapacityExceeded,
    /// Coupled hour held by two different groups.
    CouplingBroken,
    /// Both posts held by a group that may not guard simultaneously.
    SimultaneousForbidden,
    /// Slot holds an id that matches no group.
    UnknownGroup,
}

impl ViolationType {
    /// Short description.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Unavailable => "is unavailable at this hour",
            Self::DateRestricted => "is restricted on this date",
            Self::CapacityExceeded => "exceeds a staffing rule capacity",
            Self::CouplingBroken => "breaks a coupled hour",
            Self::SimultaneousForbidden => "may not hold both posts",
            Self::UnknownGroup => "is not a known group",
        }
    }
}

impl Violation {
    /// Creates a violation with a generated message.
    pub fn new(violation_type: ViolationType, group_id: impl Into<String>, slot: SlotKey) -> Self {
        let group_id = group_id.into();
        let message = format!("{slot}: group '{group_id}' {}", violation_type.describe());
        Self {
            violation_type,
            group_id,
            slot,
            message,
        }
    }
}

impl Schedule {
    /// Creates a schedule with every post of every hour empty.
    ///
    /// # Errors
    /// [`RosterError::InvalidRange`] if `end < start`.
    pub fn create_empty(start: NaiveDate, end: NaiveDate) -> Result<Self, RosterError> {
        if end < start {
            return Err(RosterError::InvalidRange { start, end });
        }
        let mut schedule = Self {
            start_date: start,
            end_date: end,
            slots: Vec::new(),
        };
        let slots: Vec<TimeSlot> = schedule
            .dates()
            .flat_map(|date| {
                let dow = day_of_week(date);
                (0..24u8).flat_map(move |hour| [1u8, 2].map(|pos| TimeSlot::new(date, dow, hour, pos)))
            })
            .collect();
        schedule.slots = slots;
        Ok(schedule)
    }

    /// Parses `YYYY-MM-DD` bounds and creates an empty schedule.
    pub fn create_empty_str(start: &str, end: &str) -> Result<Self, RosterError> {
        use crate::error::parse_date;
        Self::create_empty(parse_date(start)?, parse_date(end)?)
    }

    /// Dates of the range in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d <= end)
    }

    /// Number of days in the range (inclusive).
    pub fn days_in_range(&self) -> i64 {
        ((self.end_date - self.start_date).num_days() + 1).max(0)
    }

    /// Whether `date` lies in the range.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    // ================================
    // Lookup
    // ================================

    /// Position of the slot with `key` in `slots`.
    pub fn index_of(&self, key: &SlotKey) -> Option<usize> {
        self.slots.iter().position(|s| s.key() == *key)
    }

    /// Slot at `(date, hour, position)`.
    pub fn get_slot(&self, date: NaiveDate, hour: u8, position: u8) -> Option<&TimeSlot> {
        let key = SlotKey::new(date, hour, position);
        self.slots.iter().find(|s| s.key() == key)
    }

    /// Mutable slot at `(date, hour, position)`.
    pub fn get_slot_mut(&mut self, date: NaiveDate, hour: u8, position: u8) -> Option<&mut TimeSlot> {
        let key = SlotKey::new(date, hour, position);
        self.slots.iter_mut().find(|s| s.key() == key)
    }

    fn slot_mut(&mut self, key: &SlotKey) -> Result<&mut TimeSlot, RosterError> {
        self.slots
            .iter_mut()
            .find(|s| s.key() == *key)
            .ok_or(RosterError::SlotNotFound(*key))
    }

    // ================================
    // Manual edits
    // ================================

    /// Sets a slot's group and lock flag. Returns `false` if no such slot.
    pub fn set_slot(
        &mut self,
        date: NaiveDate,
        hour: u8,
        position: u8,
        group_id: Option<String>,
        lock: bool,
    ) -> bool {
        match self.get_slot_mut(date, hour, position) {
            Some(slot) => {
                slot.group_id = group_id;
                slot.is_locked = lock;
                true
            }
            None => false,
        }
    }

    /// Replaces a slot's group and returns the previous one.
    pub fn assign(
        &mut self,
        key: &SlotKey,
        group_id: Option<String>,
    ) -> Result<Option<String>, RosterError> {
        let slot = self.slot_mut(key)?;
        Ok(std::mem::replace(&mut slot.group_id, group_id))
    }

    /// Exchanges the groups of two slots. Lock flags stay in place.
    pub fn swap_slots(&mut self, a: &SlotKey, b: &SlotKey) -> Result<(), RosterError> {
        let ia = self.index_of(a).ok_or(RosterError::SlotNotFound(*a))?;
        let ib = self.index_of(b).ok_or(RosterError::SlotNotFound(*b))?;
        if ia != ib {
            let taken = self.slots[ia].group_id.take();
            self.slots[ia].group_id = std::mem::replace(&mut self.slots[ib].group_id, taken);
        }
        Ok(())
    }

    /// Takes a post out of rotation and returns its previous group.
    pub fn disable_slot(&mut self, key: &SlotKey) -> Result<Option<String>, RosterError> {
        self.assign(key, Some(DISABLED_GROUP_ID.to_string()))
    }

    /// Number of posts held by `group_id`.
    pub fn count_assigned(&self, group_id: &str) -> usize {
        self.slots.iter().filter(|s| s.is_held_by(group_id)).count()
    }

    // ================================
    // Persistence
    // ================================

    /// Loads a schedule (either format) from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, RosterError> {
        let record: ScheduleRecord = serde_json::from_str(s)?;
        Self::try_from(record)
    }

    /// Serializes to pretty JSON in the dated format.
    pub fn to_json_string(&self) -> Result<String, RosterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Deserialize)]
struct SlotRecord {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    day_of_week: Option<u8>,
    #[serde(default)]
    day: Option<u8>,
    hour: u8,
    position: u8,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    is_locked: bool,
}

#[derive(Deserialize)]
struct ScheduleRecord {
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    week_start_date: Option<NaiveDate>,
    #[serde(default)]
    slots: Vec<SlotRecord>,
}

impl TryFrom<ScheduleRecord> for Schedule {
    type Error = RosterError;

    fn try_from(record: ScheduleRecord) -> Result<Self, Self::Error> {
        if let Some(start) = record.start_date {
            let end = record.end_date.ok_or(RosterError::MissingField("end_date"))?;
            if end < start {
                return Err(RosterError::InvalidRange { start, end });
            }
            let slots = record
                .slots
                .into_iter()
                .map(|s| {
                    let date = s.date.ok_or(RosterError::MissingField("date"))?;
                    let dow = s.day_of_week.or(s.day).unwrap_or_else(|| day_of_week(date));
                    Ok(TimeSlot {
                        date,
                        day_of_week: dow,
                        hour: s.hour,
                        position: s.position,
                        group_id: s.group_id,
                        is_locked: s.is_locked,
                    })
                })
                .collect::<Result<Vec<_>, RosterError>>()?;
            return Ok(Self {
                start_date: start,
                end_date: end,
                slots,
            });
        }

        let start = record
            .week_start_date
            .ok_or(RosterError::MissingField("start_date"))?;
        let slots = record
            .slots
            .into_iter()
            .map(|s| {
                let offset = s.day.or(s.day_of_week).unwrap_or(0);
                let date = start + Duration::days(i64::from(offset));
                TimeSlot {
                    date,
                    day_of_week: day_of_week(date),
                    hour: s.hour,
                    position: s.position,
                    group_id: s.group_id,
                    is_locked: s.is_locked,
                }
            })
            .collect();
        tracing::debug!(%start, "Upgraded single-week schedule");
        Ok(Self {
            start_date: start,
            end_date: start + Duration::days(6),
            slots,
        })
    }
}
