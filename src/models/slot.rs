//! Time slot (guard post) model.
//!
//! Every hour has two simultaneous posts, `position` 1 and 2. A slot is
//! identified by `(date, hour, position)`; its assignment and lock flag
//! are mutable.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel group id marking a post taken out of rotation.
///
/// Disabled posts are never filled, swapped, scored or counted in quotas.
pub const DISABLED_GROUP_ID: &str = "__disabled__";

/// Number of posts per hour.
pub const POSTS_PER_HOUR: usize = 2;

/// Identity of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub hour: u8,
    pub position: u8,
}

impl SlotKey {
    /// Creates a key.
    pub fn new(date: NaiveDate, hour: u8, position: u8) -> Self {
        Self {
            date,
            hour,
            position,
        }
    }

    /// Key of the other post in the same hour.
    pub fn sibling(&self) -> Self {
        Self {
            position: sibling_position(self.position),
            ..*self
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:00 post {}", self.date, self.hour, self.position)
    }
}

/// The other post number (1 ↔ 2).
#[inline]
pub fn sibling_position(position: u8) -> u8 {
    if position == 1 {
        2
    } else {
        1
    }
}

/// One guard post for one hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Calendar date.
    pub date: NaiveDate,
    /// Day of week (0 = Sunday).
    pub day_of_week: u8,
    /// Hour of day (0..24).
    pub hour: u8,
    /// Post number (1 or 2).
    pub position: u8,
    /// Assigned group, or the disabled sentinel.
    pub group_id: Option<String>,
    /// Locked slots are never changed by fill or optimize.
    #[serde(default)]
    pub is_locked: bool,
}

impl TimeSlot {
    /// Creates an empty, unlocked slot.
    pub fn new(date: NaiveDate, day_of_week: u8, hour: u8, position: u8) -> Self {
        Self {
            date,
            day_of_week,
            hour,
            position,
            group_id: None,
            is_locked: false,
        }
    }

    /// Identity key.
    #[inline]
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.date, self.hour, self.position)
    }

    /// Whether the post is taken out of rotation.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.group_id.as_deref() == Some(DISABLED_GROUP_ID)
    }

    /// Whether the post has no group and is not disabled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.group_id.is_none()
    }

    /// Assigned group id, excluding the disabled sentinel.
    #[inline]
    pub fn assigned_group(&self) -> Option<&str> {
        match self.group_id.as_deref() {
            Some(DISABLED_GROUP_ID) | None => None,
            Some(id) => Some(id),
        }
    }

    /// Whether `group_id` holds this post.
    #[inline]
    pub fn is_held_by(&self, group_id: &str) -> bool {
        self.assigned_group() == Some(group_id)
    }

    /// Whether fill may assign this post.
    #[inline]
    pub fn is_fillable(&self) -> bool {
        self.is_empty() && !self.is_locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
    }

    #[test]
    fn test_sibling_key() {
        let k = SlotKey::new(date(), 5, 1);
        assert_eq!(k.sibling().position, 2);
        assert_eq!(k.sibling().sibling(), k);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(SlotKey::new(date(), 7, 2).to_string(), "2024-01-07 07:00 post 2");
    }

    #[test]
    fn test_disabled_sentinel() {
        let mut s = TimeSlot::new(date(), 0, 3, 1);
        assert!(s.is_empty());
        assert!(s.is_fillable());

        s.group_id = Some(DISABLED_GROUP_ID.to_string());
        assert!(s.is_disabled());
        assert!(!s.is_empty());
        assert!(!s.is_fillable());
        assert_eq!(s.assigned_group(), None);
    }

    #[test]
    fn test_assigned_group() {
        let mut s = TimeSlot::new(date(), 0, 3, 2);
        s.group_id = Some("A".into());
        assert_eq!(s.assigned_group(), Some("A"));
        assert!(s.is_held_by("A"));
        assert!(!s.is_held_by("B"));
    }

    #[test]
    fn test_locked_not_fillable() {
        let mut s = TimeSlot::new(date(), 0, 3, 1);
        s.is_locked = true;
        assert!(!s.is_fillable());
    }

    #[test]
    fn test_slot_json_shape() {
        let s = TimeSlot::new(date(), 0, 3, 1);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["date"], "2024-01-07");
        assert_eq!(json["group_id"], serde_json::Value::Null);
        assert_eq!(json["is_locked"], false);
    }
}
