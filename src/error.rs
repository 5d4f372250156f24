//! Error type for loading and constructing rostering data.
//!
//! Only data-loading problems are errors. Infeasible assignments and
//! hard-constraint violations are ordinary outcomes: the allocator leaves
//! a post empty, the optimizer rejects a move, and [`validate`] reports
//! violations as a list.
//!
//! [`validate`]: crate::scheduler::Scheduler::validate

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::SlotKey;

/// Errors raised while loading or constructing rostering data.
#[derive(Debug, Error)]
pub enum RosterError {
    /// A constraint entry carries a type tag outside the closed registry.
    #[error("Unknown constraint type: {0}")]
    UnknownConstraintType(String),

    /// End date precedes start date.
    #[error("Invalid date range: {start} .. {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// No slot exists with the given identity.
    #[error("Slot not found: {0}")]
    SlotNotFound(SlotKey),

    /// A required field is absent from a persisted document.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A date string could not be parsed as `YYYY-MM-DD`.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, RosterError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| RosterError::InvalidDate(s.to_string()))
}
