//! Guard-duty rostering engine.
//!
//! Assigns groups to hourly guard posts (two posts per hour) over a date
//! range, subject to rule-based hard constraints and soft preferences.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeSlot`, `Group`, `Schedule`, rule windows
//! - **`constraints`**: The closed `Constraint` sum type, hard checks and soft scores
//! - **`context`**: Slot index, hour timeline and usage ledger for one run
//! - **`config`**: `ScoringConfig` weights with JSON/TOML overrides
//! - **`scheduler`**: Quota fill, exchange search, validation and statistics
//! - **`validation`**: Structural checks of groups and schedule layout
//!
//! # Workflow
//!
//! ```
//! use chrono::NaiveDate;
//! use u_roster::models::{Group, Schedule};
//! use u_roster::scheduler::{OptimizeOptions, Scheduler};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
//! let mut schedule = Schedule::create_empty(start, start).unwrap();
//! let scheduler = Scheduler::new(vec![
//!     Group::new("A", "Alpha").with_staffing_size(4),
//!     Group::new("B", "Bravo").with_weekly_quota(14),
//! ])
//! .with_seed(7);
//!
//! scheduler.fill(&mut schedule);
//! scheduler.optimize(&mut schedule, &OptimizeOptions::default(), None);
//! assert!(scheduler.validate(&schedule).is_empty());
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of applications, methods and models"

pub mod config;
pub mod constraints;
pub mod context;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::RosterError;
