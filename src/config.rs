//! Scoring weights.
//!
//! Every bonus, penalty and threshold used by the constraint scorers and
//! the fill heuristic lives in [`ScoringConfig`]. The value is passed
//! explicitly into [`Scheduler`](crate::scheduler::Scheduler); defaults
//! are hard-coded here and overrides are merged key by key.
//!
//! # Sign Convention
//! Scores are maximized. Bonuses are added, penalties are subtracted.
//! All weights are stored as positive magnitudes except
//! `missing_target_score`, which is added as-is.
//!
//! # Override Format
//!
//! ```
//! use u_roster::config::ScoringConfig;
//!
//! let cfg = ScoringConfig::from_json_str(r#"{"SIMULTANEOUS_BONUS": 350, "REST_PENALTY": "oops"}"#).unwrap();
//! assert_eq!(cfg.simultaneous_bonus, 350.0);
//! // Malformed value keeps the default.
//! assert_eq!(cfg.rest_penalty, ScoringConfig::default().rest_penalty);
//! ```

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RosterError;

/// Named numeric weights for scoring and allocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ScoringConfig {
    /// Bonus per hour in which one group holds both posts (when allowed).
    pub simultaneous_bonus: f64,
    /// Bonus per hour of a run that stays within the desired length.
    pub consecutive_bonus_per_hour: f64,
    /// Exponent applied to the excess length of an over-long run.
    pub consecutive_penalty_exponent: f64,
    /// Multiplier applied to the exponentiated excess length.
    pub consecutive_penalty_multiplier: f64,
    /// Penalty per missing hour below `min_rest_hours`.
    pub rest_penalty: f64,
    /// Flat penalty for rest in `[min_rest_hours, short_rest_hours)`.
    pub short_rest_penalty: f64,
    /// Bonus for rest of at least `long_rest_hours`.
    pub long_rest_bonus: f64,
    /// Penalty for assigning a post inside an activity window.
    pub activity_window_penalty: f64,
    /// Bonus for assigning a post covered by a coupling staffing rule.
    pub staffing_rule_bonus: f64,
    /// Scale of the quota progress term during fill.
    pub quota_progress_weight: f64,
    /// Progress term for a group without a target (added as-is).
    pub missing_target_score: f64,
    /// Penalty for a group that already reached its target.
    pub over_quota_penalty: f64,
    /// Fill nudge for continuing a group already on the sibling post.
    pub simultaneous_continuity_bonus: f64,
    /// Rest below this many hours is penalized per missing hour.
    pub min_rest_hours: f64,
    /// Rest below this many hours (and above the minimum) is penalized flatly.
    pub short_rest_hours: f64,
    /// Rest of at least this many hours earns the long-rest bonus.
    pub long_rest_hours: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            simultaneous_bonus: 200.0,
            consecutive_bonus_per_hour: 20.0,
            consecutive_penalty_exponent: 2.0,
            consecutive_penalty_multiplier: 500.0,
            rest_penalty: 1000.0,
            short_rest_penalty: 300.0,
            long_rest_bonus: 100.0,
            activity_window_penalty: 1000.0,
            staffing_rule_bonus: 100.0,
            quota_progress_weight: 100.0,
            missing_target_score: -2000.0,
            over_quota_penalty: 1000.0,
            simultaneous_continuity_bonus: 50.0,
            min_rest_hours: 6.0,
            short_rest_hours: 16.0,
            long_rest_hours: 24.0,
        }
    }
}

impl ScoringConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses JSON overrides on top of the defaults.
    ///
    /// # Errors
    /// Returns an error only if the text is not valid JSON. Individual
    /// malformed values are logged and replaced by their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, RosterError> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Self::default().merged(&value))
    }

    /// Parses TOML overrides on top of the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, RosterError> {
        let table: toml::Table = toml::from_str(s)?;
        let value = serde_json::to_value(table)?;
        Ok(Self::default().merged(&value))
    }

    /// Loads overrides from a `.json` or `.toml` file.
    ///
    /// Never fails: a missing file yields the defaults, an unreadable or
    /// unparseable one is logged and also yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Scoring config not found, using defaults");
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), ?config, "Loaded scoring config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Invalid scoring config, using defaults");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, RosterError> {
        let contents = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&contents)
        } else {
            Self::from_json_str(&contents)
        }
    }

    /// Writes the configuration as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RosterError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Returns a copy with every recognized key of `overrides` applied.
    pub fn merged(mut self, overrides: &Value) -> Self {
        let Some(map) = overrides.as_object() else {
            tracing::warn!("Scoring config overrides are not an object, using defaults");
            return self;
        };
        self.apply(map);
        self
    }

    fn apply(&mut self, map: &Map<String, Value>) {
        for (key, value) in map {
            let name = key.to_ascii_lowercase();
            let Some(slot) = self.field_mut(&name) else {
                tracing::debug!(key = %key, "Ignoring unknown scoring config key");
                continue;
            };
            match value.as_f64().filter(|v| v.is_finite()) {
                Some(v) => *slot = v,
                None => {
                    tracing::warn!(key = %key, value = %value, "Malformed scoring weight, keeping default");
                }
            }
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        let field = match name {
            "simultaneous_bonus" => &mut self.simultaneous_bonus,
            "consecutive_bonus_per_hour" => &mut self.consecutive_bonus_per_hour,
            "consecutive_penalty_exponent" => &mut self.consecutive_penalty_exponent,
            "consecutive_penalty_multiplier" => &mut self.consecutive_penalty_multiplier,
            "rest_penalty" => &mut self.rest_penalty,
            "short_rest_penalty" => &mut self.short_rest_penalty,
            "long_rest_bonus" => &mut self.long_rest_bonus,
            "activity_window_penalty" => &mut self.activity_window_penalty,
            "staffing_rule_bonus" => &mut self.staffing_rule_bonus,
            "quota_progress_weight" => &mut self.quota_progress_weight,
            "missing_target_score" => &mut self.missing_target_score,
            "over_quota_penalty" => &mut self.over_quota_penalty,
            "simultaneous_continuity_bonus" => &mut self.simultaneous_continuity_bonus,
            "min_rest_hours" => &mut self.min_rest_hours,
            "short_rest_hours" => &mut self.short_rest_hours,
            "long_rest_hours" => &mut self.long_rest_hours,
            _ => return None,
        };
        Some(field)
    }
}
