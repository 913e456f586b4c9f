//! Configuration for the RECALL engine and its hosts.
//!
//! Maps directly to `recall.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a working setup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scoring::SpeedCurve;

/// Top-level RECALL configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Round scoring settings.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Default round timings for catalog tasks.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Unlock progress persistence.
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Results persistence.
    #[serde(default)]
    pub results: ResultsConfig,
}

impl RecallConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `RecallError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::RecallError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// Speed-component scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Seconds of full speed credit.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: f64,
    /// Points lost per second past the grace period.
    #[serde(default = "default_penalty")]
    pub penalty_per_sec: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            grace_secs: 10.0,
            penalty_per_sec: 2.5,
        }
    }
}

impl ScoringConfig {
    /// The speed curve described by this config.
    #[must_use]
    pub fn speed_curve(&self) -> SpeedCurve {
        SpeedCurve {
            grace: Duration::from_secs_f64(self.grace_secs.max(0.0)),
            penalty_per_sec: self.penalty_per_sec.max(0.0),
        }
    }
}

/// Default timings applied by the standard catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Feedback pause between rounds in milliseconds (0 = advance immediately).
    #[serde(default = "default_feedback_ms")]
    pub feedback_ms: u64,
    /// Hard response limit in milliseconds (0 = no limit).
    #[serde(default = "default_response_limit_ms")]
    pub response_limit_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            feedback_ms: 1_500,
            response_limit_ms: 60_000,
        }
    }
}

impl TimingConfig {
    /// Feedback pause, if any.
    #[must_use]
    pub fn feedback(&self) -> Option<Duration> {
        (self.feedback_ms > 0).then(|| Duration::from_millis(self.feedback_ms))
    }

    /// Response limit, if any.
    #[must_use]
    pub fn response_limit(&self) -> Option<Duration> {
        (self.response_limit_ms > 0).then(|| Duration::from_millis(self.response_limit_ms))
    }
}

/// Unlock progress persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// JSON file holding unlock levels.
    #[serde(default = "default_progress_path")]
    pub path: String,
    /// Name of the task set whose levels are tracked.
    #[serde(default = "default_task_set")]
    pub task_set: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            path: "recall-progress.json".to_string(),
            task_set: "standard".to_string(),
        }
    }
}

/// Results persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Use WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            db_path: "recall-results.db".to_string(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
fn default_progress_path() -> String { "recall-progress.json".to_string() }
fn default_task_set() -> String { "standard".to_string() }
fn default_db_path() -> String { "recall-results.db".to_string() }
fn default_grace_secs() -> f64 { 10.0 }
fn default_penalty() -> f64 { 2.5 }
fn default_feedback_ms() -> u64 { 1_500 }
fn default_response_limit_ms() -> u64 { 60_000 }
