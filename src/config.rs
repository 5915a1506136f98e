//! Engine configuration
//!
//! Every threshold used by the sampler, motion analyzer, milestone tracker and
//! exporter lives here. Defaults reproduce the study harness settings.

use crate::error::MetricsError;
use serde::{Deserialize, Serialize};

/// Timer cadence for scroll sampling (ms)
pub const DEFAULT_SAMPLE_INTERVAL_MS: i64 = 100;

/// Sample pairs closer together than this are unreliable (ms)
pub const DEFAULT_MIN_TIME_DELTA_MS: i64 = 10;

/// Speeds above this are treated as sensor artifacts (px/s)
pub const DEFAULT_MAX_SPEED_PX_PER_S: f64 = 10_000.0;

/// Reversals must move further than this to count (px)
pub const DEFAULT_DIRECTION_JITTER_PX: f64 = 5.0;

/// Speed below this is considered a pause (px/s)
pub const DEFAULT_PAUSE_SPEED_THRESHOLD: f64 = 10.0;

/// Minimum pause duration to record (ms)
pub const DEFAULT_PAUSE_MIN_DURATION_MS: i64 = 500;

/// Delay before a delivered blob is released (ms)
pub const DEFAULT_BLOB_RELEASE_DELAY_MS: i64 = 100;

/// Default filename prefix for exported artifacts
pub const DEFAULT_FILENAME_PREFIX: &str = "user-test-results";

/// Thresholds and export settings shared by all components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Periodic sampling cadence in milliseconds
    pub sample_interval_ms: i64,
    /// Minimum time between two samples for a speed to be derived
    pub min_time_delta_ms: i64,
    /// Upper bound on plausible scroll speed
    pub max_speed_px_per_s: f64,
    /// Positional delta a reversal must exceed to be counted
    pub direction_jitter_px: f64,
    /// Speed below which the reader is considered paused
    pub pause_speed_threshold_px_per_s: f64,
    /// Shortest pause that gets committed
    pub pause_min_duration_ms: i64,
    /// How long a delivered artifact stays resident after the save trigger
    pub blob_release_delay_ms: i64,
    /// Prefix for generated export filenames
    pub filename_prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            min_time_delta_ms: DEFAULT_MIN_TIME_DELTA_MS,
            max_speed_px_per_s: DEFAULT_MAX_SPEED_PX_PER_S,
            direction_jitter_px: DEFAULT_DIRECTION_JITTER_PX,
            pause_speed_threshold_px_per_s: DEFAULT_PAUSE_SPEED_THRESHOLD,
            pause_min_duration_ms: DEFAULT_PAUSE_MIN_DURATION_MS,
            blob_release_delay_ms: DEFAULT_BLOB_RELEASE_DELAY_MS,
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
        }
    }
}

impl MetricsConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        let config: MetricsConfig = serde_json::from_str(json)
            .map_err(|e| MetricsError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make derivation meaningless
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.sample_interval_ms <= 0 {
            return Err(MetricsError::InvalidConfig(
                "sample_interval_ms must be positive".to_string(),
            ));
        }
        if self.min_time_delta_ms <= 0 {
            return Err(MetricsError::InvalidConfig(
                "min_time_delta_ms must be positive".to_string(),
            ));
        }
        if self.max_speed_px_per_s.is_nan() || self.max_speed_px_per_s <= 0.0 {
            return Err(MetricsError::InvalidConfig(
                "max_speed_px_per_s must be positive".to_string(),
            ));
        }
        if self.direction_jitter_px < 0.0 || self.pause_speed_threshold_px_per_s < 0.0 {
            return Err(MetricsError::InvalidConfig(
                "jitter and pause thresholds must be non-negative".to_string(),
            ));
        }
        if self.pause_min_duration_ms < 0 || self.blob_release_delay_ms < 0 {
            return Err(MetricsError::InvalidConfig(
                "durations must be non-negative".to_string(),
            ));
        }
        if self.filename_prefix.trim().is_empty() {
            return Err(MetricsError::InvalidConfig(
                "filename_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
