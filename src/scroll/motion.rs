//! Motion analysis
//!
//! Derives speed, direction reversals and reading pauses from successive
//! scroll samples. Sample pairs that are too close in time or imply an
//! implausible speed are dropped without moving the reference sample, so
//! out-of-order or duplicate readings from the two trigger sources are harmless.

use crate::config::MetricsConfig;
use crate::types::{ScrollPause, ScrollSpeedSample};
use tracing::debug;

/// Scroll direction; offsets growing means `Down`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
}

/// Pause detector state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PauseState {
    Idle,
    Pausing { start: i64, position: f64 },
}

/// Why a sample pair was not used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    TimeDeltaTooSmall,
    SpeedOutOfRange,
}

/// Result of feeding one sample to the analyzer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionOutcome {
    /// No previous sample; this one becomes the reference
    Baseline,
    Accepted { speed: f64, direction_changed: bool },
    Discarded(DiscardReason),
}

/// Speed, reversal and pause derivation for one run
#[derive(Debug, Clone)]
pub struct MotionAnalyzer {
    min_time_delta_ms: i64,
    max_speed: f64,
    jitter_px: f64,
    pause_speed: f64,
    pause_min_ms: i64,

    last: Option<(i64, f64)>,
    last_direction: ScrollDirection,
    pause: PauseState,

    speed_samples: Vec<ScrollSpeedSample>,
    pauses: Vec<ScrollPause>,
    direction_changes: u32,
}

impl Default for MotionAnalyzer {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl MotionAnalyzer {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            min_time_delta_ms: config.min_time_delta_ms,
            max_speed: config.max_speed_px_per_s,
            jitter_px: config.direction_jitter_px,
            pause_speed: config.pause_speed_threshold_px_per_s,
            pause_min_ms: config.pause_min_duration_ms,
            last: None,
            last_direction: ScrollDirection::Down,
            pause: PauseState::Idle,
            speed_samples: Vec::new(),
            pauses: Vec::new(),
            direction_changes: 0,
        }
    }

    /// Feed a sample taken at `timestamp` (relative ms) at `position` (px)
    pub fn observe(&mut self, timestamp: i64, position: f64) -> MotionOutcome {
        let Some((last_time, last_position)) = self.last else {
            self.last = Some((timestamp, position));
            return MotionOutcome::Baseline;
        };

        let time_delta = timestamp - last_time;
        if time_delta < self.min_time_delta_ms {
            debug!(time_delta, "discarding sample pair: time delta too small");
            return MotionOutcome::Discarded(DiscardReason::TimeDeltaTooSmall);
        }

        let position_delta = position - last_position;
        let speed = position_delta.abs() / (time_delta as f64 / 1000.0);
        if !speed.is_finite() || speed > self.max_speed {
            debug!(speed, "discarding sample pair: implausible speed");
            return MotionOutcome::Discarded(DiscardReason::SpeedOutOfRange);
        }

        self.speed_samples.push(ScrollSpeedSample {
            timestamp,
            speed,
            position,
        });

        let direction = if position_delta >= 0.0 {
            ScrollDirection::Down
        } else {
            ScrollDirection::Up
        };
        let direction_changed =
            direction != self.last_direction && position_delta.abs() > self.jitter_px;
        if direction_changed {
            self.direction_changes += 1;
            self.last_direction = direction;
        }

        self.update_pause(speed, timestamp, position);
        self.last = Some((timestamp, position));

        MotionOutcome::Accepted {
            speed,
            direction_changed,
        }
    }

    fn update_pause(&mut self, speed: f64, timestamp: i64, position: f64) {
        match self.pause {
            PauseState::Idle if speed < self.pause_speed => {
                self.pause = PauseState::Pausing {
                    start: timestamp,
                    position,
                };
            }
            PauseState::Pausing { start, position } if speed >= self.pause_speed => {
                self.commit_pause(start, position, timestamp);
                self.pause = PauseState::Idle;
            }
            _ => {}
        }
    }

    fn commit_pause(&mut self, start: i64, position: f64, end: i64) {
        let duration_ms = end - start;
        if duration_ms >= self.pause_min_ms {
            self.pauses.push(ScrollPause {
                timestamp: start,
                duration_ms,
                position,
            });
        }
    }

    /// Close a pending pause at the last known sample time
    pub fn finish(&mut self) {
        if let (PauseState::Pausing { start, position }, Some((last_time, _))) =
            (self.pause, self.last)
        {
            self.commit_pause(start, position, last_time);
        }
        self.pause = PauseState::Idle;
    }

    /// Mean of valid (finite, positive) speeds; 0 when there are none
    pub fn average_speed(&self) -> f64 {
        let (sum, count) = self
            .valid_speeds()
            .fold((0.0, 0usize), |(sum, count), s| (sum + s, count + 1));
        if count == 0 {
            return 0.0;
        }
        let average = sum / count as f64;
        if average.is_finite() {
            average
        } else {
            0.0
        }
    }

    /// Max of valid (finite, positive) speeds; 0 when there are none
    pub fn max_speed(&self) -> f64 {
        self.valid_speeds().fold(0.0, f64::max)
    }

    fn valid_speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.speed_samples
            .iter()
            .map(|s| s.speed)
            .filter(|s| s.is_finite() && *s > 0.0)
    }

    pub fn speed_samples(&self) -> &[ScrollSpeedSample] {
        &self.speed_samples
    }

    pub fn pauses(&self) -> &[ScrollPause] {
        &self.pauses
    }

    pub fn direction_changes(&self) -> u32 {
        self.direction_changes
    }

    pub fn pause_state(&self) -> PauseState {
        self.pause
    }

    /// Timestamp of the current reference sample
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last.map(|(t, _)| t)
    }
}
