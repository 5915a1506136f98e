//! Scroll sampling
//!
//! Reads offset and extents from a container and turns them into clamped
//! progress readings. Two trigger sources (a fixed-cadence timer and scroll
//! events) feed the same read routine.

use serde::{Deserialize, Serialize};

/// A read-only view of a scrollable container
pub trait ScrollContainer {
    /// Current scroll offset (px)
    fn scroll_offset(&self) -> f64;
    /// Total scrollable content extent (px)
    fn scroll_extent(&self) -> f64;
    /// Visible viewport extent (px)
    fn visible_extent(&self) -> f64;
}

/// Container state captured at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    pub offset: f64,
    pub scroll_extent: f64,
    pub visible_extent: f64,
}

impl ContainerSnapshot {
    pub fn new(offset: f64, scroll_extent: f64, visible_extent: f64) -> Self {
        Self {
            offset,
            scroll_extent,
            visible_extent,
        }
    }
}

impl ScrollContainer for ContainerSnapshot {
    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn scroll_extent(&self) -> f64 {
        self.scroll_extent
    }

    fn visible_extent(&self) -> f64 {
        self.visible_extent
    }
}

/// What caused a sample to be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTrigger {
    /// First read when sampling is armed
    Initial,
    /// Periodic timer tick
    Timer,
    /// Scroll event from the container
    ScrollEvent,
}

/// One raw reading of the container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Unix ms
    pub timestamp: i64,
    pub position: f64,
    /// Clamped to 0-100
    pub progress: f64,
    pub trigger: SampleTrigger,
}

/// Scroll progress as a percentage of the scrollable range
///
/// Content that does not overflow its viewport counts as fully read.
pub fn progress_percent(offset: f64, scroll_extent: f64, visible_extent: f64) -> f64 {
    let max_scroll = scroll_extent - visible_extent;
    if max_scroll <= 0.0 {
        return 100.0;
    }
    let progress = (offset / max_scroll) * 100.0;
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 100.0)
}

/// Progress of a container's current state
pub fn container_progress<C: ScrollContainer + ?Sized>(container: &C) -> f64 {
    progress_percent(
        container.scroll_offset(),
        container.scroll_extent(),
        container.visible_extent(),
    )
}

/// Timer schedule and attachment state for one container
#[derive(Debug, Clone)]
pub struct ScrollSampler {
    interval_ms: i64,
    next_tick_at: Option<i64>,
}

impl ScrollSampler {
    pub fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_tick_at: None,
        }
    }

    /// Arm the periodic timer and start accepting scroll events
    pub fn attach(&mut self, now_ms: i64) {
        self.next_tick_at = Some(now_ms + self.interval_ms);
    }

    /// Stop the timer and ignore further scroll events
    pub fn detach(&mut self) {
        self.next_tick_at = None;
    }

    pub fn is_attached(&self) -> bool {
        self.next_tick_at.is_some()
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Whether a timer tick fires at `now_ms`; advances the schedule past `now_ms`.
    ///
    /// Missed ticks collapse into one, the way a throttled interval timer behaves.
    pub fn timer_due(&mut self, now_ms: i64) -> bool {
        match self.next_tick_at {
            Some(due) if now_ms >= due => {
                let missed = (now_ms - due) / self.interval_ms;
                self.next_tick_at = Some(due + (missed + 1) * self.interval_ms);
                true
            }
            _ => false,
        }
    }

    /// Read the container; `None` while detached
    pub fn read<C: ScrollContainer + ?Sized>(
        &self,
        container: &C,
        now_ms: i64,
        trigger: SampleTrigger,
    ) -> Option<RawSample> {
        if !self.is_attached() {
            return None;
        }
        Some(RawSample {
            timestamp: now_ms,
            position: container.scroll_offset(),
            progress: container_progress(container),
            trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_halfway() {
        assert_eq!(progress_percent(500.0, 2000.0, 1000.0), 50.0);
    }

    #[test]
    fn test_non_overflowing_content_is_complete() {
        for offset in [0.0, 10.0, 500.0] {
            assert_eq!(progress_percent(offset, 800.0, 800.0), 100.0);
        }
        assert_eq!(progress_percent(0.0, 300.0, 800.0), 100.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(progress_percent(5000.0, 2000.0, 1000.0), 100.0);
        assert_eq!(progress_percent(-40.0, 2000.0, 1000.0), 0.0);
        assert_eq!(progress_percent(f64::NAN, 2000.0, 1000.0), 0.0);
    }

    #[test]
    fn test_timer_cadence() {
        let mut sampler = ScrollSampler::new(100);
        assert!(!sampler.timer_due(0));

        sampler.attach(0);
        assert!(!sampler.timer_due(99));
        assert!(sampler.timer_due(100));
        assert!(!sampler.timer_due(150));
        assert!(sampler.timer_due(200));
    }

    #[test]
    fn test_missed_ticks_collapse() {
        let mut sampler = ScrollSampler::new(100);
        sampler.attach(0);
        assert!(sampler.timer_due(550));
        assert!(!sampler.timer_due(599));
        assert!(sampler.timer_due(600));
    }

    #[test]
    fn test_detached_sampler_reads_nothing() {
        let mut sampler = ScrollSampler::new(100);
        let container = ContainerSnapshot::new(10.0, 2000.0, 1000.0);
        assert!(sampler.read(&container, 0, SampleTrigger::Initial).is_none());

        sampler.attach(0);
        let sample = sampler.read(&container, 5, SampleTrigger::ScrollEvent).unwrap();
        assert_eq!(sample.position, 10.0);
        assert_eq!(sample.progress, 1.0);

        sampler.detach();
        assert!(!sampler.timer_due(1000));
        assert!(sampler.read(&container, 1000, SampleTrigger::Timer).is_none());
    }
}
