//! Scroll metrics engine
//!
//! Owns the sampler, motion analyzer and milestone tracker for one variant run
//! and exposes the aggregated [`ScrollMetrics`]. Callers drive it with timer
//! ticks and scroll events; both go through [`ScrollMetricsEngine::sample_now`].

use crate::config::MetricsConfig;
use crate::scroll::milestones::MilestoneTracker;
use crate::scroll::motion::{MotionAnalyzer, MotionOutcome};
use crate::scroll::sampler::{SampleTrigger, ScrollContainer, ScrollSampler};
use crate::types::ScrollMetrics;
use tracing::{info, trace};

type ProgressListener = Box<dyn FnMut(f64)>;
type CompletionCallback = Box<dyn FnOnce(&ScrollMetrics)>;

/// Scroll sampling and derivation for a single container
pub struct ScrollMetricsEngine {
    config: MetricsConfig,
    sampler: ScrollSampler,
    motion: MotionAnalyzer,
    milestones: MilestoneTracker,

    start_time: Option<i64>,
    first_scroll_time: Option<i64>,
    max_depth: f64,
    current_progress: f64,

    frozen: Option<ScrollMetrics>,
    progress_listeners: Vec<ProgressListener>,
    on_complete: Option<CompletionCallback>,
}

impl Default for ScrollMetricsEngine {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl ScrollMetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            sampler: ScrollSampler::new(config.sample_interval_ms),
            motion: MotionAnalyzer::new(&config),
            milestones: MilestoneTracker::new(),
            config,
            start_time: None,
            first_scroll_time: None,
            max_depth: 0.0,
            current_progress: 0.0,
            frozen: None,
            progress_listeners: Vec::new(),
            on_complete: None,
        }
    }

    /// Subscribe to progress changes (called after every accepted read)
    pub fn on_progress(&mut self, listener: impl FnMut(f64) + 'static) {
        self.progress_listeners.push(Box::new(listener));
    }

    /// Register the one-shot callback fired when progress first reaches 100%
    pub fn on_complete(&mut self, callback: impl FnOnce(&ScrollMetrics) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Arm sampling and take the initial reading.
    ///
    /// The run start time is latched on the first call only.
    pub fn start<C: ScrollContainer + ?Sized>(&mut self, container: &C, now_ms: i64) {
        if self.sampler.is_attached() {
            return;
        }
        if self.start_time.is_none() {
            self.start_time = Some(now_ms);
        }
        self.sampler.attach(now_ms);
        self.sample_now(container, now_ms, SampleTrigger::Initial);
    }

    /// Timer entry point; samples only when a tick is due
    pub fn tick<C: ScrollContainer + ?Sized>(&mut self, container: &C, now_ms: i64) -> bool {
        if !self.sampler.timer_due(now_ms) {
            return false;
        }
        self.sample_now(container, now_ms, SampleTrigger::Timer);
        true
    }

    /// Scroll event entry point
    pub fn handle_scroll<C: ScrollContainer + ?Sized>(&mut self, container: &C, now_ms: i64) {
        self.sample_now(container, now_ms, SampleTrigger::ScrollEvent);
    }

    /// Read the container and run the derivation pipeline
    pub fn sample_now<C: ScrollContainer + ?Sized>(
        &mut self,
        container: &C,
        now_ms: i64,
        trigger: SampleTrigger,
    ) {
        let Some(sample) = self.sampler.read(container, now_ms, trigger) else {
            return;
        };
        let start = *self.start_time.get_or_insert(sample.timestamp);
        let elapsed = sample.timestamp - start;

        if self.first_scroll_time.is_none() && sample.position > 0.0 {
            self.first_scroll_time = Some(elapsed);
        }
        if sample.progress > self.max_depth {
            self.max_depth = sample.progress;
        }

        if let MotionOutcome::Discarded(reason) = self.motion.observe(elapsed, sample.position) {
            trace!(?reason, ?trigger, "sample pair discarded");
            return;
        }

        for milestone in self.milestones.record(sample.progress, elapsed) {
            info!(
                threshold = milestone.threshold(),
                elapsed_ms = elapsed,
                "scroll milestone reached"
            );
        }

        self.current_progress = sample.progress;
        for listener in self.progress_listeners.iter_mut() {
            listener(sample.progress);
        }

        if sample.progress >= 100.0 && self.frozen.is_none() {
            let metrics = self.build_metrics();
            info!(elapsed_ms = elapsed, "scroll completed");
            if let Some(callback) = self.on_complete.take() {
                callback(&metrics);
            }
            self.frozen = Some(metrics);
        }
    }

    /// Stop the timer, ignore further events and close any pending pause
    pub fn teardown(&mut self) {
        self.sampler.detach();
        self.motion.finish();
    }

    /// Return to the initial state for a fresh run; subscriptions are kept
    pub fn reset(&mut self) {
        self.sampler = ScrollSampler::new(self.config.sample_interval_ms);
        self.motion = MotionAnalyzer::new(&self.config);
        self.milestones = MilestoneTracker::new();
        self.start_time = None;
        self.first_scroll_time = None;
        self.max_depth = 0.0;
        self.current_progress = 0.0;
        self.frozen = None;
    }

    /// Current metrics; frozen once progress has reached 100%
    pub fn metrics(&self) -> ScrollMetrics {
        match &self.frozen {
            Some(metrics) => metrics.clone(),
            None => self.build_metrics(),
        }
    }

    fn build_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            time_to_first_scroll_ms: self.first_scroll_time.unwrap_or(0),
            milestones: self.milestones.milestones().clone(),
            speed_samples: self.motion.speed_samples().to_vec(),
            average_speed: self.motion.average_speed(),
            max_speed: self.motion.max_speed(),
            pauses: self.motion.pauses().to_vec(),
            direction_changes: self.motion.direction_changes(),
            final_depth_percent: self.max_depth,
        }
    }

    pub fn current_progress(&self) -> f64 {
        self.current_progress
    }

    pub fn is_complete(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_attached()
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }
}
