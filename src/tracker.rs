//! Variant run aggregation
//!
//! A [`VariantTracker`] owns one scroll engine and one interaction recorder for
//! a single variant run and produces exactly one [`VariantMetrics`] record.

use crate::config::MetricsConfig;
use crate::interaction::InteractionRecorder;
use crate::scroll::{ScrollContainer, ScrollMetricsEngine};
use crate::types::{InteractionKind, Position, Variant, VariantMetrics};
use tracing::info;

type CompletionCallback = Box<dyn FnOnce(&VariantMetrics)>;

/// Where the interaction target's enablement comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gating {
    /// The caller reports enablement via [`VariantTracker::set_enabled`]
    #[default]
    External,
    /// The target enables itself once scroll progress reaches 100%
    ScrollCompletion,
}

/// Metrics aggregation for one variant run
pub struct VariantTracker {
    variant: Variant,
    order: Position,
    gating: Gating,
    scroll: ScrollMetricsEngine,
    interaction: InteractionRecorder,
    start_time: Option<i64>,
    completed: Option<VariantMetrics>,
    on_complete: Option<CompletionCallback>,
}

impl VariantTracker {
    pub fn new(variant: Variant, order: Position, config: MetricsConfig) -> Self {
        Self {
            variant,
            order,
            gating: Gating::default(),
            scroll: ScrollMetricsEngine::new(config),
            interaction: InteractionRecorder::new(),
            start_time: None,
            completed: None,
            on_complete: None,
        }
    }

    pub fn with_gating(mut self, gating: Gating) -> Self {
        self.gating = gating;
        self
    }

    /// Register the one-shot callback receiving the finalized record
    pub fn on_complete(&mut self, callback: impl FnOnce(&VariantMetrics) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Subscribe to scroll progress changes
    pub fn on_progress(&mut self, listener: impl FnMut(f64) + 'static) {
        self.scroll.on_progress(listener);
    }

    /// Begin the run; `start_time` is latched on the first activation only
    pub fn activate<C: ScrollContainer + ?Sized>(&mut self, container: &C, now_ms: i64) {
        if self.completed.is_some() {
            return;
        }
        if self.start_time.is_none() {
            self.start_time = Some(now_ms);
            info!(variant = %self.variant, order = %self.order, "variant run started");
        }
        self.interaction.attach(now_ms);
        self.scroll.start(container, now_ms);
        self.sync_gate(now_ms);
    }

    pub fn set_enabled(&mut self, enabled: bool, now_ms: i64) {
        self.interaction.set_enabled(enabled, now_ms);
    }

    /// Periodic timer tick; returns whether a sample was taken
    pub fn tick<C: ScrollContainer + ?Sized>(&mut self, container: &C, now_ms: i64) -> bool {
        let sampled = self.scroll.tick(container, now_ms);
        self.sync_gate(now_ms);
        sampled
    }

    pub fn handle_scroll<C: ScrollContainer + ?Sized>(&mut self, container: &C, now_ms: i64) {
        self.scroll.handle_scroll(container, now_ms);
        self.sync_gate(now_ms);
    }

    pub fn record_interaction(&mut self, kind: InteractionKind, now_ms: i64) {
        self.interaction.record_event(kind, now_ms);
    }

    fn sync_gate(&mut self, now_ms: i64) {
        if self.gating == Gating::ScrollCompletion
            && self.scroll.is_complete()
            && !self.interaction.is_enabled()
        {
            self.interaction.set_enabled(true, now_ms);
        }
    }

    /// Finalize the run. Idempotent: later calls return the first record
    /// unchanged and never re-fire the completion callback.
    pub fn complete_task(&mut self, now_ms: i64) -> VariantMetrics {
        if let Some(metrics) = &self.completed {
            return metrics.clone();
        }

        self.interaction.record_click(now_ms);
        self.scroll.teardown();
        self.interaction.detach();

        let start_time = self.start_time.unwrap_or(now_ms);
        let metrics = VariantMetrics {
            variant: self.variant,
            order: self.order,
            start_time,
            end_time: now_ms,
            time_on_task_ms: now_ms - start_time,
            scroll_metrics: self.scroll.metrics(),
            interaction_metrics: self.interaction.metrics(now_ms),
        };

        info!(
            variant = %self.variant,
            time_on_task_ms = metrics.time_on_task_ms,
            "variant run completed"
        );

        if let Some(callback) = self.on_complete.take() {
            callback(&metrics);
        }
        self.completed = Some(metrics.clone());
        metrics
    }

    /// Stop sampling and listening without finalizing
    pub fn teardown(&mut self) {
        self.scroll.teardown();
        self.interaction.detach();
    }

    /// Re-arm for a fresh run; all derived state returns to its initial values
    pub fn reset(&mut self) {
        self.scroll.teardown();
        self.scroll.reset();
        self.interaction.reset();
        self.start_time = None;
        self.completed = None;
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn order(&self) -> Position {
        self.order
    }

    pub fn current_progress(&self) -> f64 {
        self.scroll.current_progress()
    }

    pub fn is_scroll_complete(&self) -> bool {
        self.scroll.is_complete()
    }

    pub fn is_enabled(&self) -> bool {
        self.interaction.is_enabled()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::ContainerSnapshot;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn container(offset: f64) -> ContainerSnapshot {
        ContainerSnapshot::new(offset, 3000.0, 1000.0)
    }

    fn tracker() -> VariantTracker {
        VariantTracker::new(Variant::Button, Position::First, MetricsConfig::default())
            .with_gating(Gating::ScrollCompletion)
    }

    #[test]
    fn test_start_time_is_lazy() {
        let mut tracker = tracker();
        assert_eq!(tracker.start_time(), None);
        tracker.activate(&container(0.0), 5_000);
        tracker.activate(&container(0.0), 6_000);
        assert_eq!(tracker.start_time(), Some(5_000));
    }

    #[test]
    fn test_full_run() {
        let mut tracker = tracker();
        tracker.activate(&container(0.0), 10_000);
        tracker.record_interaction(InteractionKind::Hover, 10_200);
        tracker.record_interaction(InteractionKind::Click, 10_300);
        tracker.handle_scroll(&container(1000.0), 11_000);
        tracker.handle_scroll(&container(2000.0), 12_000);
        assert!(tracker.is_scroll_complete());
        assert!(tracker.is_enabled());

        tracker.record_interaction(InteractionKind::Click, 13_000);
        let metrics = tracker.complete_task(13_000);

        assert_eq!(metrics.variant, Variant::Button);
        assert_eq!(metrics.order, Position::First);
        assert_eq!(metrics.start_time, 10_000);
        assert_eq!(metrics.end_time, 13_000);
        assert_eq!(metrics.time_on_task_ms, 3_000);
        assert_eq!(metrics.scroll_metrics.milestones.percent100, Some(2_000));
        assert_eq!(metrics.interaction_metrics.premature_clicks, 1);
        assert_eq!(metrics.interaction_metrics.premature_hovers, 1);
        assert_eq!(
            metrics.interaction_metrics.time_to_click_after_enabled_ms,
            Some(1_000)
        );
    }

    #[test]
    fn test_external_gating_ignores_scroll() {
        let mut tracker =
            VariantTracker::new(Variant::Control, Position::Second, MetricsConfig::default());
        tracker.activate(&container(2000.0), 0);
        assert!(tracker.is_scroll_complete());
        assert!(!tracker.is_enabled());

        tracker.set_enabled(true, 50);
        assert!(tracker.is_enabled());
    }

    #[test]
    fn test_complete_task_is_idempotent() {
        let calls = Rc::new(RefCell::new(0));
        let mut tracker = tracker();
        {
            let calls = Rc::clone(&calls);
            tracker.on_complete(move |_| *calls.borrow_mut() += 1);
        }
        tracker.activate(&container(0.0), 0);
        tracker.handle_scroll(&container(500.0), 400);

        let first = tracker.complete_task(1_000);
        tracker.handle_scroll(&container(2000.0), 1_500);
        let second = tracker.complete_task(9_000);

        assert_eq!(first, second);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(second.end_time, 1_000);
    }

    #[test]
    fn test_complete_without_activation() {
        let mut tracker = tracker();
        let metrics = tracker.complete_task(700);
        assert_eq!(metrics.start_time, 700);
        assert_eq!(metrics.time_on_task_ms, 0);
        assert_eq!(metrics.interaction_metrics.time_to_click_after_enabled_ms, None);
    }

    #[test]
    fn test_completion_closes_pending_pause() {
        let mut tracker = tracker();
        tracker.activate(&container(0.0), 0);
        tracker.tick(&container(0.0), 100);
        tracker.tick(&container(0.0), 900);
        let metrics = tracker.complete_task(950);
        assert_eq!(metrics.scroll_metrics.pauses.len(), 1);
        assert_eq!(metrics.scroll_metrics.pauses[0].duration_ms, 800);
    }

    #[test]
    fn test_reset_allows_second_run() {
        let mut tracker = tracker();
        tracker.activate(&container(0.0), 0);
        tracker.handle_scroll(&container(2000.0), 100);
        tracker.complete_task(200);
        tracker.reset();

        assert!(!tracker.is_completed());
        assert!(!tracker.is_enabled());
        assert_eq!(tracker.current_progress(), 0.0);

        tracker.activate(&container(0.0), 1_000);
        let metrics = tracker.complete_task(1_500);
        assert_eq!(metrics.start_time, 1_000);
        assert_eq!(metrics.scroll_metrics.milestones.percent100, None);
    }
}
