//! Interaction recording
//!
//! Observes click, hover and focus activity on the gated element and classifies
//! each event against the enablement flag as it was at that instant.

use crate::types::{InteractionEvent, InteractionKind, InteractionMetrics};
use tracing::{debug, info};

type CompletionCallback = Box<dyn FnOnce(&InteractionMetrics)>;

/// Click/hover/focus recorder for one variant run
pub struct InteractionRecorder {
    attached: bool,
    enabled: bool,
    start_time: Option<i64>,
    enabled_at: Option<i64>,
    clicked_at: Option<i64>,

    events: Vec<InteractionEvent>,
    premature_clicks: u32,
    premature_hovers: u32,
    focus_events: u32,

    on_complete: Option<CompletionCallback>,
}

impl Default for InteractionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionRecorder {
    pub fn new() -> Self {
        Self {
            attached: false,
            enabled: false,
            start_time: None,
            enabled_at: None,
            clicked_at: None,
            events: Vec::new(),
            premature_clicks: 0,
            premature_hovers: 0,
            focus_events: 0,
            on_complete: None,
        }
    }

    /// Register the one-shot callback fired by the first [`Self::record_click`]
    pub fn on_complete(&mut self, callback: impl FnOnce(&InteractionMetrics) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Start listening; the start time is latched on the first call only
    pub fn attach(&mut self, now_ms: i64) {
        self.attached = true;
        if self.start_time.is_none() {
            self.start_time = Some(now_ms);
        }
        self.latch_enabled(now_ms);
    }

    /// Stop listening for interaction events
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Update the externally supplied enablement flag
    pub fn set_enabled(&mut self, enabled: bool, now_ms: i64) {
        self.enabled = enabled;
        self.latch_enabled(now_ms);
    }

    fn latch_enabled(&mut self, now_ms: i64) {
        if self.attached && self.enabled && self.enabled_at.is_none() {
            debug!(now_ms, "interaction target enabled");
            self.enabled_at = Some(now_ms);
        }
    }

    /// Record one event, capturing the enablement flag as it is right now
    pub fn record_event(&mut self, kind: InteractionKind, now_ms: i64) {
        if !self.attached {
            return;
        }
        let enabled = self.enabled;
        let timestamp = now_ms - self.start_time.unwrap_or(now_ms);
        self.events.push(InteractionEvent {
            timestamp,
            kind,
            enabled_at_capture: enabled,
        });

        match kind {
            InteractionKind::Click if !enabled => self.premature_clicks += 1,
            InteractionKind::Hover if !enabled => self.premature_hovers += 1,
            InteractionKind::Focus => self.focus_events += 1,
            _ => {}
        }
    }

    pub fn click(&mut self, now_ms: i64) {
        self.record_event(InteractionKind::Click, now_ms);
    }

    pub fn hover(&mut self, now_ms: i64) {
        self.record_event(InteractionKind::Hover, now_ms);
    }

    pub fn focus(&mut self, now_ms: i64) {
        self.record_event(InteractionKind::Focus, now_ms);
    }

    /// Latch the accepting click. Only the first call has any effect.
    pub fn record_click(&mut self, now_ms: i64) {
        if self.clicked_at.is_some() {
            return;
        }
        self.clicked_at = Some(now_ms);
        let metrics = self.metrics(now_ms);
        info!(
            premature_clicks = metrics.premature_clicks,
            time_to_click_ms = ?metrics.time_to_click_after_enabled_ms,
            "accept click recorded"
        );
        if let Some(callback) = self.on_complete.take() {
            callback(&metrics);
        }
    }

    /// Metrics as of `now_ms` (only used while no click has been latched)
    pub fn metrics(&self, now_ms: i64) -> InteractionMetrics {
        let time_button_enabled_ms = self
            .enabled_at
            .map(|enabled_at| self.clicked_at.unwrap_or(now_ms) - enabled_at)
            .unwrap_or(0);

        let time_to_click_after_enabled_ms = match (self.enabled_at, self.clicked_at) {
            (Some(enabled_at), Some(clicked_at)) => Some(clicked_at - enabled_at),
            _ => None,
        };

        InteractionMetrics {
            premature_clicks: self.premature_clicks,
            premature_hovers: self.premature_hovers,
            focus_events: self.focus_events,
            time_button_enabled_ms,
            time_to_click_after_enabled_ms,
            events: self.events.clone(),
        }
    }

    /// Return to the initial state for a fresh run; the callback is kept
    pub fn reset(&mut self) {
        let on_complete = self.on_complete.take();
        *self = Self::new();
        self.on_complete = on_complete;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_finalized(&self) -> bool {
        self.clicked_at.is_some()
    }

    pub fn enabled_at(&self) -> Option<i64> {
        self.enabled_at
    }

    pub fn events(&self) -> &[InteractionEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn attached(now_ms: i64) -> InteractionRecorder {
        let mut recorder = InteractionRecorder::new();
        recorder.attach(now_ms);
        recorder
    }

    #[test]
    fn test_premature_interactions() {
        let mut recorder = attached(1_000);
        recorder.click(1_100);
        recorder.hover(1_200);
        recorder.focus(1_300);

        let metrics = recorder.metrics(1_400);
        assert_eq!(metrics.premature_clicks, 1);
        assert_eq!(metrics.premature_hovers, 1);
        assert_eq!(metrics.focus_events, 1);
        assert_eq!(metrics.events.len(), 3);
        assert_eq!(metrics.events[0].timestamp, 100);
        assert!(!metrics.events[0].enabled_at_capture);
    }

    #[test]
    fn test_enabled_interactions_are_not_premature() {
        let mut recorder = attached(0);
        recorder.set_enabled(true, 500);
        recorder.click(600);
        recorder.hover(700);
        recorder.focus(800);

        let metrics = recorder.metrics(900);
        assert_eq!(metrics.premature_clicks, 0);
        assert_eq!(metrics.premature_hovers, 0);
        assert_eq!(metrics.focus_events, 1);
        assert!(metrics.events.iter().all(|e| e.enabled_at_capture));
    }

    #[test]
    fn test_classification_uses_flag_at_capture() {
        let mut recorder = attached(0);
        recorder.click(100);
        recorder.set_enabled(true, 150);

        let metrics = recorder.metrics(200);
        assert_eq!(metrics.premature_clicks, 1);
        assert!(!metrics.events[0].enabled_at_capture);
    }

    #[test]
    fn test_enable_latch_is_first_transition_only() {
        let mut recorder = attached(0);
        recorder.set_enabled(true, 300);
        recorder.set_enabled(false, 400);
        recorder.set_enabled(true, 900);
        assert_eq!(recorder.enabled_at(), Some(300));
    }

    #[test]
    fn test_enabled_before_attach_latches_on_attach() {
        let mut recorder = InteractionRecorder::new();
        recorder.set_enabled(true, 50);
        assert_eq!(recorder.enabled_at(), None);
        recorder.attach(80);
        assert_eq!(recorder.enabled_at(), Some(80));
    }

    #[test]
    fn test_timing_before_and_after_click() {
        let mut recorder = attached(0);
        assert_eq!(recorder.metrics(100).time_button_enabled_ms, 0);

        recorder.set_enabled(true, 1_000);
        let live = recorder.metrics(1_750);
        assert_eq!(live.time_button_enabled_ms, 750);
        assert_eq!(live.time_to_click_after_enabled_ms, None);

        recorder.record_click(2_500);
        let done = recorder.metrics(10_000);
        assert_eq!(done.time_button_enabled_ms, 1_500);
        assert_eq!(done.time_to_click_after_enabled_ms, Some(1_500));
    }

    #[test]
    fn test_click_without_enable_has_no_time_to_click() {
        let mut recorder = attached(0);
        recorder.record_click(400);
        let metrics = recorder.metrics(500);
        assert_eq!(metrics.time_to_click_after_enabled_ms, None);
        assert_eq!(metrics.time_button_enabled_ms, 0);
    }

    #[test]
    fn test_record_click_is_idempotent() {
        let calls = Rc::new(Cell::new(0));
        let mut recorder = attached(0);
        {
            let calls = Rc::clone(&calls);
            recorder.on_complete(move |_| calls.set(calls.get() + 1));
        }
        recorder.set_enabled(true, 100);
        recorder.record_click(300);
        recorder.record_click(900);

        assert_eq!(calls.get(), 1);
        assert_eq!(recorder.metrics(1_000).time_to_click_after_enabled_ms, Some(200));
    }

    #[test]
    fn test_detached_recorder_ignores_events() {
        let mut recorder = attached(0);
        recorder.detach();
        recorder.click(100);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut recorder = attached(0);
        recorder.set_enabled(true, 10);
        recorder.click(20);
        recorder.record_click(30);
        recorder.reset();

        assert!(!recorder.is_finalized());
        assert!(!recorder.is_enabled());
        assert_eq!(recorder.metrics(40), InteractionMetrics::default());
    }
}
