//! Study session orchestration
//!
//! Drives one participant through welcome → intro → two variant runs →
//! download → results, in the counterbalanced order assigned at creation.

use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::randomization::{generate_session_id, randomize_variant_order};
use crate::tracker::{Gating, VariantTracker};
use crate::types::{
    DownloadTaskData, IntroTaskData, Position, SessionResults, Variant, VariantMetrics,
    VariantOrder, VariantResults,
};
use chrono::{DateTime, SecondsFormat};
use tracing::{info, warn};

/// Where a session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyPhase {
    Welcome,
    Intro,
    Test(Position),
    Download,
    Results,
}

/// One participant's pass through the study
pub struct StudySession {
    config: MetricsConfig,
    session_id: String,
    variant_order: VariantOrder,
    phase: StudyPhase,
    tasks_started_at: Option<i64>,
    intro: Option<IntroTaskData>,
    variants: VariantResults,
    download: Option<DownloadTaskData>,
    active: Option<VariantTracker>,
}

impl StudySession {
    /// New session with a fresh identifier and a randomized order
    pub fn new(config: MetricsConfig) -> Self {
        let order = randomize_variant_order(&mut rand::rng());
        Self::with_assignment(config, generate_session_id(), order)
    }

    /// New session with a caller-chosen identifier and order
    pub fn with_assignment(
        config: MetricsConfig,
        session_id: String,
        variant_order: VariantOrder,
    ) -> Self {
        info!(%session_id, order = %variant_order, "session initialized");
        Self {
            config,
            session_id,
            variant_order,
            phase: StudyPhase::Welcome,
            tasks_started_at: None,
            intro: None,
            variants: VariantResults::default(),
            download: None,
            active: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn variant_order(&self) -> VariantOrder {
        self.variant_order
    }

    pub fn phase(&self) -> StudyPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: StudyPhase) {
        info!(from = ?self.phase, to = ?phase, "session phase changed");
        self.phase = phase;
    }

    /// Leave the welcome screen
    pub fn begin(&mut self) {
        if self.phase == StudyPhase::Welcome {
            self.set_phase(StudyPhase::Intro);
        }
    }

    /// Store the intro record and start the first variant run
    pub fn complete_intro(&mut self, data: IntroTaskData, now_ms: i64) {
        if self.phase != StudyPhase::Intro {
            warn!(phase = ?self.phase, "intro completion ignored outside intro phase");
            return;
        }
        self.intro = Some(data);
        self.tasks_started_at = Some(now_ms);
        self.start_test(Position::First);
    }

    fn start_test(&mut self, position: Position) {
        let variant = self.variant_order.variant_at(position);
        self.active = Some(
            VariantTracker::new(variant, position, self.config.clone())
                .with_gating(Gating::ScrollCompletion),
        );
        self.set_phase(StudyPhase::Test(position));
    }

    /// Variant of the run in progress
    pub fn current_variant(&self) -> Option<Variant> {
        self.active.as_ref().map(|t| t.variant())
    }

    /// Tracker of the run in progress, for feeding scroll and interaction input
    pub fn tracker_mut(&mut self) -> Option<&mut VariantTracker> {
        self.active.as_mut()
    }

    /// Finalize the run in progress and advance to the next step
    pub fn complete_current_test(&mut self, now_ms: i64) -> Option<VariantMetrics> {
        let StudyPhase::Test(position) = self.phase else {
            return None;
        };
        let mut tracker = self.active.take()?;
        let mut metrics = tracker.complete_task(now_ms);
        metrics.order = self.variant_order.position_of(metrics.variant);
        info!(
            test = position.number(),
            variant = %metrics.variant,
            time_on_task_ms = metrics.time_on_task_ms,
            "test complete"
        );
        self.variants.insert(metrics.clone());

        match position {
            Position::First => self.start_test(Position::Second),
            Position::Second => self.set_phase(StudyPhase::Download),
        }
        Some(metrics)
    }

    /// Store the post-task record and move to results
    pub fn complete_download(&mut self, data: DownloadTaskData) {
        if self.phase != StudyPhase::Download {
            warn!(phase = ?self.phase, "download completion ignored outside download phase");
            return;
        }
        self.download = Some(data);
        self.set_phase(StudyPhase::Results);
    }

    /// Assemble the session record; `None` until every step has completed
    pub fn build_results(&self, now_ms: i64) -> Option<SessionResults> {
        let intro = self.intro.as_ref()?;
        let download = self.download.as_ref()?;
        let started_at = self.tasks_started_at?;
        if !self.variants.is_complete() {
            return None;
        }

        Some(SessionResults {
            session_id: self.session_id.clone(),
            timestamp: iso_timestamp(now_ms),
            variant_order: self.variant_order,
            total_time_ms: now_ms - started_at,
            intro_task: intro.clone(),
            variants: self.variants.clone(),
            download_task: Some(download.clone()),
        })
    }

    /// Like [`Self::build_results`], naming the first missing step
    pub fn require_results(&self, now_ms: i64) -> Result<SessionResults, MetricsError> {
        self.build_results(now_ms).ok_or_else(|| {
            let missing = if self.intro.is_none() {
                "intro task"
            } else if self.variants.control.is_none() || self.variants.button.is_none() {
                "variant runs"
            } else {
                "download task"
            };
            MetricsError::IncompleteSession(format!("{missing} not completed"))
        })
    }

    /// Start over as a brand-new session
    pub fn restart(&mut self) {
        if let Some(tracker) = self.active.as_mut() {
            tracker.teardown();
        }
        *self = Self::new(self.config.clone());
    }
}

/// RFC3339 with millisecond precision and a `Z` suffix
pub fn iso_timestamp(unix_ms: i64) -> String {
    DateTime::from_timestamp_millis(unix_ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::ContainerSnapshot;
    use crate::types::InteractionKind;

    fn intro() -> IntroTaskData {
        IntroTaskData {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            agreed_to_terms: true,
            completed_at: "2024-01-15T14:00:00.000Z".to_string(),
            duration_ms: 12_000,
        }
    }

    fn download() -> DownloadTaskData {
        DownloadTaskData {
            completed_at: "2024-01-15T14:05:00.000Z".to_string(),
            download_initiated: true,
        }
    }

    fn run_test(session: &mut StudySession, start: i64) {
        let tracker = session.tracker_mut().unwrap();
        tracker.activate(&ContainerSnapshot::new(0.0, 2000.0, 1000.0), start);
        tracker.handle_scroll(&ContainerSnapshot::new(1000.0, 2000.0, 1000.0), start + 1_000);
        tracker.record_interaction(InteractionKind::Click, start + 1_500);
        session.complete_current_test(start + 1_500).unwrap();
    }

    #[test]
    fn test_full_session_flow() {
        let order = VariantOrder::starting_with(Variant::Button);
        let mut session =
            StudySession::with_assignment(MetricsConfig::default(), "abc".to_string(), order);
        assert_eq!(session.phase(), StudyPhase::Welcome);

        session.begin();
        session.complete_intro(intro(), 100_000);
        assert_eq!(session.phase(), StudyPhase::Test(Position::First));
        assert_eq!(session.current_variant(), Some(Variant::Button));
        assert!(session.build_results(100_001).is_none());

        run_test(&mut session, 101_000);
        assert_eq!(session.current_variant(), Some(Variant::Control));

        run_test(&mut session, 110_000);
        assert_eq!(session.phase(), StudyPhase::Download);
        assert!(session.build_results(120_000).is_none());

        session.complete_download(download());
        let results = session.build_results(120_000).unwrap();
        assert_eq!(results.session_id, "abc");
        assert_eq!(results.total_time_ms, 20_000);
        assert_eq!(results.variant_order, order);
        assert_eq!(results.variants.button.as_ref().unwrap().order, Position::First);
        assert_eq!(results.variants.control.as_ref().unwrap().order, Position::Second);
        assert_eq!(
            results.variants.control.as_ref().unwrap().start_time,
            110_000
        );
        assert_eq!(results.timestamp, "1970-01-01T00:02:00.000Z");
    }

    #[test]
    fn test_require_results_names_missing_step() {
        let mut session = StudySession::new(MetricsConfig::default());
        session.begin();
        session.complete_intro(intro(), 0);
        match session.require_results(10) {
            Err(MetricsError::IncompleteSession(msg)) => assert!(msg.contains("variant")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_out_of_phase_steps_are_ignored() {
        let mut session = StudySession::new(MetricsConfig::default());
        session.complete_intro(intro(), 0);
        assert_eq!(session.phase(), StudyPhase::Welcome);
        assert!(session.complete_current_test(10).is_none());
        session.complete_download(download());
        assert_eq!(session.phase(), StudyPhase::Welcome);
    }

    #[test]
    fn test_restart_assigns_new_session() {
        let mut session = StudySession::new(MetricsConfig::default());
        let first_id = session.session_id().to_string();
        session.begin();
        session.complete_intro(intro(), 0);
        session.restart();
        assert_ne!(session.session_id(), first_id);
        assert_eq!(session.phase(), StudyPhase::Welcome);
        assert!(session.tracker_mut().is_none());
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(1_705_327_200_000), "2024-01-15T14:00:00.000Z");
    }
}
