//! Recorded session traces
//!
//! A trace is a JSON document listing, per variant run, the timestamped
//! container reads and interaction events a participant produced. Replaying
//! it through a [`StudySession`] reproduces the session record offline.
//!
//! ```json
//! {
//!   "sessionId": "3f2a9c1e-...",
//!   "variantOrder": ["button", "control"],
//!   "intro": { "name": "Ada", "email": "ada@example.com", "agreedToTerms": true,
//!              "completedAt": "2024-01-15T14:00:00.000Z", "durationMs": 9000 },
//!   "introCompletedAt": 1705327200000,
//!   "runs": [
//!     { "variant": "button", "events": [
//!       { "at": 1705327201000, "action": "activate", "offset": 0,
//!         "scrollExtent": 3000, "visibleExtent": 1000 },
//!       { "at": 1705327201400, "action": "scroll", "offset": 800,
//!         "scrollExtent": 3000, "visibleExtent": 1000 },
//!       { "at": 1705327203000, "action": "click" },
//!       { "at": 1705327203000, "action": "complete" }
//!     ] }
//!   ],
//!   "download": { "completedAt": "2024-01-15T14:05:00.000Z", "downloadInitiated": true },
//!   "finishedAt": 1705327500000
//! }
//! ```

use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::randomization::{generate_session_id, randomize_variant_order};
use crate::scroll::ContainerSnapshot;
use crate::session::{StudyPhase, StudySession};
use crate::types::{
    DownloadTaskData, InteractionKind, IntroTaskData, Position, SessionResults, Variant,
    VariantOrder,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One recorded input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TraceAction {
    /// The run becomes visible; starts sampling
    Activate(ContainerSnapshot),
    /// A scroll event fired
    Scroll(ContainerSnapshot),
    /// The periodic timer fired
    Tick(ContainerSnapshot),
    /// Externally driven enablement change
    SetEnabled { enabled: bool },
    Click,
    Hover,
    Focus,
    /// The accepting click finalized the run
    Complete,
}

/// A recorded input at an absolute time (unix ms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at: i64,
    #[serde(flatten)]
    pub action: TraceAction,
}

/// All inputs of one variant run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRunTrace {
    pub variant: Variant,
    pub events: Vec<TraceEvent>,
}

/// A full recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTrace {
    /// Generated when absent
    #[serde(default)]
    pub session_id: Option<String>,
    /// Randomized when absent
    #[serde(default)]
    pub variant_order: Option<VariantOrder>,
    pub intro: IntroTaskData,
    pub intro_completed_at: i64,
    pub runs: Vec<VariantRunTrace>,
    pub download: DownloadTaskData,
    pub finished_at: i64,
}

impl SessionTrace {
    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        serde_json::from_str(json).map_err(|e| MetricsError::TraceParse(e.to_string()))
    }

    fn run_for(&self, variant: Variant) -> Result<&VariantRunTrace, MetricsError> {
        let mut matching = self.runs.iter().filter(|r| r.variant == variant);
        let run = matching
            .next()
            .ok_or_else(|| MetricsError::TraceParse(format!("no run recorded for '{variant}'")))?;
        if matching.next().is_some() {
            return Err(MetricsError::TraceParse(format!(
                "more than one run recorded for '{variant}'"
            )));
        }
        Ok(run)
    }

    /// Replay every step through a fresh session and build its record
    pub fn replay(&self, config: MetricsConfig) -> Result<SessionResults, MetricsError> {
        let session_id = self.session_id.clone().unwrap_or_else(generate_session_id);
        let order = self
            .variant_order
            .unwrap_or_else(|| randomize_variant_order(&mut rand::rng()));
        let mut session = StudySession::with_assignment(config, session_id, order);

        session.begin();
        session.complete_intro(self.intro.clone(), self.intro_completed_at);

        for position in Position::ALL {
            let variant = order.variant_at(position);
            replay_run(&mut session, self.run_for(variant)?)?;
        }

        if session.phase() != StudyPhase::Download {
            return Err(MetricsError::TraceParse(
                "variant runs did not finish".to_string(),
            ));
        }
        session.complete_download(self.download.clone());
        session.require_results(self.finished_at)
    }
}

fn replay_run(session: &mut StudySession, run: &VariantRunTrace) -> Result<(), MetricsError> {
    let variant = run.variant;
    let mut last_at = i64::MIN;

    for event in &run.events {
        if event.at < last_at {
            return Err(MetricsError::TraceParse(format!(
                "events for '{variant}' are out of order at {}",
                event.at
            )));
        }
        last_at = event.at;

        if matches!(event.action, TraceAction::Complete) {
            session.complete_current_test(event.at);
            debug!(%variant, at = event.at, "run replayed");
            return Ok(());
        }

        let tracker = session.tracker_mut().ok_or_else(|| {
            MetricsError::TraceParse(format!("no active run for '{variant}'"))
        })?;
        match &event.action {
            TraceAction::Activate(c) => tracker.activate(c, event.at),
            TraceAction::Scroll(c) => tracker.handle_scroll(c, event.at),
            TraceAction::Tick(c) => {
                tracker.tick(c, event.at);
            }
            TraceAction::SetEnabled { enabled } => tracker.set_enabled(*enabled, event.at),
            TraceAction::Click => tracker.record_interaction(InteractionKind::Click, event.at),
            TraceAction::Hover => tracker.record_interaction(InteractionKind::Hover, event.at),
            TraceAction::Focus => tracker.record_interaction(InteractionKind::Focus, event.at),
            TraceAction::Complete => {}
        }
    }

    Err(MetricsError::TraceParse(format!(
        "run for '{variant}' never completes"
    )))
}
