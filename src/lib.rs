//! Scrollgate - behavioral metrics for scroll-gated button A/B studies
//!
//! Scrollgate measures how a participant scrolls through, and interacts with,
//! two interface variants presented in a counterbalanced order:
//! container sampling → motion analysis → milestone tracking → per-variant
//! aggregation → session record → JSON / CSV export.
//!
//! ## Modules
//!
//! - **Scroll**: Sample a scroll container and derive speed, pauses, direction
//!   changes and depth milestones
//! - **Interaction**: Classify clicks, hovers and focus against the gate state
//! - **Session**: Orchestrate a full study pass and assemble its record
//! - **Export**: Serialize, deliver and summarize session records

pub mod config;
pub mod error;
pub mod export;
pub mod interaction;
pub mod randomization;
pub mod scroll;
pub mod session;
pub mod trace;
pub mod tracker;
pub mod types;

pub use config::MetricsConfig;
pub use error::MetricsError;
pub use interaction::InteractionRecorder;
pub use scroll::{ContainerSnapshot, ScrollContainer, ScrollMetricsEngine};
pub use session::{StudyPhase, StudySession};
pub use tracker::{Gating, VariantTracker};

// Record exports
pub use types::{
    InteractionKind, Position, SessionResults, Variant, VariantMetrics, VariantOrder,
};

/// Scrollgate version
pub const SCROLLGATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name recorded by tooling built on this crate
pub const PRODUCER_NAME: &str = "scrollgate";
