//! Scroll metrics engine
//!
//! Container reads flow sampler → motion analyzer → milestone tracker, and the
//! engine aggregates them into [`crate::types::ScrollMetrics`].

pub mod engine;
pub mod milestones;
pub mod motion;
pub mod sampler;

pub use engine::ScrollMetricsEngine;
pub use milestones::{Milestone, MilestoneTracker};
pub use motion::{DiscardReason, MotionAnalyzer, MotionOutcome, PauseState, ScrollDirection};
pub use sampler::{
    container_progress, progress_percent, ContainerSnapshot, RawSample, SampleTrigger,
    ScrollContainer, ScrollSampler,
};
