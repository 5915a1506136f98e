//! Progress milestones
//!
//! Latches the first time each progress threshold is reached. A latched value
//! is never overwritten, even after scrolling back and crossing again.

use crate::types::Milestones;

/// A fixed progress threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Percent25,
    Percent50,
    Percent75,
    Percent100,
}

impl Milestone {
    pub const ALL: [Milestone; 4] = [
        Milestone::Percent25,
        Milestone::Percent50,
        Milestone::Percent75,
        Milestone::Percent100,
    ];

    pub fn threshold(&self) -> f64 {
        match self {
            Milestone::Percent25 => 25.0,
            Milestone::Percent50 => 50.0,
            Milestone::Percent75 => 75.0,
            Milestone::Percent100 => 100.0,
        }
    }
}

/// First-write-wins milestone latch
#[derive(Debug, Clone, Default)]
pub struct MilestoneTracker {
    milestones: Milestones,
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch every unset milestone at or below `progress`; returns the ones set now
    pub fn record(&mut self, progress: f64, timestamp: i64) -> Vec<Milestone> {
        let mut latched = Vec::new();
        for milestone in Milestone::ALL {
            if progress < milestone.threshold() {
                break;
            }
            let slot = self.slot_mut(milestone);
            if slot.is_none() {
                *slot = Some(timestamp);
                latched.push(milestone);
            }
        }
        latched
    }

    pub fn get(&self, milestone: Milestone) -> Option<i64> {
        match milestone {
            Milestone::Percent25 => self.milestones.percent25,
            Milestone::Percent50 => self.milestones.percent50,
            Milestone::Percent75 => self.milestones.percent75,
            Milestone::Percent100 => self.milestones.percent100,
        }
    }

    fn slot_mut(&mut self, milestone: Milestone) -> &mut Option<i64> {
        match milestone {
            Milestone::Percent25 => &mut self.milestones.percent25,
            Milestone::Percent50 => &mut self.milestones.percent50,
            Milestone::Percent75 => &mut self.milestones.percent75,
            Milestone::Percent100 => &mut self.milestones.percent100,
        }
    }

    pub fn milestones(&self) -> &Milestones {
        &self.milestones
    }
}
