//! Session data model
//!
//! Records produced by the metrics engine and consumed by the exporters. All
//! timestamps inside a variant record are milliseconds relative to the start of
//! that variant run unless a field says otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two interchangeable button designs compared in a study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Always-enabled accept button
    Control,
    /// Scroll-gated accept button
    Button,
}

impl Variant {
    /// Both variants, in canonical (export) order
    pub const ALL: [Variant; 2] = [Variant::Control, Variant::Button];

    /// Lowercase identifier used in filenames and CSV column prefixes
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Control => "control",
            Variant::Button => "button",
        }
    }

    /// The variant this one is compared against
    pub fn other(&self) -> Variant {
        match self {
            Variant::Control => Variant::Button,
            Variant::Button => Variant::Control,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation slot of a variant within a session (serialized as 1 or 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Position {
    First,
    Second,
}

impl Position {
    pub const ALL: [Position; 2] = [Position::First, Position::Second];

    /// 1-based slot number
    pub fn number(&self) -> u8 {
        match self {
            Position::First => 1,
            Position::Second => 2,
        }
    }

    fn index(&self) -> usize {
        self.number() as usize - 1
    }
}

impl From<Position> for u8 {
    fn from(position: Position) -> Self {
        position.number()
    }
}

impl TryFrom<u8> for Position {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Position::First),
            2 => Ok(Position::Second),
            other => Err(format!("presentation order must be 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Counterbalanced presentation order of the two variants
///
/// Always holds both variants exactly once; serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[Variant; 2]", try_from = "[Variant; 2]")]
pub struct VariantOrder {
    slots: [Variant; 2],
}

impl VariantOrder {
    /// Order with `first` presented first and the other variant second
    pub fn starting_with(first: Variant) -> Self {
        Self {
            slots: [first, first.other()],
        }
    }

    /// The variant shown at `position`
    pub fn variant_at(&self, position: Position) -> Variant {
        self.slots[position.index()]
    }

    /// The slot `variant` occupies
    pub fn position_of(&self, variant: Variant) -> Position {
        if self.slots[0] == variant {
            Position::First
        } else {
            Position::Second
        }
    }

    /// Variants in presentation order
    pub fn as_array(&self) -> [Variant; 2] {
        self.slots
    }
}

impl From<VariantOrder> for [Variant; 2] {
    fn from(order: VariantOrder) -> Self {
        order.slots
    }
}

impl TryFrom<[Variant; 2]> for VariantOrder {
    type Error = String;

    fn try_from(slots: [Variant; 2]) -> Result<Self, Self::Error> {
        if slots[0] == slots[1] {
            return Err(format!("variant order repeats '{}'", slots[0]));
        }
        Ok(Self { slots })
    }
}

impl fmt::Display for VariantOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.slots[0], self.slots[1])
    }
}

/// One derived speed reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSpeedSample {
    /// Capture time relative to run start (ms)
    pub timestamp: i64,
    /// Absolute scroll speed (px/s)
    pub speed: f64,
    /// Scroll offset at capture (px)
    pub position: f64,
}

/// A committed reading pause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPause {
    /// Pause start relative to run start (ms)
    pub timestamp: i64,
    pub duration_ms: i64,
    /// Scroll offset where the pause began (px)
    pub position: f64,
}

/// First-crossing times of the progress thresholds (relative ms)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent25: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent50: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent75: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent100: Option<i64>,
}

/// Aggregated scroll behavior for one variant run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    /// Time until the container first left offset 0 (ms, 0 if never)
    pub time_to_first_scroll_ms: i64,
    pub milestones: Milestones,
    pub speed_samples: Vec<ScrollSpeedSample>,
    /// Mean of valid speeds (px/s), 0 when none
    pub average_speed: f64,
    /// Max of valid speeds (px/s), 0 when none
    pub max_speed: f64,
    pub pauses: Vec<ScrollPause>,
    pub direction_changes: u32,
    /// Deepest progress reached (0-100)
    pub final_depth_percent: f64,
}

/// Kind of interaction observed on the gated element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Click,
    Hover,
    Focus,
}

/// A single interaction with the enablement flag captured at that instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    /// Relative to recorder start (ms)
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub enabled_at_capture: bool,
}

/// Aggregated interaction behavior for one variant run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetrics {
    pub premature_clicks: u32,
    pub premature_hovers: u32,
    pub focus_events: u32,
    /// Time the element has been enabled, up to the click (or now)
    pub time_button_enabled_ms: i64,
    /// Present only once the element was enabled and then clicked
    pub time_to_click_after_enabled_ms: Option<i64>,
    pub events: Vec<InteractionEvent>,
}

/// Finalized record of one variant run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMetrics {
    pub variant: Variant,
    pub order: Position,
    /// Unix ms
    pub start_time: i64,
    /// Unix ms
    pub end_time: i64,
    pub time_on_task_ms: i64,
    pub scroll_metrics: ScrollMetrics,
    pub interaction_metrics: InteractionMetrics,
}

/// Sign-up step completed before the variant runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroTaskData {
    pub name: String,
    pub email: String,
    pub agreed_to_terms: bool,
    /// RFC3339
    pub completed_at: String,
    pub duration_ms: i64,
}

/// Post-task step completed after both variant runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTaskData {
    /// RFC3339
    pub completed_at: String,
    pub download_initiated: bool,
}

/// Variant records keyed by identity rather than presentation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantResults {
    pub control: Option<VariantMetrics>,
    pub button: Option<VariantMetrics>,
}

impl VariantResults {
    pub fn get(&self, variant: Variant) -> Option<&VariantMetrics> {
        match variant {
            Variant::Control => self.control.as_ref(),
            Variant::Button => self.button.as_ref(),
        }
    }

    /// File a record under its own variant, replacing any previous one
    pub fn insert(&mut self, metrics: VariantMetrics) {
        match metrics.variant {
            Variant::Control => self.control = Some(metrics),
            Variant::Button => self.button = Some(metrics),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.control.is_some() && self.button.is_some()
    }
}

/// Complete two-variant session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResults {
    pub session_id: String,
    /// RFC3339 build time
    pub timestamp: String,
    pub variant_order: VariantOrder,
    /// From intro completion to results build (ms)
    pub total_time_ms: i64,
    pub intro_task: IntroTaskData,
    pub variants: VariantResults,
    pub download_task: Option<DownloadTaskData>,
}
