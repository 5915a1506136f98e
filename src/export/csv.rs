//! Tabular export
//!
//! Flattens a session into a header line and exactly one data row. Variant
//! columns are keyed by variant identity; a missing variant yields zeros.

use crate::types::{SessionResults, Variant, VariantMetrics};
use std::fmt::Write as _;

/// Scalar metrics exported per variant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantColumns {
    pub order: u8,
    pub time_ms: i64,
    pub avg_speed: f64,
    pub max_speed: f64,
    pub premature_clicks: u32,
    pub pauses: usize,
    pub direction_changes: u32,
    pub time_to_click: i64,
}

impl VariantColumns {
    fn from_metrics(metrics: Option<&VariantMetrics>) -> Self {
        let Some(m) = metrics else {
            return Self::default();
        };
        Self {
            order: m.order.number(),
            time_ms: m.time_on_task_ms,
            avg_speed: m.scroll_metrics.average_speed,
            max_speed: m.scroll_metrics.max_speed,
            premature_clicks: m.interaction_metrics.premature_clicks,
            pauses: m.scroll_metrics.pauses.len(),
            direction_changes: m.scroll_metrics.direction_changes,
            time_to_click: m
                .interaction_metrics
                .time_to_click_after_enabled_ms
                .unwrap_or(0),
        }
    }

    fn push_fields(&self, prefix: &str, fields: &mut Vec<(String, String)>) {
        let mut push = |name: &str, value: String| {
            fields.push((format!("{prefix}_{name}"), value));
        };
        push("order", self.order.to_string());
        push("timeMs", self.time_ms.to_string());
        push("avgSpeed", self.avg_speed.to_string());
        push("maxSpeed", self.max_speed.to_string());
        push("prematureClicks", self.premature_clicks.to_string());
        push("pauses", self.pauses.to_string());
        push("directionChanges", self.direction_changes.to_string());
        push("timeToClick", self.time_to_click.to_string());
    }
}

/// One flattened session
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub session_id: String,
    pub timestamp: String,
    pub variant_order: String,
    pub total_time_ms: i64,
    pub intro_name: String,
    pub intro_email: String,
    pub intro_duration_ms: i64,
    pub control: VariantColumns,
    pub button: VariantColumns,
}

impl CsvRow {
    pub fn from_results(results: &SessionResults) -> Self {
        Self {
            session_id: results.session_id.clone(),
            timestamp: results.timestamp.clone(),
            variant_order: results.variant_order.to_string(),
            total_time_ms: results.total_time_ms,
            intro_name: results.intro_task.name.clone(),
            intro_email: results.intro_task.email.clone(),
            intro_duration_ms: results.intro_task.duration_ms,
            control: VariantColumns::from_metrics(results.variants.get(Variant::Control)),
            button: VariantColumns::from_metrics(results.variants.get(Variant::Button)),
        }
    }

    /// Column name and rendered value, in output order
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("sessionId".to_string(), self.session_id.clone()),
            ("timestamp".to_string(), self.timestamp.clone()),
            ("variantOrder".to_string(), self.variant_order.clone()),
            ("totalTimeMs".to_string(), self.total_time_ms.to_string()),
            ("introName".to_string(), self.intro_name.clone()),
            ("introEmail".to_string(), self.intro_email.clone()),
            (
                "introDurationMs".to_string(),
                self.intro_duration_ms.to_string(),
            ),
        ];
        self.control.push_fields(Variant::Control.as_str(), &mut fields);
        self.button.push_fields(Variant::Button.as_str(), &mut fields);
        fields
    }

    /// Header line, newline, data line
    pub fn to_csv_string(&self) -> String {
        let fields = self.fields();
        let mut out = String::new();
        for (i, (name, _)) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&escape_field(name));
        }
        out.push('\n');
        for (i, (_, value)) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}", escape_field(value));
        }
        out
    }
}

/// Quote a field containing a comma, quote or newline; double inner quotes
pub fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render a session as CSV text
pub fn results_to_csv(results: &SessionResults) -> String {
    CsvRow::from_results(results).to_csv_string()
}
