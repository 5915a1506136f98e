//! Human-readable session report

use crate::types::{SessionResults, Variant, VariantMetrics};
use std::fmt::Write as _;
use tracing::{info, info_span};

fn variant_title(variant: Variant) -> &'static str {
    match variant {
        Variant::Control => "Control Variant",
        Variant::Button => "Button Variant (Scroll-Gated)",
    }
}

fn seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

fn write_variant(out: &mut String, m: &VariantMetrics) {
    let _ = writeln!(out, "{} (Order: {})", variant_title(m.variant), m.order);
    let _ = writeln!(out, "  Time on Task: {:.2}s", seconds(m.time_on_task_ms));
    let _ = writeln!(
        out,
        "  Avg Scroll Speed: {:.1} px/s",
        m.scroll_metrics.average_speed
    );
    let _ = writeln!(
        out,
        "  Max Scroll Speed: {:.1} px/s",
        m.scroll_metrics.max_speed
    );
    let _ = writeln!(
        out,
        "  Premature Clicks: {}",
        m.interaction_metrics.premature_clicks
    );
    let _ = writeln!(out, "  Scroll Pauses: {}", m.scroll_metrics.pauses.len());
    let _ = writeln!(
        out,
        "  Direction Changes: {}",
        m.scroll_metrics.direction_changes
    );
    match m.interaction_metrics.time_to_click_after_enabled_ms {
        Some(ms) => {
            let _ = writeln!(out, "  Time to Click After Enabled: {:.2}s", seconds(ms));
        }
        None => {
            let _ = writeln!(out, "  Time to Click After Enabled: n/a");
        }
    }
}

fn recorded_variants(results: &SessionResults) -> usize {
    Variant::ALL
        .iter()
        .filter(|v| results.variants.get(**v).is_some())
        .count()
}

fn download_status(results: &SessionResults) -> &'static str {
    match &results.download_task {
        Some(task) if task.download_initiated => "initiated",
        Some(_) => "skipped",
        None => "not reached",
    }
}

/// Grouped text summary: header, intro, each recorded variant, then totals
pub fn render_report(results: &SessionResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "User Test Results");
    let _ = writeln!(out, "Session ID: {}", results.session_id);
    let _ = writeln!(out, "Timestamp: {}", results.timestamp);
    let _ = writeln!(out, "Variant Order: {}", results.variant_order);
    let _ = writeln!(out, "Total Time: {:.2}s", seconds(results.total_time_ms));

    let _ = writeln!(out, "\nIntro Task");
    let _ = writeln!(out, "  Name: {}", results.intro_task.name);
    let _ = writeln!(out, "  Email: {}", results.intro_task.email);
    let _ = writeln!(
        out,
        "  Duration: {:.2}s",
        seconds(results.intro_task.duration_ms)
    );

    for variant in results.variant_order.as_array() {
        if let Some(m) = results.variants.get(variant) {
            out.push('\n');
            write_variant(&mut out, m);
        }
    }

    let _ = writeln!(out, "\nSummary");
    let _ = writeln!(
        out,
        "  Variants Recorded: {}/{}",
        recorded_variants(results),
        Variant::ALL.len()
    );
    let _ = writeln!(out, "  Total Time: {:.2}s", seconds(results.total_time_ms));
    let _ = writeln!(out, "  Download: {}", download_status(results));
    out
}

/// Emit the session summary as structured log events
pub fn log_results(results: &SessionResults) {
    info!(
        session_id = %results.session_id,
        timestamp = %results.timestamp,
        variant_order = %results.variant_order,
        total_time_s = seconds(results.total_time_ms),
        "user test results"
    );

    {
        let _intro = info_span!("intro").entered();
        info!(
            name = %results.intro_task.name,
            email = %results.intro_task.email,
            duration_s = seconds(results.intro_task.duration_ms),
            "intro task"
        );
    }

    for variant in results.variant_order.as_array() {
        let Some(m) = results.variants.get(variant) else {
            continue;
        };
        let _span = info_span!("variant", variant = %m.variant, order = %m.order).entered();
        info!(
            time_on_task_s = seconds(m.time_on_task_ms),
            avg_speed = m.scroll_metrics.average_speed,
            max_speed = m.scroll_metrics.max_speed,
            premature_clicks = m.interaction_metrics.premature_clicks,
            pauses = m.scroll_metrics.pauses.len(),
            direction_changes = m.scroll_metrics.direction_changes,
            time_to_click_s = ?m.interaction_metrics.time_to_click_after_enabled_ms.map(seconds),
            "{}",
            variant_title(m.variant)
        );
    }

    let _summary = info_span!("summary").entered();
    info!(
        variants_recorded = recorded_variants(results),
        total_time_s = seconds(results.total_time_ms),
        download = download_status(results),
        "session summary"
    );
}
