//! Results export
//!
//! Turns a finished [`SessionResults`] into a pretty JSON document, a
//! single-row CSV table and a logged summary, and delivers the files through
//! an [`ArtifactSink`].

pub mod csv;
pub mod delivery;
pub mod json;
pub mod report;

pub use csv::{escape_field, results_to_csv, CsvRow, VariantColumns};
pub use delivery::{
    artifact_filename, deliver_artifact, ArtifactSink, BlobHandle, BlobStore, DirectorySink,
    ExportArtifact, ExportFormat, MemorySink,
};
pub use json::{results_from_json, results_to_json};
pub use report::{log_results, render_report};

use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::types::SessionResults;
use tracing::info;

/// Filenames produced by [`Exporter::export_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub json_filename: String,
    pub csv_filename: String,
}

/// Delivers session exports to a sink
pub struct Exporter<S: ArtifactSink> {
    filename_prefix: String,
    blobs: BlobStore,
    sink: S,
}

impl<S: ArtifactSink> Exporter<S> {
    pub fn new(config: &MetricsConfig, sink: S) -> Self {
        Self {
            filename_prefix: config.filename_prefix.clone(),
            blobs: BlobStore::new(config.blob_release_delay_ms),
            sink,
        }
    }

    fn deliver(
        &mut self,
        results: &SessionResults,
        format: ExportFormat,
        contents: String,
        filename: Option<&str>,
        now_ms: i64,
    ) -> Result<String, MetricsError> {
        let filename = match filename {
            Some(name) => name.to_string(),
            None => artifact_filename(&self.filename_prefix, &results.session_id, now_ms, format),
        };
        let artifact = ExportArtifact::new(filename.clone(), format, contents.into_bytes());
        deliver_artifact(&mut self.blobs, &mut self.sink, artifact, now_ms)?;
        info!(%filename, media_type = format.media_type(), "results exported");
        Ok(filename)
    }

    /// Deliver the JSON document; returns the filename used
    pub fn export_json(
        &mut self,
        results: &SessionResults,
        filename: Option<&str>,
        now_ms: i64,
    ) -> Result<String, MetricsError> {
        let contents = results_to_json(results)?;
        self.deliver(results, ExportFormat::Json, contents, filename, now_ms)
    }

    /// Deliver the CSV table; returns the filename used
    pub fn export_csv(
        &mut self,
        results: &SessionResults,
        filename: Option<&str>,
        now_ms: i64,
    ) -> Result<String, MetricsError> {
        let contents = results_to_csv(results);
        self.deliver(results, ExportFormat::Csv, contents, filename, now_ms)
    }

    /// Log the summary, then deliver JSON followed by CSV
    pub fn export_all(
        &mut self,
        results: &SessionResults,
        now_ms: i64,
    ) -> Result<ExportSummary, MetricsError> {
        log_results(results);
        let json_filename = self.export_json(results, None, now_ms)?;
        let csv_filename = self.export_csv(results, None, now_ms)?;
        Ok(ExportSummary {
            json_filename,
            csv_filename,
        })
    }

    /// Release staged blobs whose delay has elapsed
    pub fn release_due(&mut self, now_ms: i64) -> usize {
        self.blobs.release_due(now_ms)
    }

    pub fn resident_blobs(&self) -> usize {
        self.blobs.resident_count()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntroTaskData, Variant, VariantOrder, VariantResults};
    use pretty_assertions::assert_eq;

    fn results() -> SessionResults {
        SessionResults {
            session_id: "deadbeef-1234-4abc-8def-000000000000".to_string(),
            timestamp: "2024-01-15T14:00:00.000Z".to_string(),
            variant_order: VariantOrder::starting_with(Variant::Control),
            total_time_ms: 1_000,
            intro_task: IntroTaskData::default(),
            variants: VariantResults::default(),
            download_task: None,
        }
    }

    #[test]
    fn test_export_all_delivers_json_then_csv() {
        let mut exporter = Exporter::new(&MetricsConfig::default(), MemorySink::new());
        let summary = exporter.export_all(&results(), 1_700_000_000_000).unwrap();

        assert_eq!(
            summary.json_filename,
            "user-test-results-deadbeef-1700000000000.json"
        );
        assert_eq!(
            summary.csv_filename,
            "user-test-results-deadbeef-1700000000000.csv"
        );

        let delivered = exporter.sink().delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].media_type, "application/json");
        assert_eq!(delivered[1].media_type, "text/csv");
        assert!(String::from_utf8_lossy(&delivered[1].contents).starts_with("sessionId,"));
    }

    #[test]
    fn test_explicit_filename() {
        let mut exporter = Exporter::new(&MetricsConfig::default(), MemorySink::new());
        let name = exporter
            .export_csv(&results(), Some("custom.csv"), 0)
            .unwrap();
        assert_eq!(name, "custom.csv");
        assert_eq!(exporter.sink().delivered()[0].filename, "custom.csv");
    }

    #[test]
    fn test_blobs_released_after_delay() {
        let config = MetricsConfig::default();
        let mut exporter = Exporter::new(&config, MemorySink::new());
        exporter.export_all(&results(), 10_000).unwrap();
        assert_eq!(exporter.resident_blobs(), 2);
        assert_eq!(exporter.release_due(10_000 + config.blob_release_delay_ms - 1), 0);
        assert_eq!(exporter.release_due(10_000 + config.blob_release_delay_ms), 2);
    }

    #[test]
    fn test_export_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = MetricsConfig {
            filename_prefix: "study".to_string(),
            ..Default::default()
        };
        let mut exporter = Exporter::new(&config, DirectorySink::new(dir.path()));
        let summary = exporter.export_all(&results(), 42).unwrap();

        let json = std::fs::read_to_string(dir.path().join(&summary.json_filename)).unwrap();
        let parsed = results_from_json(&json).unwrap();
        assert_eq!(parsed, results());
        assert!(dir.path().join("study-deadbeef-42.csv").exists());
    }
}
