//! Artifact delivery
//!
//! Exported documents are staged as in-memory blobs, handed to an
//! [`ArtifactSink`], and released once the configured delay has elapsed.

use crate::error::MetricsError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output document kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// A named, typed document ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub media_type: &'static str,
    pub contents: Vec<u8>,
}

impl ExportArtifact {
    pub fn new(filename: impl Into<String>, format: ExportFormat, contents: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: format.media_type(),
            contents,
        }
    }
}

/// `<prefix>-<first 8 chars of session id>-<unix ms>.<ext>`
pub fn artifact_filename(
    prefix: &str,
    session_id: &str,
    now_ms: i64,
    format: ExportFormat,
) -> String {
    let short_id: String = session_id.chars().take(8).collect();
    format!("{prefix}-{short_id}-{now_ms}.{}", format.extension())
}

/// Destination for exported artifacts
pub trait ArtifactSink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), MetricsError>;
}

/// Writes each artifact as a file under a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), MetricsError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.filename);
        fs::write(&path, &artifact.contents)?;
        info!(path = %path.display(), bytes = artifact.contents.len(), "artifact written");
        Ok(())
    }
}

/// Keeps delivered artifacts in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Vec<ExportArtifact>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> &[ExportArtifact] {
        &self.delivered
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), MetricsError> {
        self.delivered.push(artifact.clone());
        Ok(())
    }
}

/// Reference to a staged blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle(u64);

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

struct StagedBlob {
    handle: BlobHandle,
    artifact: ExportArtifact,
    release_at: Option<i64>,
}

/// Transient blob registry with deferred release
pub struct BlobStore {
    release_delay_ms: i64,
    next_id: u64,
    blobs: Vec<StagedBlob>,
}

impl BlobStore {
    pub fn new(release_delay_ms: i64) -> Self {
        Self {
            release_delay_ms,
            next_id: 0,
            blobs: Vec::new(),
        }
    }

    /// Register an artifact; it stays resident until scheduled and released
    pub fn stage(&mut self, artifact: ExportArtifact) -> BlobHandle {
        self.next_id += 1;
        let handle = BlobHandle(self.next_id);
        debug!(%handle, filename = %artifact.filename, "blob staged");
        self.blobs.push(StagedBlob {
            handle,
            artifact,
            release_at: None,
        });
        handle
    }

    pub fn get(&self, handle: BlobHandle) -> Result<&ExportArtifact, MetricsError> {
        self.blobs
            .iter()
            .find(|b| b.handle == handle)
            .map(|b| &b.artifact)
            .ok_or_else(|| MetricsError::UnknownArtifact(handle.to_string()))
    }

    /// Mark a blob for release `release_delay_ms` after `now_ms`
    pub fn schedule_release(
        &mut self,
        handle: BlobHandle,
        now_ms: i64,
    ) -> Result<(), MetricsError> {
        let delay = self.release_delay_ms;
        let blob = self
            .blobs
            .iter_mut()
            .find(|b| b.handle == handle)
            .ok_or_else(|| MetricsError::UnknownArtifact(handle.to_string()))?;
        blob.release_at.get_or_insert(now_ms + delay);
        Ok(())
    }

    /// Drop every blob whose release time has passed; returns how many
    pub fn release_due(&mut self, now_ms: i64) -> usize {
        let before = self.blobs.len();
        self.blobs.retain(|b| b.release_at.map_or(true, |at| now_ms < at));
        let released = before - self.blobs.len();
        if released > 0 {
            debug!(released, "blobs released");
        }
        released
    }

    pub fn is_resident(&self, handle: BlobHandle) -> bool {
        self.blobs.iter().any(|b| b.handle == handle)
    }

    pub fn resident_count(&self) -> usize {
        self.blobs.len()
    }
}

/// Stage, deliver, and schedule release of one artifact
pub fn deliver_artifact<S: ArtifactSink + ?Sized>(
    blobs: &mut BlobStore,
    sink: &mut S,
    artifact: ExportArtifact,
    now_ms: i64,
) -> Result<BlobHandle, MetricsError> {
    let handle = blobs.stage(artifact);
    let result = sink.deliver(blobs.get(handle)?);
    blobs.schedule_release(handle, now_ms)?;
    result.map(|()| handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FailingSink;

    impl ArtifactSink for FailingSink {
        fn deliver(&mut self, _artifact: &ExportArtifact) -> Result<(), MetricsError> {
            Err(MetricsError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn artifact(name: &str) -> ExportArtifact {
        ExportArtifact::new(name, ExportFormat::Json, b"{}".to_vec())
    }

    #[test]
    fn test_filename_pattern() {
        let name = artifact_filename(
            "user-test-results",
            "3f2a9c1e-7b4d-4e8f-9a0b-1c2d3e4f5a6b",
            1_705_327_200_000,
            ExportFormat::Csv,
        );
        assert_eq!(name, "user-test-results-3f2a9c1e-1705327200000.csv");
    }

    #[test]
    fn test_filename_with_short_session_id() {
        let name = artifact_filename("run", "abc", 5, ExportFormat::Json);
        assert_eq!(name, "run-abc-5.json");
    }

    #[test]
    fn test_media_types() {
        assert_eq!(ExportFormat::Json.media_type(), "application/json");
        assert_eq!(ExportFormat::Csv.media_type(), "text/csv");
    }

    #[test]
    fn test_deferred_release() {
        let mut blobs = BlobStore::new(100);
        let mut sink = MemorySink::new();
        let handle = deliver_artifact(&mut blobs, &mut sink, artifact("a.json"), 1_000).unwrap();

        assert_eq!(sink.delivered().len(), 1);
        assert!(blobs.is_resident(handle));
        assert_eq!(blobs.release_due(1_099), 0);
        assert!(blobs.is_resident(handle));
        assert_eq!(blobs.release_due(1_100), 1);
        assert!(!blobs.is_resident(handle));
        assert!(matches!(
            blobs.get(handle),
            Err(MetricsError::UnknownArtifact(_))
        ));
    }

    #[test]
    fn test_unscheduled_blob_stays_resident() {
        let mut blobs = BlobStore::new(100);
        let handle = blobs.stage(artifact("b.json"));
        assert_eq!(blobs.release_due(i64::MAX), 0);
        assert_eq!(blobs.get(handle).unwrap().filename, "b.json");
    }

    #[test]
    fn test_failed_delivery_still_releases() {
        let mut blobs = BlobStore::new(100);
        let result = deliver_artifact(&mut blobs, &mut FailingSink, artifact("c.json"), 0);
        assert!(matches!(result, Err(MetricsError::Io(_))));
        assert_eq!(blobs.resident_count(), 1);
        assert_eq!(blobs.release_due(100), 1);
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        sink.deliver(&artifact("d.json")).unwrap();

        let written = fs::read_to_string(dir.path().join("out").join("d.json")).unwrap();
        assert_eq!(written, "{}");
    }
}
