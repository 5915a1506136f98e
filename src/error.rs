//! Error types for scrollgate
//!
//! Sampling, derivation and finalization never fail; only the I/O-facing edges
//! (config, trace parsing, export delivery) surface errors.

use thiserror::Error;

/// Errors that can occur outside the in-memory metrics core
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse session trace: {0}")]
    TraceParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session is incomplete: {0}")]
    IncompleteSession(String),

    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),
}
