//! Structured document export

use crate::error::MetricsError;
use crate::types::SessionResults;

/// Pretty-printed JSON document of the full session record
pub fn results_to_json(results: &SessionResults) -> Result<String, MetricsError> {
    serde_json::to_string_pretty(results).map_err(MetricsError::JsonError)
}

/// Parse a previously exported session document
pub fn results_from_json(json: &str) -> Result<SessionResults, MetricsError> {
    serde_json::from_str(json).map_err(MetricsError::JsonError)
}
