//! Log source adapter
//!
//! Fetches a bounded, filtered window of recent log records from the
//! external logging backend. Filter expressions are passed through
//! verbatim; the adapter does not validate or rewrite queries.

mod cloud;

pub use cloud::{CloudLoggingSource, DEFAULT_LOGGING_ENDPOINT};

use crate::models::LogRecord;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;

/// Errors from the log source adapter
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backend could not be reached or refused to serve the request
    #[error("logging backend unavailable: {message}")]
    Unavailable { message: String },

    /// The backend rejected the filter expression
    #[error("invalid log filter: {message}")]
    InvalidFilter { message: String },
}

/// A backend that can serve recent log records
///
/// Implementations return records newest-first, at most `max_entries` of
/// them. A filter that matches nothing yields an empty list, not an error.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self, filter: &str, max_entries: usize)
        -> Result<Vec<LogRecord>, SourceError>;
}

/// Build the default error-log filter for the trailing window
///
/// Matches the query shape the backend expects:
/// `severity=ERROR AND resource.type=k8s_container AND timestamp >= "<RFC3339>"`.
pub fn error_filter_since(window: Duration) -> String {
    let cutoff = Utc::now() - window;
    format!(
        "severity=ERROR AND resource.type=k8s_container AND timestamp >= \"{}\"",
        cutoff.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_filter_shape() {
        let filter = error_filter_since(Duration::hours(2));
        assert!(filter.starts_with("severity=ERROR AND resource.type=k8s_container"));
        assert!(filter.contains("timestamp >= \""));
        assert!(filter.ends_with('"'));
    }

    #[test]
    fn test_error_filter_cutoff_is_in_the_past() {
        let filter = error_filter_since(Duration::hours(1));
        let start = filter.find("timestamp >= \"").unwrap() + "timestamp >= \"".len();
        let cutoff = &filter[start..filter.len() - 1];
        let parsed = chrono::DateTime::parse_from_rfc3339(cutoff).unwrap();
        assert!(parsed.with_timezone(&Utc) < Utc::now());
    }
}
