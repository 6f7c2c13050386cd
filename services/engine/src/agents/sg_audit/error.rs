//! Errors for security group collection
//!
//! Region failures never escape the collector; they are logged and the
//! region is dropped. Configuration errors are returned before any query runs.

use std::time::Duration;
use thiserror::Error;

/// Why a single region could not be inventoried
#[derive(Debug, Error)]
pub enum RegionQueryError {
    /// The region-scoped client could not be constructed
    #[error("Failed to open region client: {0}")]
    Client(String),

    /// The query could not be issued or its output could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The provider answered with an error (auth, throttling, bad region, ...)
    #[error("Service error{}: {message}", exit_suffix(.code))]
    Service { code: Option<i32>, message: String },

    /// The response could not be decoded
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The per-region deadline expired
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The region task panicked before producing an answer
    #[error("Region task panicked: {0}")]
    Panicked(String),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit {})", code),
        None => String::new(),
    }
}

/// Invalid audit configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero deadline would drop every region
    #[error("Region timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Region identifier at position {0} is blank")]
    BlankRegion(usize),

    #[error("AWS CLI path is empty")]
    EmptyCliPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let with_code = RegionQueryError::Service {
            code: Some(254),
            message: "UnauthorizedOperation".to_string(),
        };
        let without_code = RegionQueryError::Service {
            code: None,
            message: "killed".to_string(),
        };

        assert_eq!(with_code.to_string(), "Service error (exit 254): UnauthorizedOperation");
        assert_eq!(without_code.to_string(), "Service error: killed");
    }

    #[test]
    fn test_timeout_display() {
        let err = RegionQueryError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Timed out after 5s");
    }
}
