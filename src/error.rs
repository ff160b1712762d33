//! Error types for the telemetry core.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelemetryError {
    /// The device handshake failed or was interrupted before it completed.
    /// The controller is back in `Disconnected` when this is returned.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Threshold outside the accepted score range (or NaN).
    #[error("invalid anxiety threshold {0}: expected a value between {min} and {max}", min = crate::metrics::MIN_THRESHOLD, max = crate::metrics::MAX_THRESHOLD)]
    InvalidThreshold(f64),
}

pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_threshold_message_names_the_range() {
        let err = TelemetryError::InvalidThreshold(120.0);
        assert_eq!(
            err.to_string(),
            "invalid anxiety threshold 120: expected a value between 0 and 100"
        );
    }
}
