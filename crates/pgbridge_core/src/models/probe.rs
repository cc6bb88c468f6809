//! Connectivity probe results.

use crate::error::TargetError;
use serde::{Deserialize, Serialize};

/// Outcome of a connectivity probe before it is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Connection opened, loader built and the round-trip query succeeded
    Connected,
    /// Something on the probe path failed
    Failed(String),
}

impl ProbeOutcome {
    /// Build a failed outcome from an error, keeping a single-line summary.
    pub fn failed(error: &TargetError) -> Self {
        let summary = error.summary();
        if summary.is_empty() {
            Self::Failed(error.category().to_string())
        } else {
            Self::Failed(summary)
        }
    }
}

/// Reported result of test mode: `{"connected": bool, "message"?: string}`.
///
/// `message` is present exactly when `connected` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Whether the probe succeeded
    pub connected: bool,
    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ProbeOutcome> for ProbeResult {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Connected => Self { connected: true, message: None },
            ProbeOutcome::Failed(message) => Self { connected: false, message: Some(message) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_result_has_no_message_key() {
        let result = ProbeResult::from(ProbeOutcome::Connected);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"connected": true}));
    }

    #[test]
    fn test_failed_result_carries_message() {
        let err = TargetError::connection("connection refused");
        let result = ProbeResult::from(ProbeOutcome::failed(&err));
        assert!(!result.connected);
        assert_eq!(result.message.as_deref(), Some("Connection error: connection refused"));
    }
}
