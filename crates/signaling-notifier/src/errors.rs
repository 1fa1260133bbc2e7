//! Notifier error types.
//!
//! `NotifierError` is returned for defects below the send step (configuration,
//! unknown sessions, signing, serialization). `DeliveryError` describes a
//! failed POST; the dispatcher logs it and records a metric but never returns
//! it to the caller that mutated the room.

use crate::observability::metrics::categorize_status_code;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No signaling backend configured")]
    NoBackendConfigured,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Invalid call flags: {0:#04x}")]
    InvalidCallFlags(u8),

    #[error("Secure random source unavailable")]
    Signing,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for NotifierError {
    fn from(err: serde_json::Error) -> Self {
        NotifierError::Serialization(err.to_string())
    }
}

/// Failure to deliver one callback to one backend.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Backend responded with status {0}")]
    Status(u16),
}

impl DeliveryError {
    /// Bounded label for metrics.
    pub fn status_label(&self) -> &'static str {
        match self {
            DeliveryError::Timeout => "timeout",
            DeliveryError::Status(code) => categorize_status_code(*code),
            DeliveryError::Transport(_) => "error",
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout
        } else if let Some(status) = err.status() {
            DeliveryError::Status(status.as_u16())
        } else {
            DeliveryError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            NotifierError::SessionNotFound("s1".to_string()).to_string(),
            "Session not found: s1"
        );
        assert_eq!(
            NotifierError::InvalidCallFlags(6).to_string(),
            "Invalid call flags: 0x06"
        );
        assert_eq!(
            NotifierError::NoBackendConfigured.to_string(),
            "No signaling backend configured"
        );
        assert_eq!(
            DeliveryError::Status(502).to_string(),
            "Backend responded with status 502"
        );
    }

    #[test]
    fn test_delivery_status_labels() {
        assert_eq!(DeliveryError::Timeout.status_label(), "timeout");
        assert_eq!(DeliveryError::Status(500).status_label(), "error");
        assert_eq!(DeliveryError::Status(403).status_label(), "error");
        assert_eq!(DeliveryError::Status(504).status_label(), "timeout");
        assert_eq!(DeliveryError::Status(408).status_label(), "timeout");
        assert_eq!(
            DeliveryError::Transport("refused".to_string()).status_label(),
            "error"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<u8>("not json").unwrap_err();
        let converted: NotifierError = err.into();
        assert!(matches!(converted, NotifierError::Serialization(_)));
    }
}
