//! Error types for ticker operations

use thiserror::Error;

/// Failures reported by a chat transport
///
/// Classification into `MessageNotFound` happens once, when the transport
/// decodes the remote response. Callers branch on the variant, never on text.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target message no longer exists or can no longer be edited
    #[error("Message {message_id} not found or no longer editable")]
    MessageNotFound { message_id: i64 },

    /// The messaging API answered with a failure envelope
    #[error("Chat API rejected {method} (status {status}): {description}")]
    Rejected {
        method: String,
        status: u16,
        error_code: Option<i64>,
        description: String,
    },

    /// Network, timeout or HTTP level failure
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected envelope
    #[error("Unexpected response from {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl TransportError {
    /// Whether this failure means the message is gone for good
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MessageNotFound { .. })
    }
}

/// Ticker specific errors
#[derive(Debug, Error)]
pub enum TickerError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Price quote could not be fetched or parsed
    #[error("Price source unavailable: {0}")]
    SourceUnavailable(String),

    /// Chat transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Persisted state backend failure
    #[error("State store error: {0}")]
    StoreError(String),

    /// A message was sent but its record could not be persisted.
    /// The next tick will not know about it and will send a duplicate.
    #[error("Failed to persist record for message {message_id}: {reason}")]
    StoreWriteError { message_id: i64, reason: String },

    /// Status text could not be rendered
    #[error("Render error: {0}")]
    RenderError(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TickerError {
    /// Errors that should stop a one-shot run with a non-zero exit code.
    ///
    /// Everything else only costs the current tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_) | Self::StoreWriteError { .. }
        )
    }
}

impl From<minijinja::Error> for TickerError {
    fn from(err: minijinja::Error) -> Self {
        TickerError::RenderError(err.to_string())
    }
}

/// Result type alias for ticker operations
pub type Result<T> = std::result::Result<T, TickerError>;

/// Result type alias for chat transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TickerError::SourceUnavailable("status 500".to_string());
        assert_eq!(err.to_string(), "Price source unavailable: status 500");

        let err = TickerError::StoreWriteError {
            message_id: 77,
            reason: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to persist record for message 77: disk full"
        );
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err: TickerError = TransportError::MessageNotFound { message_id: 42 }.into();
        assert_eq!(err.to_string(), "Message 42 not found or no longer editable");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TickerError::ConfigError("TG_CHAT_ID not set".into()).is_fatal());
        assert!(
            TickerError::StoreWriteError {
                message_id: 1,
                reason: "x".into()
            }
            .is_fatal()
        );
        assert!(!TickerError::SourceUnavailable("down".into()).is_fatal());
        assert!(!TickerError::StoreError("down".into()).is_fatal());
        assert!(
            !TickerError::Transport(TransportError::Rejected {
                method: "sendMessage".into(),
                status: 403,
                error_code: Some(403),
                description: "Forbidden: bot was blocked".into(),
            })
            .is_fatal()
        );
    }

    #[test]
    fn test_not_found_helper() {
        assert!(TransportError::MessageNotFound { message_id: 5 }.is_not_found());
        assert!(
            !TransportError::Decode {
                method: "editMessageText".into(),
                reason: "missing result".into(),
            }
            .is_not_found()
        );
    }
}
