//! Queue errors.

use thiserror::Error;

use crate::codec::CodecError;
use crate::item::Uid;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing store could not be reached or a transaction failed to commit.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// `ack` or `fail` on a uid that is not currently checked out.
    #[error("Unknown item: {0}")]
    UnknownItem(Uid),

    /// Payload could not be encoded or decoded.
    #[error("Codec error{}: {source}", .uid.as_ref().map(|u| format!(" for item {}", u)).unwrap_or_default())]
    Codec {
        /// Item the payload belongs to, when it already has one.
        uid: Option<Uid>,
        #[source]
        source: CodecError,
    },

    /// Invalid queue configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio_rusqlite::Error> for QueueError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        QueueError::BackendUnavailable(e.to_string())
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(e: rusqlite::Error) -> Self {
        QueueError::BackendUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_item_display() {
        let err = QueueError::UnknownItem(Uid::from("abc-123"));
        assert_eq!(err.to_string(), "Unknown item: abc-123");
    }

    #[test]
    fn test_codec_error_display_with_uid() {
        let err = QueueError::Codec {
            uid: Some(Uid::from("abc")),
            source: CodecError::InvalidUtf8,
        };
        let msg = err.to_string();
        assert!(msg.contains("for item abc"));
        assert!(msg.contains("UTF-8"));
    }

    #[test]
    fn test_codec_error_display_without_uid() {
        let err = QueueError::Codec {
            uid: None,
            source: CodecError::Custom("bad".to_string()),
        };
        assert_eq!(err.to_string(), "Codec error: bad");
    }

    #[test]
    fn test_rusqlite_error_is_backend_unavailable() {
        let err: QueueError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, QueueError::BackendUnavailable(_)));
    }
}
