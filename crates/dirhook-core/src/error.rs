//! Error types for the dirhook engine.
//!
//! Error definitions with transient/permanent classification. Failures in
//! directory lookups are transient and absorbed at the narrowest possible
//! scope; history write failures are permanent from the engine's point of
//! view and suppress the dependent canonical event.

use thiserror::Error;

/// Errors that can occur while synthesizing canonical events.
#[derive(Debug, Error)]
pub enum EngineError {
    /// User does not exist in the directory.
    #[error("user not found: {username}")]
    UserNotFound { username: String },

    /// Group does not exist in the directory.
    #[error("group not found: {group}")]
    GroupNotFound { group: String },

    /// The directory could not be queried (outage, timeout).
    #[error("directory unavailable: {message}")]
    DirectoryUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The history store could not be read.
    #[error("history query failed: {message}")]
    HistoryQueryFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The history store rejected an append. The canonical event that
    /// depends on the write must not be emitted.
    #[error("history write failed: {message}")]
    HistoryWriteFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The notification sink rejected an event.
    #[error("publish failed: {message}")]
    PublishFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to serialize a canonical event.
    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl EngineError {
    /// Check if this error is transient and the operation may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::DirectoryUnavailable { .. }
                | EngineError::HistoryQueryFailed { .. }
                | EngineError::PublishFailed { .. }
        )
    }

    // Convenience constructors

    /// Create a user-not-found error.
    pub fn user_not_found(username: impl Into<String>) -> Self {
        EngineError::UserNotFound {
            username: username.into(),
        }
    }

    /// Create a group-not-found error.
    pub fn group_not_found(group: impl Into<String>) -> Self {
        EngineError::GroupNotFound {
            group: group.into(),
        }
    }

    /// Create a directory-unavailable error.
    pub fn directory_unavailable(message: impl Into<String>) -> Self {
        EngineError::DirectoryUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a directory-unavailable error with an underlying cause.
    pub fn directory_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EngineError::DirectoryUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a history-query-failed error.
    pub fn history_query_failed(message: impl Into<String>) -> Self {
        EngineError::HistoryQueryFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a history-write-failed error.
    pub fn history_write_failed(message: impl Into<String>) -> Self {
        EngineError::HistoryWriteFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a publish-failed error.
    pub fn publish_failed(message: impl Into<String>) -> Self {
        EngineError::PublishFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a publish-failed error with an underlying cause.
    pub fn publish_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EngineError::PublishFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
