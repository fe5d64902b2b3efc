use crate::model::{ColumnId, TaskId};

/// Errors returned by the board engine.
///
/// Validation variants are rejected before any optimistic mutation, so they
/// never trigger a rollback. Remote variants surface after a rollback has
/// already restored the previous state. Nothing here is fatal.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("task not found: {id}")]
    TaskNotFound { id: TaskId },

    #[error("column not found: {id}")]
    ColumnNotFound { id: ColumnId },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("remote command failed: {message}")]
    Remote { message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("push channel closed")]
    ChannelClosed,
}

impl BoardError {
    /// Server rejected a command (non-2xx response or explicit error body).
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
