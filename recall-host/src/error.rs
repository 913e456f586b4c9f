//! Host-layer error types.

use recall_core::{RecallError, TaskId};
use thiserror::Error;

/// Errors raised by the host layer.
#[derive(Debug, Error)]
pub enum HostError {
    /// Engine or definition error.
    #[error(transparent)]
    Core(#[from] RecallError),

    /// SQLite failure in the results store.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No task with this id in the catalog.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The visitor has not unlocked this task yet.
    #[error("Task '{task}' is at level {level} but only level {unlocked} is unlocked")]
    Locked {
        /// The task asked for.
        task: TaskId,
        /// Its unlock level.
        level: usize,
        /// Highest level the visitor has unlocked.
        unlocked: usize,
    },

    /// The task needs a premium subscription the visitor does not have.
    #[error("Task '{0}' requires a premium subscription")]
    PremiumRequired(TaskId),

    /// The session token did not resolve to a visitor.
    #[error("Session token is not authenticated")]
    Unauthenticated,

    /// The task session has shut down.
    #[error("Task session is closed")]
    SessionClosed,
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, HostError>;
