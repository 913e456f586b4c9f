//! Error types for the RECALL core library.
//!
//! Everything here is a contract violation on the host's side: a broken
//! task definition, impossible generation parameters, or a lifecycle call
//! made in the wrong phase. Wrong or malformed *answers* are never errors;
//! they are scored as incorrect rounds.

use thiserror::Error;

use crate::types::{Phase, TaskId};

/// Top-level error type for all RECALL core operations.
#[derive(Error, Debug)]
pub enum RecallError {
    /// A task definition failed validation at construction time.
    #[error("Invalid task definition '{task}': {reason}")]
    InvalidDefinition {
        /// Which task was being built.
        task: TaskId,
        /// What was wrong with it.
        reason: String,
    },

    /// Generation parameters cannot produce a non-empty stimulus.
    #[error("Invalid generation parameters for {generator}: {reason}")]
    InvalidParams {
        /// Generator that rejected the parameters.
        generator: &'static str,
        /// Why they were rejected.
        reason: String,
    },

    /// A lifecycle call was made in a phase that does not allow it.
    #[error("Cannot {action} while in phase {phase:?}")]
    InvalidTransition {
        /// The attempted action.
        action: &'static str,
        /// The phase the engine was in.
        phase: Phase,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecallError {
    /// Shorthand for [`RecallError::InvalidParams`].
    pub(crate) fn params(generator: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            generator,
            reason: reason.into(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RecallError>;
