//! Store error types.

use thiserror::Error;

/// Errors that can occur when loading or saving a learner's progress.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON, or does not have the expected shape.
    #[error("malformed progress document: {0}")]
    Json(#[from] serde_json::Error),

    /// The learner name cannot be used as a document name.
    #[error("invalid learner name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidLearner(String),

    /// The stored document changed since it was loaded.
    #[error("progress for '{learner}' was modified elsewhere (loaded revision {expected}, stored revision {found})")]
    Conflict {
        learner: String,
        expected: u64,
        found: u64,
    },

    /// The document parsed but breaks a model invariant.
    #[error("progress for '{learner}' is corrupt: {reason}")]
    Corrupt { learner: String, reason: String },
}
