//! Store error types.

use thiserror::Error;

/// Errors raised by the stores before any file is touched.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The user id cannot be mapped to a snapshot file name.
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    /// No feedback record with this id.
    #[error("feedback not found: {0}")]
    FeedbackNotFound(String),

    /// A feedback record needs a non-empty message.
    #[error("feedback message is empty")]
    EmptyMessage,

    /// Unrecognised feedback status name.
    #[error("unknown feedback status: {0} (expected open, reviewed or resolved)")]
    UnknownStatus(String),

    /// A stored snapshot was written by a newer format.
    #[error("unsupported snapshot version {found} (max {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}
