//! Engine error types.
//!
//! Every variant is a recoverable rejection: the requested operation did not
//! happen and the session state is exactly what it was before the call.

use thiserror::Error;

use crate::model::ModuleStatus;

/// Errors returned by progression, quiz, video, and ledger operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An illegal module state change was attempted.
    #[error("invalid transition for module {module_id} ({status}): {reason}")]
    InvalidTransition {
        module_id: String,
        status: ModuleStatus,
        reason: String,
    },

    /// A quiz answer was confirmed without a selected option.
    #[error("no option selected for question {question_index}")]
    NoSelection { question_index: usize },

    /// A spend exceeds the spendable balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    /// A pending transaction was resolved a second time.
    #[error("transaction {transaction_id} is already resolved")]
    AlreadyResolved { transaction_id: String },

    /// Malformed module, quiz, or tier data.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The snapshot write failed; the previous state remains the state of record.
    #[error("persistence failure: {0:#}")]
    PersistenceFailure(anyhow::Error),

    /// A module or transaction id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Only pending transactions can be resolved.
    #[error("transaction {transaction_id} is not pending")]
    NotPending { transaction_id: String },

    /// Ledger amounts must be positive and must not overflow.
    #[error("invalid amount: {0}")]
    InvalidAmount(u64),

    /// The quiz attempt does not accept this action in its current state.
    #[error("invalid quiz action: {0}")]
    InvalidQuizAction(String),

    /// No quiz attempt is open.
    #[error("no quiz in progress")]
    NoActiveQuiz,

    /// No video viewing is open.
    #[error("no video in progress")]
    NoActiveVideo,

    /// The module completes through a different mechanism.
    #[error("module {module_id} completes via {expected}, not {attempted}")]
    WrongMechanism {
        module_id: String,
        expected: &'static str,
        attempted: &'static str,
    },
}

impl EngineError {
    /// Returns `true` when the failure came from the durable store rather than
    /// from the rules of the engine.
    pub fn is_persistence(&self) -> bool {
        matches!(self, EngineError::PersistenceFailure(_))
    }

    /// Returns `true` for load-time data problems that should keep a module
    /// or quiz from being offered at all.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }

    pub(crate) fn module_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "module",
            id: id.to_string(),
        }
    }

    pub(crate) fn transaction_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "transaction",
            id: id.to_string(),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
