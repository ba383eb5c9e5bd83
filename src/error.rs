//! Error types for position handling and search requests.

use thiserror::Error;

use crate::control::InterruptionStatus;

/// Failures raised by the search stack.
///
/// `Interrupted` doubles as the abort signal threaded through the recursive
/// search: every node polls the control block and unwinds with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid search configuration: {0}")]
    InvalidConfiguration(String),

    #[error("position has no legal moves")]
    NoLegalMoves,

    #[error("search interrupted ({0:?})")]
    Interrupted(InterruptionStatus),

    #[error("no move could be determined before the search stopped ({0:?})")]
    NoMoveDetermined(InterruptionStatus),

    #[error("search interrupted by caller: {0}")]
    CustomInterruption(String),

    #[error("{} root move task(s) failed: {}", .0.len(), .0.join("; "))]
    WorkerFaults(Vec<String>),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl SearchError {
    /// True for the cooperative unwinding signal, as opposed to real failures.
    pub fn is_interruption(&self) -> bool {
        matches!(self, SearchError::Interrupted(_))
    }
}

/// Failures from the board collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("illegal move '{0}'")]
    IllegalMove(String),
}
