//! Parse faults.

use thiserror::Error;

/// A snapshot of one in-progress production at the time of a fault.
///
/// Frames are pushed in descent order, so the last frame is the innermost
/// production that was active when the fault fired.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContextFrame {
    /// Byte offset of the production start.
    pub offset: usize,
    /// 1-based line number of the production start.
    pub line: usize,
    /// Up to 100 characters of source following the production start.
    pub excerpt: String,
}

/// A parse fault.
///
/// "No match" is not a fault; it flows through the engine as an ordinary
/// value to trigger ordered alternatives. Only the variants below escape to
/// the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// An expected token was absent where the grammar demanded it.
    #[error("expected `{expected}` at line {line}")]
    ParseFailure {
        /// The token that was expected at the cursor.
        expected: String,
        /// 1-based line number of the failure.
        line: usize,
        /// The annotated context stack at the time of the failure.
        context: Vec<ContextFrame>,
    },

    /// The global backtracking budget was exhausted.
    ///
    /// The input is pathological or the grammar is diverging; callers must
    /// treat this as fatal, not retryable.
    #[error("backtracking limit of {limit} exceeded at line {line}")]
    BacktrackingLimitExceeded {
        /// The configured budget.
        limit: usize,
        /// 1-based line number at which the budget ran out.
        line: usize,
        /// The annotated context stack at the time of the failure.
        context: Vec<ContextFrame>,
    },
}

impl Error {
    /// The annotated context stack carried by the fault.
    pub fn context(&self) -> &[ContextFrame] {
        match self {
            Error::ParseFailure { context, .. }
            | Error::BacktrackingLimitExceeded { context, .. } => context,
        }
    }
}
