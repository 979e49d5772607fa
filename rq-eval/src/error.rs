//! The evaluator's error taxonomy, following the teacher's
//! `spareval::QueryEvaluationError` shape: one `thiserror` enum, a
//! `Box<dyn Error + Send + Sync>` escape hatch for the triple source's own
//! error type, and a handful of named kinds for conditions the evaluator
//! itself detects (cancellation, resource exhaustion, cyclic scope parents).
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// Failure reported by the external triple source; always fatal for the
    /// current query.
    #[error("triple source error: {0}")]
    TripleSource(Box<dyn StdError + Send + Sync>),
    /// I/O, regex compilation, or another runtime failure inside a builtin.
    #[error("evaluation runtime error: {0}")]
    Runtime(String),
    /// A scope's parent chain contains a cycle; a programmer error that must
    /// abort rather than be recovered per row.
    #[error("cyclic scope parent chain")]
    CyclicScope,
    /// `SERVICE` was evaluated with no resolver configured and `silent` was
    /// not set.
    #[error("SERVICE is not supported ({0})")]
    UnsupportedService(String),
    /// The operation was cancelled between rows.
    #[error("query evaluation was cancelled")]
    Cancelled,
    /// The configured timeout elapsed.
    #[error("query evaluation exceeded its timeout")]
    TimedOut,
    /// A memory or other resource allocation failed.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

impl EvaluationError {
    pub fn triple_source(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::TripleSource(Box::new(error))
    }

    pub fn runtime(message: impl fmt::Display) -> Self {
        Self::Runtime(message.to_string())
    }

    /// Whether this failure can be localized to the current row (and so the
    /// row dropped and evaluation continued) rather than failing the whole
    /// query outright, per §7's propagation policy.
    pub fn is_row_local(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }
}
