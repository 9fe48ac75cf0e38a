use thiserror::Error;

use crate::category::Tolerance;

/// Errors surfaced by the compiler pipeline.
#[derive(Debug, Error)]
pub enum ConstellationError {
    /// Malformed expression tree, categories document or options.
    #[error("parse error: {0}")]
    Parse(String),

    /// An option is outside its accepted range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An atom names a category that the table does not define.
    #[error("{0} is not defined in categories")]
    UndefinedCategory(String),

    /// An AND combination has no matching parts at the requested tolerance.
    #[error("AND combination is empty at tolerance {tolerance}")]
    EmptyIntersection { tolerance: Tolerance },

    /// The finished graph has nothing left to enumerate.
    #[error("graph is unsatisfiable after pruning")]
    UnsatisfiableGraph,

    /// Internal construction invariant was violated.
    #[error("malformed graph: {0}")]
    Graph(String),
}

impl ConstellationError {
    /// Whether the caller should substitute a placeholder result instead of failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConstellationError::EmptyIntersection { .. } | ConstellationError::UnsatisfiableGraph
        )
    }
}

impl From<serde_json::Error> for ConstellationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConstellationError>;
