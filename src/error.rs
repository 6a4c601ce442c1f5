//! Error type shared by the parsing and aggregation steps.

use thiserror::Error;

/// Structured failure of one analysis pass.
///
/// The computation is pure, so the same input always fails the same way.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// A required column is missing, a cell is not numeric, or a class code
    /// cannot be normalized.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Filtering left nothing to aggregate.
    #[error("no rows left after filtering: {0}")]
    EmptyResult(String),
}

impl AnalysisError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidInput(msg.into())
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        AnalysisError::EmptyResult(msg.into())
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::InvalidInput(format!("malformed CSV: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
