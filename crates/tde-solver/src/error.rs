//! Error type for solver operations.

use tde_model::ModelError;

/// Failure raised by a solver or post-processor entry point.
///
/// Configuration problems are detected as typed [`ModelError`]s and convert
/// into this wrapper on their way out; numerical conditions (singular
/// diagonal blocks, unsupported method/constraint combinations) carry their
/// diagnostic message directly.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveError(pub String);

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SolveError {}

impl From<String> for SolveError {
    fn from(s: String) -> Self {
        SolveError(s)
    }
}

impl From<&str> for SolveError {
    fn from(s: &str) -> Self {
        SolveError(s.to_string())
    }
}

impl From<ModelError> for SolveError {
    fn from(e: ModelError) -> Self {
        SolveError(e.to_string())
    }
}
