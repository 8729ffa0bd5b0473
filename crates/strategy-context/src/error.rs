//! Error types for strategy-context

use thiserror::Error;

/// Errors a collaborator may report while serving context reads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The upstream service could not be reached
    #[error("context source unavailable: {0}")]
    Unavailable(String),

    /// The upstream service answered with an error
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// No data exists for the requested symbol
    #[error("no data found for symbol {symbol}")]
    SymbolNotFound { symbol: String },

    /// The upstream payload could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        ContextError::Malformed(err.to_string())
    }
}

/// Result type for collaborator reads
pub type ContextResult<T> = std::result::Result<T, ContextError>;
