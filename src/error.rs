//! Error types for exprgen
//!
//! Errors fall into two groups. Rejections (`Compile`, `Run`, `Timeout`)
//! are the expected outcome for most generated expressions and are
//! recovered by discarding the attempt. Everything else is fatal to the
//! corpus loop.

use thiserror::Error;

/// Result type alias for exprgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during corpus generation
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid generator configuration (weights, corpora, operator lists)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The expression was rejected by the compiler
    #[error("compile error: {0}")]
    Compile(String),

    /// The compiled expression failed during evaluation
    #[error("run error: {0}")]
    Run(String),

    /// Oracle call exceeded its time budget
    #[error("oracle timeout after {0}ms")]
    Timeout(u64),

    /// Unexpected fault while handling one expression
    #[error("fault while processing `{source_code}`: {message}")]
    Fault {
        /// Source text being processed when the fault occurred
        source_code: String,
        /// Description of the fault
        message: String,
    },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error is an expected rejection of a generated expression.
    ///
    /// Rejections are silently retried by the corpus loop.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Compile(_) | Self::Run(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
