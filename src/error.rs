//! Structured failures raised by the matching core.
//!
//! The CLI and HTTP shells decide how to present these; the core never
//! swallows or retries them. An empty result list is *not* an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    /// A taxonomy entry is missing a required field. Raised before any
    /// embedding call, so no partial index is ever produced.
    #[error("invalid taxonomy entry at {path}: {reason}")]
    Validation { path: String, reason: String },

    /// The query was empty or whitespace-only.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The embedding provider failed. The underlying error is kept as-is.
    #[error("embedding provider failed: {0:#}")]
    Provider(anyhow::Error),

    /// The provider returned a vector of the wrong length.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl MatchError {
    pub(crate) fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that originate in the embedding provider
    /// (transport errors as well as malformed vectors).
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::DimensionMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
