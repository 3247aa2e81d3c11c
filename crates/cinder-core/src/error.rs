//! Error taxonomy for the agent pipeline
//!
//! Component-local failures (one file in an index pass, one action in a
//! batch) are captured per-item and never abort sibling work. Pipeline
//! failures abort the current request only; index, undo stack, and session
//! state persist untouched.

use std::path::PathBuf;

/// Errors produced by the agent pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// File read/write/stat failure, localized to a single path.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model output unrecoverable after every repair strategy.
    #[error("failed to parse model response: {0}")]
    Parse(String),

    /// Action shape violated the post-parse contract.
    #[error("invalid action: {0}")]
    Validation(String),

    /// Model call exceeded its time budget. No mutation was applied.
    #[error("model call timed out after {0}s")]
    Timeout(u64),

    /// The confirmation gate declined the batch. No mutation was applied.
    #[error("operation cancelled: confirmation denied")]
    ConfirmationDenied,

    /// Provider-level failure (HTTP error, bad status, malformed body).
    #[error("model provider error: {0}")]
    Provider(String),
}

impl AgentError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the underlying io error was a not-found, which the indexer
    /// treats as a deletion rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Error classes that warrant rotating to the next credential.
    pub fn is_credential_failure(&self) -> bool {
        match self {
            Self::Provider(msg) => {
                msg.contains("status 401") || msg.contains("status 403") || msg.contains("status 429")
            }
            _ => false,
        }
    }
}
