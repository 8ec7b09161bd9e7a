// src/error.rs
use thiserror::Error;

/// Failure taxonomy for the ingestion pipeline.
///
/// `Config` is raised synchronously before any network call and is fatal to
/// that source's run only. `Upstream` is transient and retryable by the
/// worker pool. `Normalization` means the provider answered with a payload
/// we do not understand; retrying would fail the same way.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{source_name}: {reason}")]
    Config { source_name: String, reason: String },

    #[error("{source_name}: upstream request failed: {reason}")]
    Upstream { source_name: String, reason: String },

    #[error("{source_name}: unexpected payload shape: {reason}")]
    Normalization { source_name: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl IngestError {
    pub fn config(source: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::Config {
            source_name: source.into(),
            reason: reason.into(),
        }
    }

    pub fn upstream(source: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::Upstream {
            source_name: source.into(),
            reason: reason.into(),
        }
    }

    pub fn normalization(source: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::Normalization {
            source_name: source.into(),
            reason: reason.into(),
        }
    }

    /// Only upstream failures are worth retrying; everything else would
    /// fail identically on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::Upstream { .. })
    }
}
