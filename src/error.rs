// src/error.rs
// Crate-wide error taxonomy. Local failures (one provider, one backend, one
// item) are absorbed and degrade the result; failures that compromise the
// whole operation surface as these types.

use std::path::PathBuf;

use thiserror::Error;

use crate::track::Status;

/// Failure of a single search provider. The aggregator logs it and drops the
/// provider for the round; it only becomes fatal when every provider fails.
#[derive(Debug, Clone, Error)]
#[error("provider '{provider}' failed: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Zero providers succeeded in a search round. Carries the per-source
/// reasons so the caller can report which sources failed.
#[derive(Debug, Clone, Error)]
#[error("all {} search providers failed: {}", .failures.len(), failed_sources(.failures))]
pub struct AggregationError {
    pub failures: Vec<(String, String)>,
}

fn failed_sources(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(source, reason)| format!("{source} ({reason})"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Scoring backend call failure. The transient/permanent split decides
/// whether the evaluator retries the same backend or moves down the chain.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend timed out: {0}")]
    Timeout(String),
    #[error("backend connection failed: {0}")]
    Connection(String),
    #[error("backend rate limited: {0}")]
    RateLimited(String),
    #[error("backend authentication failed: {0}")]
    Auth(String),
    #[error("backend rejected the request: {0}")]
    InvalidRequest(String),
    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Transient failures are retried against the same backend (bounded);
    /// permanent ones go straight to the next backend in the chain.
    /// Unclassified errors count as transient so a flaky backend still gets
    /// its bounded retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout(_)
                | BackendError::Connection(_)
                | BackendError::RateLimited(_)
                | BackendError::Other(_)
        )
    }
}

/// A scoring response that yielded no usable scores at all. Downgraded by
/// the evaluator to per-item null scores, never raised to the caller.
#[derive(Debug, Clone, Error)]
#[error("could not parse scores from backend response: {0}")]
pub struct EvaluationParseError(pub String);

/// Tracker operation failures.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("no tracked record for fingerprint {0}")]
    NotFound(String),
    /// The requested status change is not an allowed edge. The record is
    /// left untouched.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// The backing store could not be durably written or read. After a write
/// error the caller must assume the mutation did not happen.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store data error: {0}")]
    Data(#[from] serde_json::Error),
    #[error("could not acquire store lock {path} within {waited_ms} ms")]
    LockTimeout { path: PathBuf, waited_ms: u64 },
}
