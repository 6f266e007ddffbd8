//! Inference error taxonomy.

use thiserror::Error;

use crate::extraction::ExtractionError;

/// Errors surfaced by a model call.
///
/// `RateLimited` is transient and drives the retry policy. Everything else,
/// including a rate limit that outlived its retry budget, is `Unavailable`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Inference unavailable: {0}")]
    Unavailable(String),
}

impl InferenceError {
    /// Whether this error should be retried with backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, InferenceError::RateLimited(_))
    }
}

impl From<ExtractionError> for InferenceError {
    fn from(e: ExtractionError) -> Self {
        InferenceError::Unavailable(e.to_string())
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            InferenceError::RateLimited(e.to_string())
        } else {
            InferenceError::Unavailable(e.to_string())
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;
