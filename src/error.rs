//! Error types for the ingestion pipeline

use std::time::Duration;

use thiserror::Error;

/// Reasons the external model could not produce a usable prediction.
/// Always recovered by the fallback estimator, never surfaced to devices.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model endpoint not configured")]
    NotConfigured,

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model unreachable: {0}")]
    Connection(String),

    #[error("model returned HTTP {0}")]
    Status(u16),

    #[error("model response is not valid JSON: {0}")]
    Decode(String),

    #[error("unrecognized model response shape")]
    UnrecognizedShape,

    #[error("model transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PredictionError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            PredictionError::Status(status.as_u16())
        } else if err.is_connect() {
            PredictionError::Connection(err.to_string())
        } else if err.is_decode() {
            PredictionError::Decode(err.to_string())
        } else {
            PredictionError::Transport(err.to_string())
        }
    }
}

/// Failures of the reading persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading store unavailable: {0}")]
    Unavailable(String),
}

/// Failures surfaced to the device as `{ok: false}`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to persist reading: {0}")]
    Store(#[from] StoreError),
}
