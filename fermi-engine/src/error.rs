//! Error types for the estimation engine
//!
//! Source-level errors are recovered inside the pipeline and recorded in the
//! source report; only `EstimationError` ever reaches the caller.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single evidence source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Source cancelled")]
    Cancelled,
}

/// Failure of a generative model call
#[derive(Debug, Error)]
pub enum ModelError {
    /// Structured output did not satisfy the requested schema
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model API error: {0}")]
    Api(String),
}

impl From<ModelError> for SourceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::SchemaViolation(msg) => SourceError::MalformedResponse(msg),
            ModelError::Transport(msg) => SourceError::Network(msg),
            ModelError::Api(msg) => SourceError::Api(msg),
        }
    }
}

/// Errors surfaced by the estimation API
#[derive(Debug, Error)]
pub enum EstimationError {
    /// Required target fields missing or invalid
    #[error("Malformed target profile: {0}")]
    MalformedTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] fermi_common::Error),
}

pub type EstimationResult<T> = Result<T, EstimationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_maps_to_source_error() {
        let err: SourceError = ModelError::SchemaViolation("missing value".into()).into();
        assert!(matches!(err, SourceError::MalformedResponse(_)));

        let err: SourceError = ModelError::Transport("connection reset".into()).into();
        assert!(matches!(err, SourceError::Network(_)));

        let err: SourceError = ModelError::Api("rate limited".into()).into();
        assert!(matches!(err, SourceError::Api(_)));
    }

    #[test]
    fn test_timeout_message() {
        let err = SourceError::Timeout(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Source timed out after 50ms");
    }
}
