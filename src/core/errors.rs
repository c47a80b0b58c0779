//! Error types for the OCR pipeline.
//!
//! One crate-wide error enum covers the whole taxonomy: synchronous input
//! validation, configuration mistakes, engine failures, service startup
//! aggregation, and the per-request terminal states of the concurrent
//! service.

use thiserror::Error;

/// Boxed source error used for engine and tensor failures.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the OCR pipeline and its service layer.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The caller handed us something unusable (empty image, wrong channel
    /// count, malformed box points). Raised before any inference runs.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// The pipeline was configured inconsistently, e.g. orientation
    /// classification enabled without a classifier model.
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The inference engine reported an execution error. Propagated unchanged
    /// to the caller of the failing stage.
    #[error("inference failed for model '{model}' during {operation}: {source}")]
    Inference {
        /// Name of the model that failed.
        model: String,
        /// Operation that was running (session load, forward pass, ...).
        operation: String,
        /// Underlying engine error.
        #[source]
        source: SourceError,
    },

    /// A tensor had an unexpected shape.
    #[error("tensor shape error: {0}")]
    Tensor(#[from] ndarray::ShapeError),

    /// One or more workers failed their one-time pipeline construction during
    /// service startup. Fatal to the whole service; no threads are leaked.
    #[error("service construction failed: {}", failures.join("; "))]
    Construction {
        /// Collected failure messages, one per failed worker.
        failures: Vec<String>,
    },

    /// The work item's cancellation was requested before a worker dequeued it.
    /// Inference never ran for this request.
    #[error("request cancelled before it was picked up")]
    Cancelled,

    /// The service has been disposed; new submissions are rejected
    /// immediately.
    #[error("service has been disposed")]
    Disposed,
}

impl OcrError {
    /// Creates an `InvalidInput` error from anything stringifiable.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        OcrError::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError` from anything stringifiable.
    pub fn config(message: impl Into<String>) -> Self {
        OcrError::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an `Inference` error wrapping an engine failure.
    pub fn inference(
        model: impl Into<String>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        OcrError::Inference {
            model: model.into(),
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

/// A minimal string-backed error for wrapping plain messages as a source.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new `SimpleError` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        SimpleError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_error_joins_all_failures() {
        let err = OcrError::Construction {
            failures: vec!["worker 0: no model".into(), "worker 2: bad path".into()],
        };
        let text = err.to_string();
        assert!(text.contains("worker 0"));
        assert!(text.contains("worker 2"));
    }

    #[test]
    fn inference_error_preserves_source() {
        let err = OcrError::inference("det", "forward_pass", SimpleError::new("boom"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("det"));
    }
}
