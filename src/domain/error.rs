// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure the pipeline can report, as one typed enum.
//
// Library layers (data, ml, infra) return Result<T, PipelineError>
// so callers can match on the exact failure. The application and
// CLI layers wrap these in anyhow::Error with extra context.
//
// None of these errors are retried anywhere in the pipeline.
//
// Reference: Rust Book §9 (Recoverable Errors with Result)

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The dataset could not be fetched, read, or parsed.
    #[error("dataset unavailable ({location}): {reason}")]
    DataUnavailable { location: String, reason: String },

    /// Input samples do not have the shape a step expects.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// A layer in an architecture cannot accept the shape produced
    /// by the layer before it (or by the declared input shape).
    #[error("incompatible layer at index {index}: {reason}")]
    IncompatibleLayer { index: usize, reason: String },

    /// Training loss became NaN or infinite.
    #[error("training diverged at epoch {epoch}: loss = {loss}")]
    Divergence { epoch: usize, loss: f64 },

    /// Writing or reading an artifact failed at the I/O level.
    #[error("cannot persist model to '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact exists but cannot be decoded into a model.
    #[error("corrupt model artifact '{}': {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    /// A hyperparameter makes the requested run impossible.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn data_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::DataUnavailable {
            location: location.into(),
            reason:   reason.to_string(),
        }
    }

    pub fn shape_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            found:    found.into(),
        }
    }

    pub fn incompatible_layer(index: usize, reason: impl Into<String>) -> Self {
        Self::IncompatibleLayer {
            index,
            reason: reason.into(),
        }
    }

    pub fn corrupt_artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptArtifact {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Shorthand used by every library layer.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_layer_names_index() {
        let err = PipelineError::incompatible_layer(3, "dense needs a flat input");
        assert_eq!(
            err.to_string(),
            "incompatible layer at index 3: dense needs a flat input"
        );
    }

    #[test]
    fn test_persistence_error_keeps_path() {
        let io  = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PipelineError::Persistence { path: PathBuf::from("/tmp/model.bin"), source: io };
        assert!(err.to_string().contains("/tmp/model.bin"));
    }
}
