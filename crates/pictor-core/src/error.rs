//! Error types module
//!
//! `PipelineError` is the taxonomy every failure of a transformation task is
//! reduced to before it is written into the task's `error_message` and handed
//! back to the delivery layer. Lower layers (processing, storage, persistence)
//! keep their own error enums and convert into this one at the orchestrator
//! boundary.

use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for user-caused failures (bad parameters, unknown operations)
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("No transformations defined")]
    NoTransformationsDefined,

    #[error("Original image not found: {0}")]
    OriginalImageNotFound(String),

    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Transformation failed: {0}")]
    TransformationFailed(String),

    #[error("Output format could not be determined: {0}")]
    OutputFormatUnresolved(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Machine-readable error code (e.g., "INVALID_PARAMETER")
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::TaskNotFound(_) => "TASK_NOT_FOUND",
            PipelineError::NoTransformationsDefined => "NO_TRANSFORMATIONS_DEFINED",
            PipelineError::OriginalImageNotFound(_) => "ORIGINAL_IMAGE_NOT_FOUND",
            PipelineError::InvalidTransformation(_) => "INVALID_TRANSFORMATION",
            PipelineError::InvalidParameter(_) => "INVALID_PARAMETER",
            PipelineError::TransformationFailed(_) => "TRANSFORMATION_FAILED",
            PipelineError::OutputFormatUnresolved(_) => "OUTPUT_FORMAT_UNRESOLVED",
            PipelineError::StorageFailure(_) => "STORAGE_FAILURE",
            PipelineError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::NoTransformationsDefined
            | PipelineError::InvalidTransformation(_)
            | PipelineError::InvalidParameter(_)
            | PipelineError::OutputFormatUnresolved(_) => LogLevel::Warn,
            PipelineError::TaskNotFound(_) | PipelineError::OriginalImageNotFound(_) => {
                LogLevel::Warn
            }
            PipelineError::TransformationFailed(_)
            | PipelineError::StorageFailure(_)
            | PipelineError::Persistence(_) => LogLevel::Error,
        }
    }

    /// Whether the request itself is at fault, so redelivering it can never succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::NoTransformationsDefined
                | PipelineError::InvalidTransformation(_)
                | PipelineError::InvalidParameter(_)
                | PipelineError::OutputFormatUnresolved(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            PipelineError::TaskNotFound(Uuid::nil()).error_code(),
            "TASK_NOT_FOUND"
        );
        assert_eq!(
            PipelineError::InvalidParameter("x".into()).error_code(),
            "INVALID_PARAMETER"
        );
        assert_eq!(
            PipelineError::StorageFailure("x".into()).error_code(),
            "STORAGE_FAILURE"
        );
    }

    #[test]
    fn test_display_keeps_cause() {
        let err = PipelineError::InvalidTransformation("unknown operation 'exec'".into());
        assert_eq!(
            err.to_string(),
            "Invalid transformation: unknown operation 'exec'"
        );
        assert!(PipelineError::NoTransformationsDefined
            .to_string()
            .to_lowercase()
            .contains("no transformations defined"));
    }

    #[test]
    fn test_client_errors() {
        assert!(PipelineError::InvalidParameter("w".into()).is_client_error());
        assert!(!PipelineError::StorageFailure("down".into()).is_client_error());
        assert_eq!(
            PipelineError::Persistence("db".into()).log_level(),
            LogLevel::Error
        );
    }
}
