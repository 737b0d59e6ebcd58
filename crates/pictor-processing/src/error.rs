use pictor_core::PipelineError;

/// Errors produced while validating or applying transformations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Output format could not be determined: {0}")]
    FormatUnresolved(String),

    #[error("Transformation failed: {0}")]
    Failed(String),
}

impl TransformError {
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        TransformError::InvalidParameter(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        TransformError::Failed(msg.into())
    }
}

impl From<image::ImageError> for TransformError {
    fn from(err: image::ImageError) -> Self {
        TransformError::Failed(err.to_string())
    }
}

impl From<TransformError> for PipelineError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::InvalidTransformation(msg) => PipelineError::InvalidTransformation(msg),
            TransformError::InvalidParameter(msg) => PipelineError::InvalidParameter(msg),
            // An undecodable source is indistinguishable from a missing one for the caller.
            TransformError::Decode(msg) => {
                PipelineError::OriginalImageNotFound(format!("source could not be decoded: {}", msg))
            }
            TransformError::FormatUnresolved(msg) => PipelineError::OutputFormatUnresolved(msg),
            TransformError::Failed(msg) => PipelineError::TransformationFailed(msg),
        }
    }
}
