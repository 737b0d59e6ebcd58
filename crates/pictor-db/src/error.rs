use pictor_core::models::TaskStatus;
use pictor_core::PipelineError;
use uuid::Uuid;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Row could not be decoded: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for PipelineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TaskNotFound(id) => PipelineError::TaskNotFound(id),
            other => PipelineError::Persistence(other.to_string()),
        }
    }
}
