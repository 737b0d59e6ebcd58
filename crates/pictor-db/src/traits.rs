//! Persistence interfaces used by the pipeline

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pictor_core::models::{
    NewTransformationTask, NewTransformedImage, SourceImage, TransformationTask, TransformedImage,
};
use uuid::Uuid;

use crate::error::RepositoryResult;

/// Transformation task records and their status transitions.
///
/// Every `mark_*` method is a single conditional write: it only applies when
/// the stored status is a legal predecessor of the target status, and fails
/// with `InvalidTransition` otherwise. Concurrent workers racing for the same
/// task therefore cannot both win.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_task(&self, task_id: Uuid) -> RepositoryResult<Option<TransformationTask>>;

    /// Insert a PENDING task (API layer and tooling)
    async fn create_task(&self, task: NewTransformationTask) -> RepositoryResult<TransformationTask>;

    /// PENDING -> IN_PROGRESS
    async fn mark_in_progress(&self, task_id: Uuid) -> RepositoryResult<TransformationTask>;

    /// IN_PROGRESS -> SUCCESS, linking the result image
    async fn mark_success(
        &self,
        task_id: Uuid,
        result_image_id: Uuid,
    ) -> RepositoryResult<TransformationTask>;

    /// PENDING | IN_PROGRESS -> FAILED with a human-readable message
    async fn mark_failed(&self, task_id: Uuid, message: &str) -> RepositoryResult<TransformationTask>;

    /// PENDING | IN_PROGRESS -> CANCELLED (external actors only)
    async fn cancel_task(&self, task_id: Uuid) -> RepositoryResult<TransformationTask>;

    /// Oldest PENDING task ids first
    async fn pending_task_ids(&self, limit: i64) -> RepositoryResult<Vec<Uuid>>;

    /// Fail IN_PROGRESS tasks whose last update is older than `older_than`.
    /// Returns the ids that were failed.
    async fn fail_stale_tasks(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> RepositoryResult<Vec<Uuid>>;
}

/// Source and transformed image records
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn get_source_image(&self, image_id: Uuid) -> RepositoryResult<Option<SourceImage>>;

    /// Register an uploaded original (upload API and tooling)
    async fn insert_source_image(&self, image: &SourceImage) -> RepositoryResult<()>;

    async fn get_transformed_image(
        &self,
        image_id: Uuid,
    ) -> RepositoryResult<Option<TransformedImage>>;

    async fn create_transformed_image(
        &self,
        image: NewTransformedImage,
    ) -> RepositoryResult<TransformedImage>;
}
