use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pictor_core::models::{
    NewTransformationTask, NewTransformedImage, SourceImage, TaskStatus, TransformationTask,
    TransformedImage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::{ImageRepository, TaskRepository};

#[derive(Default)]
struct Tables {
    tasks: HashMap<Uuid, TransformationTask>,
    sources: HashMap<Uuid, SourceImage>,
    results: HashMap<Uuid, TransformedImage>,
}

/// Process-local repository for tests and one-off CLI runs.
///
/// Transitions run under a single write lock, so they are as atomic as the
/// conditional updates of the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn task_count(&self) -> usize {
        self.tables.read().await.tasks.len()
    }

    pub async fn transformed_image_count(&self) -> usize {
        self.tables.read().await.results.len()
    }

    /// Drop a transformed image record, e.g. to simulate external cleanup
    pub async fn remove_transformed_image(&self, image_id: Uuid) -> Option<TransformedImage> {
        self.tables.write().await.results.remove(&image_id)
    }

    async fn transition<F>(
        &self,
        task_id: Uuid,
        next: TaskStatus,
        update: F,
    ) -> RepositoryResult<TransformationTask>
    where
        F: FnOnce(&mut TransformationTask) + Send,
    {
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .get_mut(&task_id)
            .ok_or(RepositoryError::TaskNotFound(task_id))?;

        if !task.status.can_transition_to(next) {
            return Err(RepositoryError::InvalidTransition {
                id: task_id,
                from: task.status,
                to: next,
            });
        }

        task.status = next;
        update(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn get_task(&self, task_id: Uuid) -> RepositoryResult<Option<TransformationTask>> {
        Ok(self.tables.read().await.tasks.get(&task_id).cloned())
    }

    async fn create_task(&self, task: NewTransformationTask) -> RepositoryResult<TransformationTask> {
        let now = Utc::now();
        let created = TransformationTask {
            id: Uuid::new_v4(),
            owner_id: task.owner_id,
            original_image_id: task.original_image_id,
            result_image_id: None,
            status: TaskStatus::Pending,
            transformations: task.transformations,
            format: task.format,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        self.tables
            .write()
            .await
            .tasks
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn mark_in_progress(&self, task_id: Uuid) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::InProgress, |_| {}).await
    }

    async fn mark_success(
        &self,
        task_id: Uuid,
        result_image_id: Uuid,
    ) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::Success, |task| {
            task.result_image_id = Some(result_image_id);
        })
        .await
    }

    async fn mark_failed(&self, task_id: Uuid, message: &str) -> RepositoryResult<TransformationTask> {
        let message = message.to_string();
        self.transition(task_id, TaskStatus::Failed, |task| {
            task.error_message = Some(message);
        })
        .await
    }

    async fn cancel_task(&self, task_id: Uuid) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::Cancelled, |_| {}).await
    }

    async fn pending_task_ids(&self, limit: i64) -> RepositoryResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        let mut pending: Vec<&TransformationTask> = tables
            .tasks
            .values()
            .filter(|task| task.status == TaskStatus::Pending)
            .collect();
        pending.sort_by_key(|task| task.created_at);

        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(pending.into_iter().take(limit).map(|task| task.id).collect())
    }

    async fn fail_stale_tasks(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> RepositoryResult<Vec<Uuid>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut failed = Vec::new();

        for task in tables.tasks.values_mut() {
            if task.status == TaskStatus::InProgress && task.updated_at < older_than {
                task.status = TaskStatus::Failed;
                task.error_message = Some(message.to_string());
                task.updated_at = now;
                failed.push(task.id);
            }
        }

        Ok(failed)
    }
}

#[async_trait]
impl ImageRepository for InMemoryRepository {
    async fn get_source_image(&self, image_id: Uuid) -> RepositoryResult<Option<SourceImage>> {
        Ok(self.tables.read().await.sources.get(&image_id).cloned())
    }

    async fn insert_source_image(&self, image: &SourceImage) -> RepositoryResult<()> {
        self.tables
            .write()
            .await
            .sources
            .insert(image.id, image.clone());
        Ok(())
    }

    async fn get_transformed_image(
        &self,
        image_id: Uuid,
    ) -> RepositoryResult<Option<TransformedImage>> {
        Ok(self.tables.read().await.results.get(&image_id).cloned())
    }

    async fn create_transformed_image(
        &self,
        image: NewTransformedImage,
    ) -> RepositoryResult<TransformedImage> {
        let created = TransformedImage {
            id: Uuid::new_v4(),
            owner_id: image.owner_id,
            file_name: image.file_name,
            description: image.description,
            storage_key: image.storage_key,
            storage_url: image.storage_url,
            metadata: image.metadata,
            source_image_id: image.source_image_id,
            transformation_task_id: image.transformation_task_id,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .await
            .results
            .insert(created.id, created.clone());
        Ok(created)
    }
}
