use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pictor_core::models::{
    ImageMetadata, NewTransformationTask, NewTransformedImage, SourceImage, TaskStatus,
    TransformationTask, TransformedImage,
};
use pictor_core::WorkerConfig;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::{ImageRepository, TaskRepository};

/// Channel notified whenever a task is created
pub const TASK_NOTIFY_CHANNEL: &str = "pictor_new_task";

/// Create the connection pool and apply pending migrations
pub async fn connect(config: &WorkerConfig) -> anyhow::Result<PgPool> {
    let database_url = config.require_database_url()?;

    tracing::info!(
        max_connections = config.db_max_connections,
        timeout_seconds = config.db_timeout_seconds,
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");
    Ok(pool)
}

fn decode_err(column: &str, err: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("invalid {}: {}", column, err).into())
}

fn dimension(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let raw: i32 = row.try_get(column)?;
    u32::try_from(raw).map_err(|e| decode_err(column, e))
}

struct TaskRow(TransformationTask);

impl sqlx::FromRow<'_, PgRow> for TaskRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status: TaskStatus = status.parse().map_err(|e| decode_err("status", e))?;

        // Older rows may hold a single descriptor object; it then fails
        // validation like any other malformed list.
        let transformations = match row.try_get::<Value, _>("transformations")? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        Ok(TaskRow(TransformationTask {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            original_image_id: row.try_get("original_image_id")?,
            result_image_id: row.try_get("result_image_id")?,
            status,
            transformations,
            format: row.try_get("format")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct SourceImageRow(SourceImage);

impl sqlx::FromRow<'_, PgRow> for SourceImageRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(SourceImageRow(SourceImage {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            file_name: row.try_get("file_name")?,
            description: row.try_get("description")?,
            storage_key: row.try_get("storage_key")?,
            format: row.try_get("format")?,
            width: dimension(row, "width")?,
            height: dimension(row, "height")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct TransformedImageRow(TransformedImage);

impl sqlx::FromRow<'_, PgRow> for TransformedImageRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let metadata: Value = row.try_get("metadata")?;
        let metadata: ImageMetadata =
            serde_json::from_value(metadata).map_err(|e| decode_err("metadata", e))?;

        Ok(TransformedImageRow(TransformedImage {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            file_name: row.try_get("file_name")?,
            description: row.try_get("description")?,
            storage_key: row.try_get("storage_key")?,
            storage_url: row.try_get("storage_url")?,
            metadata,
            source_image_id: row.try_get("source_image_id")?,
            transformation_task_id: row.try_get("transformation_task_id")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

/// PostgreSQL-backed task and image repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Conditional status write. Fields passed as `None` keep their value.
    async fn transition(
        &self,
        task_id: Uuid,
        next: TaskStatus,
        result_image_id: Option<Uuid>,
        error_message: Option<&str>,
    ) -> RepositoryResult<TransformationTask> {
        let allowed: Vec<String> = TaskStatus::allowed_predecessors(next)
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();

        let updated = sqlx::query_as::<Postgres, TaskRow>(
            r#"
            UPDATE transformation_tasks
            SET status = $2,
                result_image_id = COALESCE($3, result_image_id),
                error_message = COALESCE($4, error_message),
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($5)
            RETURNING id, owner_id, original_image_id, result_image_id, status,
                      transformations, format, error_message, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(next.as_str())
        .bind(result_image_id)
        .bind(error_message)
        .bind(allowed)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(TaskRow(task)) => Ok(task),
            None => match self.get_task(task_id).await? {
                None => Err(RepositoryError::TaskNotFound(task_id)),
                Some(current) => Err(RepositoryError::InvalidTransition {
                    id: task_id,
                    from: current.status,
                    to: next,
                }),
            },
        }
    }
}

#[async_trait]
impl TaskRepository for PgRepository {
    #[tracing::instrument(skip(self))]
    async fn get_task(&self, task_id: Uuid) -> RepositoryResult<Option<TransformationTask>> {
        let row = sqlx::query_as::<Postgres, TaskRow>(
            r#"
            SELECT id, owner_id, original_image_id, result_image_id, status,
                   transformations, format, error_message, created_at, updated_at
            FROM transformation_tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|TaskRow(task)| task))
    }

    #[tracing::instrument(skip(self, task), fields(original_image_id = %task.original_image_id))]
    async fn create_task(&self, task: NewTransformationTask) -> RepositoryResult<TransformationTask> {
        let mut tx = self.pool.begin().await?;

        let TaskRow(created) = sqlx::query_as::<Postgres, TaskRow>(
            r#"
            INSERT INTO transformation_tasks (
                id, owner_id, original_image_id, status, transformations, format
            )
            VALUES ($1, $2, $3, 'PENDING', $4, $5)
            RETURNING id, owner_id, original_image_id, result_image_id, status,
                      transformations, format, error_message, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task.owner_id)
        .bind(task.original_image_id)
        .bind(Value::Array(task.transformations))
        .bind(task.format)
        .fetch_one(&mut *tx)
        .await?;

        // Wake idle workers. A lost notification is covered by polling.
        if let Err(e) = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(TASK_NOTIFY_CHANNEL)
            .bind(created.id.to_string())
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(error = %e, task_id = %created.id, "Failed to notify workers of new task");
        }

        tx.commit().await?;

        tracing::info!(task_id = %created.id, "Transformation task created");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_in_progress(&self, task_id: Uuid) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::InProgress, None, None)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn mark_success(
        &self,
        task_id: Uuid,
        result_image_id: Uuid,
    ) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::Success, Some(result_image_id), None)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn mark_failed(&self, task_id: Uuid, message: &str) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::Failed, None, Some(message))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_task(&self, task_id: Uuid) -> RepositoryResult<TransformationTask> {
        self.transition(task_id, TaskStatus::Cancelled, None, None)
            .await
    }

    async fn pending_task_ids(&self, limit: i64) -> RepositoryResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            SELECT id FROM transformation_tasks
            WHERE status = 'PENDING'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[tracing::instrument(skip(self, message))]
    async fn fail_stale_tasks(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> RepositoryResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            UPDATE transformation_tasks
            SET status = 'FAILED', error_message = $2, updated_at = NOW()
            WHERE status = 'IN_PROGRESS' AND updated_at < $1
            RETURNING id
            "#,
        )
        .bind(older_than)
        .bind(message)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl ImageRepository for PgRepository {
    #[tracing::instrument(skip(self))]
    async fn get_source_image(&self, image_id: Uuid) -> RepositoryResult<Option<SourceImage>> {
        let row = sqlx::query_as::<Postgres, SourceImageRow>(
            r#"
            SELECT id, owner_id, file_name, description, storage_key, format,
                   width, height, created_at
            FROM source_images
            WHERE id = $1
            "#,
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|SourceImageRow(image)| image))
    }

    async fn insert_source_image(&self, image: &SourceImage) -> RepositoryResult<()> {
        let width = i32::try_from(image.width)
            .map_err(|_| RepositoryError::Decode(format!("width {} out of range", image.width)))?;
        let height = i32::try_from(image.height).map_err(|_| {
            RepositoryError::Decode(format!("height {} out of range", image.height))
        })?;

        sqlx::query(
            r#"
            INSERT INTO source_images (
                id, owner_id, file_name, description, storage_key, format,
                width, height, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(image.id)
        .bind(image.owner_id)
        .bind(&image.file_name)
        .bind(&image.description)
        .bind(&image.storage_key)
        .bind(&image.format)
        .bind(width)
        .bind(height)
        .bind(image.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_transformed_image(
        &self,
        image_id: Uuid,
    ) -> RepositoryResult<Option<TransformedImage>> {
        let row = sqlx::query_as::<Postgres, TransformedImageRow>(
            r#"
            SELECT id, owner_id, file_name, description, storage_key, storage_url,
                   metadata, source_image_id, transformation_task_id, created_at
            FROM transformed_images
            WHERE id = $1
            "#,
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|TransformedImageRow(image)| image))
    }

    #[tracing::instrument(skip(self, image), fields(task_id = %image.transformation_task_id))]
    async fn create_transformed_image(
        &self,
        image: NewTransformedImage,
    ) -> RepositoryResult<TransformedImage> {
        let metadata = serde_json::to_value(&image.metadata)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let TransformedImageRow(created) = sqlx::query_as::<Postgres, TransformedImageRow>(
            r#"
            INSERT INTO transformed_images (
                id, owner_id, file_name, description, storage_key, storage_url,
                metadata, source_image_id, transformation_task_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, owner_id, file_name, description, storage_key, storage_url,
                      metadata, source_image_id, transformation_task_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(image.owner_id)
        .bind(&image.file_name)
        .bind(&image.description)
        .bind(&image.storage_key)
        .bind(&image.storage_url)
        .bind(metadata)
        .bind(image.source_image_id)
        .bind(image.transformation_task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
