//! Pipeline orchestrator
//!
//! Runs one transformation task end to end: claim, cache lookup, source
//! retrieval, rendering, result persistence and the final status transition.
//! Every error after the claim is written to the task as FAILED and then
//! returned to the caller.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use pictor_cache::{CacheKey, CacheKeyGenerator, InMemoryCacheStore, ResultCache};
use pictor_core::models::{NewTransformedImage, SourceImage, TaskStatus, TransformationTask};
use pictor_core::{PipelineError, PipelineResult, WorkerConfig};
use pictor_db::{ImageRepository, TaskRepository};
use pictor_processing::{render, FormatPreference, OperationRegistry, TransformChain, TransformError};
use pictor_storage::{Storage, StorageError};
use uuid::Uuid;

use crate::lifecycle::{Claim, TaskLifecycle};

/// How a delivered task was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The chain ran and a new result image was stored
    Completed { result_image_id: Uuid },
    /// An identical earlier result was linked
    CacheHit { result_image_id: Uuid },
    /// The task was terminal or owned by another worker; nothing was done
    Skipped { status: TaskStatus },
}

pub struct PipelineOrchestrator {
    tasks: Arc<dyn TaskRepository>,
    images: Arc<dyn ImageRepository>,
    storage: Arc<dyn Storage>,
    registry: Arc<OperationRegistry>,
    lifecycle: TaskLifecycle,
    cache: ResultCache,
    cache_keys: CacheKeyGenerator,
    jpeg_quality: u8,
}

impl PipelineOrchestrator {
    /// Orchestrator with the result cache disabled and JPEG quality 90
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        images: Arc<dyn ImageRepository>,
        storage: Arc<dyn Storage>,
        registry: Arc<OperationRegistry>,
    ) -> Self {
        Self {
            lifecycle: TaskLifecycle::new(tasks.clone()),
            tasks,
            images,
            storage,
            registry,
            cache: ResultCache::disabled(),
            cache_keys: CacheKeyGenerator::new(),
            jpeg_quality: 90,
        }
    }

    /// Build the registry and cache from configuration.
    ///
    /// Fails when `DISABLED_OPERATIONS` names an unknown operation.
    pub fn from_config(
        config: &WorkerConfig,
        tasks: Arc<dyn TaskRepository>,
        images: Arc<dyn ImageRepository>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, TransformError> {
        let registry = OperationRegistry::without(config.disabled_operations.as_slice())?;

        let cache = if config.result_cache_enabled {
            ResultCache::new(Arc::new(InMemoryCacheStore::new(config.result_cache_capacity)))
        } else {
            ResultCache::disabled()
        };

        tracing::info!(
            operations = ?registry.operation_names(),
            result_cache = cache.is_enabled(),
            jpeg_quality = config.jpeg_quality,
            "Pipeline orchestrator configured"
        );

        Ok(Self::new(tasks, images, storage, Arc::new(registry))
            .with_cache(cache)
            .with_jpeg_quality(config.jpeg_quality))
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Execute the task identified by `task_id`.
    ///
    /// Safe to call more than once for the same id: a task that is already
    /// terminal or IN_PROGRESS is reported as [`ExecutionOutcome::Skipped`].
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn execute(&self, task_id: Uuid) -> PipelineResult<ExecutionOutcome> {
        let task = self
            .tasks
            .get_task(task_id)
            .await?
            .ok_or(PipelineError::TaskNotFound(task_id))?;

        if task.is_terminal() || task.status == TaskStatus::InProgress {
            tracing::info!(status = %task.status, "Task not pending, skipping delivery");
            return Ok(ExecutionOutcome::Skipped {
                status: task.status,
            });
        }

        if !task.has_transformations() {
            let err = PipelineError::NoTransformationsDefined;
            self.lifecycle.fail(task_id, &err).await;
            return Err(err);
        }

        let task = match self.lifecycle.start(task_id).await? {
            Claim::Acquired(task) => task,
            Claim::Lost(status) => return Ok(ExecutionOutcome::Skipped { status }),
        };

        match self.run(&task).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.lifecycle.fail(task_id, &err).await;
                Err(err)
            }
        }
    }

    async fn run(&self, task: &TransformationTask) -> PipelineResult<ExecutionOutcome> {
        let started = Instant::now();

        // A chain the current registry rejects must fail even if it was
        // cached under an earlier configuration.
        let chain = TransformChain::resolve(&self.registry, &task.transformations)?;

        let cache_key = self.cache_keys.generate(
            task.original_image_id,
            &task.transformations,
            task.format.as_deref(),
        );

        if let Some(key) = &cache_key {
            if let Some(result_image_id) = self.cached_result(key).await? {
                self.lifecycle.succeed(task.id, result_image_id).await?;
                tracing::info!(
                    result_image_id = %result_image_id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Linked cached result"
                );
                return Ok(ExecutionOutcome::CacheHit { result_image_id });
            }
        }

        let source = self
            .images
            .get_source_image(task.original_image_id)
            .await?
            .ok_or_else(|| PipelineError::OriginalImageNotFound(task.original_image_id.to_string()))?;

        let data = self.storage.download(&source.storage_key).await.map_err(|e| match e {
            StorageError::NotFound(key) => {
                PipelineError::OriginalImageNotFound(format!("{} (blob {} missing)", source.id, key))
            }
            other => other.into(),
        })?;

        let preference = FormatPreference {
            explicit: task.format.clone(),
            declared: source.format.clone(),
        };
        let rendered = render(data, chain, preference, self.jpeg_quality).await?;

        let file_name = result_file_name(&source, task.id, rendered.format.extension());
        let (storage_key, storage_url) = self
            .storage
            .upload(
                task.owner_id,
                &file_name,
                rendered.format.to_mime_type(),
                rendered.data,
            )
            .await?;

        let record = NewTransformedImage {
            owner_id: task.owner_id,
            file_name,
            description: source.description.clone(),
            storage_key: storage_key.clone(),
            storage_url,
            metadata: rendered.metadata,
            source_image_id: source.id,
            transformation_task_id: task.id,
        };

        let image = match self.images.create_transformed_image(record).await {
            Ok(image) => image,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    tracing::warn!(
                        storage_key = %storage_key,
                        error = %cleanup,
                        "Failed to delete orphaned result blob"
                    );
                }
                return Err(e.into());
            }
        };

        if let Some(key) = &cache_key {
            self.cache.set(key, image.id).await;
        }

        self.lifecycle.succeed(task.id, image.id).await?;

        tracing::info!(
            result_image_id = %image.id,
            steps = task.transformations.len(),
            format = %image.metadata.format,
            size = image.metadata.size,
            duration_ms = started.elapsed().as_millis() as u64,
            "Transformation completed"
        );

        Ok(ExecutionOutcome::Completed {
            result_image_id: image.id,
        })
    }

    /// Cached result id whose image record still exists
    async fn cached_result(&self, key: &CacheKey) -> PipelineResult<Option<Uuid>> {
        let Some(result_image_id) = self.cache.get(key).await else {
            return Ok(None);
        };

        if self.images.get_transformed_image(result_image_id).await?.is_some() {
            return Ok(Some(result_image_id));
        }

        tracing::warn!(
            result_image_id = %result_image_id,
            cache_key = %key,
            "Cached result no longer exists, recomputing"
        );
        Ok(None)
    }
}

/// `{source stem}_{task id}.{ext}`, restricted to characters that are safe in
/// a storage key
fn result_file_name(source: &SourceImage, task_id: Uuid, extension: &str) -> String {
    let stem: String = Path::new(&source.file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let stem = if stem.is_empty() { "image" } else { stem.as_str() };
    format!("{}_{}.{}", stem, task_id, extension)
}
