#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::Value;
use uuid::Uuid;

use pictor_cache::{InMemoryCacheStore, ResultCache};
use pictor_core::models::{
    NewTransformationTask, NewTransformedImage, SourceImage, TaskStatus, TransformationTask,
    TransformedImage,
};
use pictor_db::{
    ImageRepository, InMemoryRepository, RepositoryError, RepositoryResult, TaskRepository,
};
use pictor_processing::codec;
use pictor_processing::{OperationRegistry, OutputFormat};
use pictor_storage::{MemoryStorage, Storage};
use pictor_worker::PipelineOrchestrator;

pub fn rgb_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 2) as u8, (y * 2) as u8, 128])
    }))
}

pub fn rgba_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([20, 160, 90, 140])))
}

pub fn encode(img: &DynamicImage, format: OutputFormat) -> Bytes {
    Bytes::from(codec::encode(img, format, 90).unwrap())
}

pub fn decode(data: &[u8]) -> DynamicImage {
    codec::decode(data).unwrap().image
}

/// Task repository that records every transition it is asked to make
#[derive(Clone, Default)]
pub struct RecordingTasks {
    pub inner: InMemoryRepository,
    pub transitions: Arc<Mutex<Vec<(Uuid, TaskStatus)>>>,
}

impl RecordingTasks {
    pub fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            transitions: Arc::default(),
        }
    }

    pub fn transitions_for(&self, task_id: Uuid) -> Vec<TaskStatus> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == task_id)
            .map(|(_, status)| *status)
            .collect()
    }

    fn record(&self, task_id: Uuid, status: TaskStatus) {
        self.transitions.lock().unwrap().push((task_id, status));
    }
}

#[async_trait]
impl TaskRepository for RecordingTasks {
    async fn get_task(&self, task_id: Uuid) -> RepositoryResult<Option<TransformationTask>> {
        self.inner.get_task(task_id).await
    }

    async fn create_task(&self, task: NewTransformationTask) -> RepositoryResult<TransformationTask> {
        self.inner.create_task(task).await
    }

    async fn mark_in_progress(&self, task_id: Uuid) -> RepositoryResult<TransformationTask> {
        let task = self.inner.mark_in_progress(task_id).await?;
        self.record(task_id, TaskStatus::InProgress);
        Ok(task)
    }

    async fn mark_success(
        &self,
        task_id: Uuid,
        result_image_id: Uuid,
    ) -> RepositoryResult<TransformationTask> {
        let task = self.inner.mark_success(task_id, result_image_id).await?;
        self.record(task_id, TaskStatus::Success);
        Ok(task)
    }

    async fn mark_failed(&self, task_id: Uuid, message: &str) -> RepositoryResult<TransformationTask> {
        let task = self.inner.mark_failed(task_id, message).await?;
        self.record(task_id, TaskStatus::Failed);
        Ok(task)
    }

    async fn cancel_task(&self, task_id: Uuid) -> RepositoryResult<TransformationTask> {
        self.inner.cancel_task(task_id).await
    }

    async fn pending_task_ids(&self, limit: i64) -> RepositoryResult<Vec<Uuid>> {
        self.inner.pending_task_ids(limit).await
    }

    async fn fail_stale_tasks(
        &self,
        older_than: DateTime<Utc>,
        message: &str,
    ) -> RepositoryResult<Vec<Uuid>> {
        self.inner.fail_stale_tasks(older_than, message).await
    }
}

/// Image repository whose result inserts always fail
pub struct FailingResultInserts {
    pub inner: InMemoryRepository,
}

#[async_trait]
impl ImageRepository for FailingResultInserts {
    async fn get_source_image(&self, image_id: Uuid) -> RepositoryResult<Option<SourceImage>> {
        self.inner.get_source_image(image_id).await
    }

    async fn insert_source_image(&self, image: &SourceImage) -> RepositoryResult<()> {
        self.inner.insert_source_image(image).await
    }

    async fn get_transformed_image(
        &self,
        image_id: Uuid,
    ) -> RepositoryResult<Option<TransformedImage>> {
        self.inner.get_transformed_image(image_id).await
    }

    async fn create_transformed_image(
        &self,
        _image: NewTransformedImage,
    ) -> RepositoryResult<TransformedImage> {
        Err(RepositoryError::Decode("connection reset".to_string()))
    }
}

pub struct Harness {
    pub repo: InMemoryRepository,
    pub tasks: RecordingTasks,
    pub storage: Arc<MemoryStorage>,
    pub cache_store: Arc<InMemoryCacheStore>,
    pub orchestrator: Arc<PipelineOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        let repo = InMemoryRepository::new();
        let images: Arc<dyn ImageRepository> = Arc::new(repo.clone());
        let storage = Arc::new(MemoryStorage::new());
        Self::assemble(repo, images, storage.clone(), storage)
    }

    /// Harness whose orchestrator talks to `images`/`blob_store` instead of
    /// the plain in-memory backends
    pub fn with_collaborators(
        repo: InMemoryRepository,
        images: Arc<dyn ImageRepository>,
        blob_store: Arc<dyn Storage>,
    ) -> Self {
        Self::assemble(repo, images, Arc::new(MemoryStorage::new()), blob_store)
    }

    fn assemble(
        repo: InMemoryRepository,
        images: Arc<dyn ImageRepository>,
        storage: Arc<MemoryStorage>,
        blob_store: Arc<dyn Storage>,
    ) -> Self {
        let tasks = RecordingTasks::new(repo.clone());
        let cache_store = Arc::new(InMemoryCacheStore::new(64));
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(tasks.clone()),
            images,
            blob_store,
            Arc::new(OperationRegistry::builtin()),
        )
        .with_cache(ResultCache::new(cache_store.clone()));

        Self {
            repo,
            tasks,
            storage,
            cache_store,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Store `img` encoded as `format` and register it as a source image
    pub async fn add_source(
        &self,
        file_name: &str,
        img: &DynamicImage,
        format: OutputFormat,
    ) -> SourceImage {
        let owner_id = Uuid::new_v4();
        let source = SourceImage {
            id: Uuid::new_v4(),
            owner_id,
            file_name: file_name.to_string(),
            description: String::new(),
            storage_key: format!("images/{}/{}", owner_id, file_name),
            format: Some(format.as_str().to_string()),
            width: img.width(),
            height: img.height(),
            created_at: Utc::now(),
        };
        self.add_raw_source(&source, encode(img, format)).await;
        source
    }

    pub async fn add_raw_source(&self, source: &SourceImage, data: Bytes) {
        self.storage.insert(source.storage_key.clone(), data).await;
        self.repo.insert_source_image(source).await.unwrap();
    }

    pub async fn add_task(
        &self,
        source: &SourceImage,
        transformations: Value,
        format: Option<&str>,
    ) -> TransformationTask {
        let transformations = match transformations {
            Value::Array(items) => items,
            other => panic!("transformations must be a list, got {}", other),
        };
        self.repo
            .create_task(NewTransformationTask {
                owner_id: source.owner_id,
                original_image_id: source.id,
                transformations,
                format: format.map(str::to_string),
            })
            .await
            .unwrap()
    }

    pub async fn task(&self, task_id: Uuid) -> TransformationTask {
        self.repo.get_task(task_id).await.unwrap().unwrap()
    }

    /// Result record and decoded pixels of a successful task
    pub async fn result(&self, task_id: Uuid) -> (TransformedImage, DynamicImage) {
        let task = self.task(task_id).await;
        assert_eq!(task.status, TaskStatus::Success);
        let image_id = task.result_image_id.expect("successful task has a result");
        let record = self
            .repo
            .get_transformed_image(image_id)
            .await
            .unwrap()
            .expect("result record exists");
        let data = self.storage.download(&record.storage_key).await.unwrap();
        (record, decode(&data))
    }
}
