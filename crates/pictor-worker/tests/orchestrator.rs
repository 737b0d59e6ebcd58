mod common;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use image::GenericImageView;
use serde_json::json;
use uuid::Uuid;

use common::{encode, rgb_image, rgba_image, FailingResultInserts, Harness};
use pictor_cache::{CacheStore, CacheStoreError, ResultCache};
use pictor_core::models::{SourceImage, TaskStatus};
use pictor_core::{PipelineError, StorageBackend, WorkerConfig};
use pictor_db::{ImageRepository, InMemoryRepository, TaskRepository};
use pictor_processing::OutputFormat;
use pictor_storage::{MemoryStorage, Storage, StorageError, StorageResult};
use pictor_worker::{ExecutionOutcome, PipelineOrchestrator};

#[tokio::test]
async fn test_chain_runs_and_result_is_linked() {
    let harness = Harness::new();
    let source = harness
        .add_source("beach.png", &rgb_image(100, 80), OutputFormat::Png)
        .await;
    let task = harness
        .add_task(
            &source,
            json!([
                {"operation": "resize", "params": {"width": 50, "height": 40}},
                {"operation": "grayscale", "params": {}}
            ]),
            Some("png"),
        )
        .await;

    let outcome = harness.orchestrator.execute(task.id).await.unwrap();
    let ExecutionOutcome::Completed { result_image_id } = outcome else {
        panic!("expected a computed result, got {:?}", outcome);
    };

    let (record, pixels) = harness.result(task.id).await;
    assert_eq!(record.id, result_image_id);
    assert_eq!(record.file_name, format!("beach_{}.png", task.id));
    assert_eq!(record.source_image_id, source.id);
    assert_eq!(record.transformation_task_id, task.id);
    assert_eq!(record.metadata.format, "PNG");
    assert_eq!(record.metadata.mode, "L");
    assert_eq!((record.metadata.width, record.metadata.height), (50, 40));
    assert_eq!(pixels.dimensions(), (50, 40));

    let stored = harness.task(task.id).await;
    assert!(stored.error_message.is_none());
    assert_eq!(
        harness.tasks.transitions_for(task.id),
        vec![TaskStatus::InProgress, TaskStatus::Success]
    );
}

#[tokio::test]
async fn test_identical_requests_converge_on_one_result() {
    let harness = Harness::new();
    let source = harness
        .add_source("cat.jpg", &rgb_image(64, 64), OutputFormat::Jpeg)
        .await;

    let first = harness
        .add_task(
            &source,
            json!([{"operation": "crop", "params": {"x": 0, "y": 0, "width": 32, "height": 16}}]),
            Some("png"),
        )
        .await;
    // Same chain with the parameter keys in a different order
    let second = harness
        .add_task(
            &source,
            json!([{"operation": "crop", "params": {"height": 16, "width": 32, "y": 0, "x": 0}}]),
            Some("PNG"),
        )
        .await;

    let ExecutionOutcome::Completed { result_image_id } =
        harness.orchestrator.execute(first.id).await.unwrap()
    else {
        panic!("first run must compute");
    };
    let outcome = harness.orchestrator.execute(second.id).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::CacheHit { result_image_id });

    assert_eq!(harness.task(second.id).await.result_image_id, Some(result_image_id));
    assert_eq!(harness.task(second.id).await.status, TaskStatus::Success);
    assert_eq!(harness.storage.len().await, 2, "source plus one result");
    assert_eq!(harness.repo.transformed_image_count().await, 1);
}

#[tokio::test]
async fn test_format_is_part_of_the_result_identity() {
    let harness = Harness::new();
    let source = harness
        .add_source("cat.png", &rgb_image(32, 32), OutputFormat::Png)
        .await;
    let steps = json!([{"operation": "flip", "params": {}}]);

    let png = harness.add_task(&source, steps.clone(), Some("png")).await;
    let gif = harness.add_task(&source, steps, Some("gif")).await;

    harness.orchestrator.execute(png.id).await.unwrap();
    let outcome = harness.orchestrator.execute(gif.id).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));

    let (record, _) = harness.result(gif.id).await;
    assert_eq!(record.metadata.format, "GIF");
}

#[tokio::test]
async fn test_step_order_changes_the_result() {
    let harness = Harness::new();
    let source = harness
        .add_source("wide.png", &rgb_image(100, 60), OutputFormat::Png)
        .await;
    let crop = json!({"operation": "crop", "params": {"x": 0, "y": 0, "width": 50, "height": 30}});
    let rotate = json!({"operation": "rotate", "params": {"degrees": 90}});

    let crop_first = harness
        .add_task(&source, json!([crop.clone(), rotate.clone()]), None)
        .await;
    let rotate_first = harness.add_task(&source, json!([rotate, crop]), None).await;

    harness.orchestrator.execute(crop_first.id).await.unwrap();
    harness.orchestrator.execute(rotate_first.id).await.unwrap();

    let (_, a) = harness.result(crop_first.id).await;
    let (_, b) = harness.result(rotate_first.id).await;
    assert_eq!(a.dimensions(), (30, 50));
    assert_eq!(b.dimensions(), (50, 30));
    assert_ne!(
        harness.task(crop_first.id).await.result_image_id,
        harness.task(rotate_first.id).await.result_image_id
    );
}

#[tokio::test]
async fn test_square_crop_and_rotate_do_not_commute() {
    let harness = Harness::new();
    let source = harness
        .add_source("square.png", &rgb_image(100, 100), OutputFormat::Png)
        .await;
    let crop = json!({"operation": "crop", "params": {"x": 0, "y": 0, "width": 50, "height": 50}});
    let rotate = json!({"operation": "rotate", "params": {"degrees": 90}});

    let crop_first = harness
        .add_task(&source, json!([crop.clone(), rotate.clone()]), Some("png"))
        .await;
    let rotate_first = harness
        .add_task(&source, json!([rotate, crop]), Some("png"))
        .await;

    harness.orchestrator.execute(crop_first.id).await.unwrap();
    let outcome = harness.orchestrator.execute(rotate_first.id).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));

    let (_, a) = harness.result(crop_first.id).await;
    let (_, b) = harness.result(rotate_first.id).await;
    assert_eq!(a.dimensions(), (50, 50));
    assert_eq!(b.dimensions(), (50, 50));
    assert_ne!(a.to_rgb8().into_raw(), b.to_rgb8().into_raw());
}

#[tokio::test]
async fn test_result_keeps_source_description() {
    let harness = Harness::new();
    let img = rgb_image(16, 16);
    let owner_id = Uuid::new_v4();
    let source = SourceImage {
        id: Uuid::new_v4(),
        owner_id,
        file_name: "beach.png".to_string(),
        description: "Sunset at the beach".to_string(),
        storage_key: format!("images/{}/beach.png", owner_id),
        format: Some("png".to_string()),
        width: 16,
        height: 16,
        created_at: Utc::now(),
    };
    harness
        .add_raw_source(&source, encode(&img, OutputFormat::Png))
        .await;
    let task = harness
        .add_task(&source, json!([{"operation": "flip", "params": {}}]), None)
        .await;

    harness.orchestrator.execute(task.id).await.unwrap();

    let (record, _) = harness.result(task.id).await;
    assert_eq!(record.description, "Sunset at the beach");
}

#[tokio::test]
async fn test_terminal_tasks_are_left_alone() {
    let harness = Harness::new();
    let source = harness
        .add_source("a.png", &rgb_image(20, 20), OutputFormat::Png)
        .await;
    let steps = json!([{"operation": "mirror", "params": {}}]);

    let done = harness.add_task(&source, steps.clone(), None).await;
    harness.orchestrator.execute(done.id).await.unwrap();
    let before = harness.task(done.id).await;

    let cancelled = harness.add_task(&source, steps.clone(), None).await;
    harness.repo.cancel_task(cancelled.id).await.unwrap();

    let failed = harness.add_task(&source, steps, None).await;
    harness.repo.mark_failed(failed.id, "earlier failure").await.unwrap();

    let blobs = harness.storage.len().await;

    assert_eq!(
        harness.orchestrator.execute(done.id).await.unwrap(),
        ExecutionOutcome::Skipped {
            status: TaskStatus::Success
        }
    );
    assert_eq!(
        harness.orchestrator.execute(cancelled.id).await.unwrap(),
        ExecutionOutcome::Skipped {
            status: TaskStatus::Cancelled
        }
    );
    assert_eq!(
        harness.orchestrator.execute(failed.id).await.unwrap(),
        ExecutionOutcome::Skipped {
            status: TaskStatus::Failed
        }
    );

    let after = harness.task(done.id).await;
    assert_eq!(after.result_image_id, before.result_image_id);
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(harness.task(cancelled.id).await.status, TaskStatus::Cancelled);
    assert_eq!(
        harness.task(failed.id).await.error_message.as_deref(),
        Some("earlier failure")
    );
    assert_eq!(harness.storage.len().await, blobs);
}

#[tokio::test]
async fn test_crop_outside_bounds_fails_task() {
    let harness = Harness::new();
    let source = harness
        .add_source("square.png", &rgb_image(100, 100), OutputFormat::Png)
        .await;
    let task = harness
        .add_task(
            &source,
            json!([{"operation": "crop", "params": {"x": 90, "y": 90, "width": 50, "height": 50}}]),
            None,
        )
        .await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidParameter(_)), "{:?}", err);

    let stored = harness.task(task.id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.result_image_id.is_none());
    assert_eq!(stored.error_message, Some(err.to_string()));
    assert_eq!(harness.storage.len().await, 1, "only the source blob");
}

#[tokio::test]
async fn test_crop_inside_bounds() {
    let harness = Harness::new();
    let source = harness
        .add_source("square.png", &rgb_image(100, 100), OutputFormat::Png)
        .await;
    let task = harness
        .add_task(
            &source,
            json!([{"operation": "crop", "params": {"x": 10, "y": 10, "width": 50, "height": 50}}]),
            None,
        )
        .await;

    harness.orchestrator.execute(task.id).await.unwrap();
    let (record, pixels) = harness.result(task.id).await;
    assert_eq!(pixels.dimensions(), (50, 50));
    assert_eq!((record.metadata.width, record.metadata.height), (50, 50));
}

#[tokio::test]
async fn test_unknown_operation_rejected_before_any_step() {
    let harness = Harness::new();
    let source = harness
        .add_source("a.png", &rgb_image(10, 10), OutputFormat::Png)
        .await;
    let task = harness
        .add_task(
            &source,
            json!([
                {"operation": "grayscale", "params": {}},
                {"operation": "exec", "params": {"cmd": "rm -rf /"}}
            ]),
            None,
        )
        .await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    let PipelineError::InvalidTransformation(message) = &err else {
        panic!("expected InvalidTransformation, got {:?}", err);
    };
    assert!(message.contains("exec"));

    let stored = harness.task(task.id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.result_image_id.is_none());
    assert_eq!(harness.repo.transformed_image_count().await, 0);
    assert_eq!(harness.storage.len().await, 1);
}

#[tokio::test]
async fn test_empty_chain_fails_without_starting() {
    let harness = Harness::new();
    let source = harness
        .add_source("a.png", &rgb_image(10, 10), OutputFormat::Png)
        .await;
    let task = harness.add_task(&source, json!([]), None).await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    assert_eq!(err, PipelineError::NoTransformationsDefined);

    let stored = harness.task(task.id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("No transformations defined")
    );
    assert_eq!(
        harness.tasks.transitions_for(task.id),
        vec![TaskStatus::Failed]
    );
}

#[tokio::test]
async fn test_missing_task() {
    let harness = Harness::new();
    let id = Uuid::new_v4();

    let err = harness.orchestrator.execute(id).await.unwrap_err();
    assert_eq!(err, PipelineError::TaskNotFound(id));
    assert_eq!(harness.repo.task_count().await, 0);
    assert!(harness.tasks.transitions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_format_falls_back_to_source_format() {
    let harness = Harness::new();
    let source = harness
        .add_source("photo.jpg", &rgb_image(40, 30), OutputFormat::Jpeg)
        .await;
    let task = harness
        .add_task(&source, json!([{"operation": "sepia", "params": {}}]), None)
        .await;

    harness.orchestrator.execute(task.id).await.unwrap();
    let (record, _) = harness.result(task.id).await;
    assert_eq!(record.metadata.format, "JPEG");
    assert!(record.file_name.ends_with(".jpeg"));
}

#[tokio::test]
async fn test_change_format_step_selects_output() {
    let harness = Harness::new();
    let source = harness
        .add_source("photo.jpg", &rgb_image(40, 30), OutputFormat::Jpeg)
        .await;
    let task = harness
        .add_task(
            &source,
            json!([
                {"operation": "blur", "params": {}},
                {"operation": "change_format", "params": {"format": "webp"}}
            ]),
            None,
        )
        .await;

    harness.orchestrator.execute(task.id).await.unwrap();
    let (record, _) = harness.result(task.id).await;
    assert_eq!(record.metadata.format, "WEBP");
}

#[tokio::test]
async fn test_watermark_then_jpeg_is_opaque() {
    let harness = Harness::new();
    let source = harness
        .add_source("logo.png", &rgba_image(120, 80), OutputFormat::Png)
        .await;
    let task = harness
        .add_task(
            &source,
            json!([{"operation": "watermark", "params": {"text": "pictor"}}]),
            Some("jpeg"),
        )
        .await;

    harness.orchestrator.execute(task.id).await.unwrap();
    let (record, pixels) = harness.result(task.id).await;
    assert_eq!(record.metadata.format, "JPEG");
    assert_eq!(record.metadata.mode, "RGB");
    assert!(!pixels.color().has_alpha());
    assert_eq!(pixels.dimensions(), (120, 80));
}

#[tokio::test]
async fn test_missing_source_image() {
    let harness = Harness::new();
    let ghost = SourceImage {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        file_name: "ghost.png".to_string(),
        description: String::new(),
        storage_key: "images/ghost.png".to_string(),
        format: None,
        width: 1,
        height: 1,
        created_at: Utc::now(),
    };
    let task = harness
        .add_task(&ghost, json!([{"operation": "flip", "params": {}}]), None)
        .await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::OriginalImageNotFound(_)), "{:?}", err);
    assert_eq!(harness.task(task.id).await.status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_undecodable_source_counts_as_missing() {
    let harness = Harness::new();
    let owner_id = Uuid::new_v4();
    let source = SourceImage {
        id: Uuid::new_v4(),
        owner_id,
        file_name: "notes.png".to_string(),
        description: String::new(),
        storage_key: format!("images/{}/notes.png", owner_id),
        format: Some("PNG".to_string()),
        width: 10,
        height: 10,
        created_at: Utc::now(),
    };
    harness
        .add_raw_source(&source, Bytes::from_static(b"definitely not an image"))
        .await;
    let task = harness
        .add_task(&source, json!([{"operation": "flip", "params": {}}]), None)
        .await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::OriginalImageNotFound(_)), "{:?}", err);
    let stored = harness.task(task.id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.error_message.unwrap().contains("could not be decoded"));
}

#[tokio::test]
async fn test_stale_cache_reference_is_recomputed() {
    let harness = Harness::new();
    let source = harness
        .add_source("a.png", &rgb_image(16, 16), OutputFormat::Png)
        .await;
    let steps = json!([{"operation": "grayscale", "params": {}}]);

    let first = harness.add_task(&source, steps.clone(), None).await;
    let ExecutionOutcome::Completed {
        result_image_id: stale_id,
    } = harness.orchestrator.execute(first.id).await.unwrap()
    else {
        panic!("first run must compute");
    };
    harness.repo.remove_transformed_image(stale_id).await;

    let second = harness.add_task(&source, steps.clone(), None).await;
    let ExecutionOutcome::Completed {
        result_image_id: fresh_id,
    } = harness.orchestrator.execute(second.id).await.unwrap()
    else {
        panic!("stale reference must not count as a hit");
    };
    assert_ne!(fresh_id, stale_id);

    // The cache now points at the fresh result
    let third = harness.add_task(&source, steps, None).await;
    assert_eq!(
        harness.orchestrator.execute(third.id).await.unwrap(),
        ExecutionOutcome::CacheHit {
            result_image_id: fresh_id
        }
    );
}

#[tokio::test]
async fn test_result_blob_removed_when_record_cannot_be_saved() {
    let repo = InMemoryRepository::new();
    let blobs = Arc::new(MemoryStorage::new());
    let harness = Harness::with_collaborators(
        repo.clone(),
        Arc::new(FailingResultInserts { inner: repo }),
        blobs.clone(),
    );

    let img = rgb_image(8, 8);
    let owner_id = Uuid::new_v4();
    let source = SourceImage {
        id: Uuid::new_v4(),
        owner_id,
        file_name: "a.png".to_string(),
        description: String::new(),
        storage_key: format!("images/{}/a.png", owner_id),
        format: Some("PNG".to_string()),
        width: 8,
        height: 8,
        created_at: Utc::now(),
    };
    blobs
        .insert(source.storage_key.clone(), common::encode(&img, OutputFormat::Png))
        .await;
    harness.repo.insert_source_image(&source).await.unwrap();

    let task = harness
        .add_task(&source, json!([{"operation": "flip", "params": {}}]), None)
        .await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persistence(_)), "{:?}", err);
    assert_eq!(blobs.keys().await, vec![source.storage_key.clone()]);

    let stored = harness.task(task.id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.result_image_id.is_none());
}

struct ReadOnlyStorage {
    inner: MemoryStorage,
}

#[async_trait]
impl Storage for ReadOnlyStorage {
    async fn upload(
        &self,
        _owner_id: Uuid,
        _filename: &str,
        _content_type: &str,
        _data: Bytes,
    ) -> StorageResult<(String, String)> {
        Err(StorageError::UploadFailed("bucket is read-only".to_string()))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.inner.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[tokio::test]
async fn test_blob_write_failure_fails_task() {
    let repo = InMemoryRepository::new();
    let inner = MemoryStorage::new();
    let owner_id = Uuid::new_v4();
    let source = SourceImage {
        id: Uuid::new_v4(),
        owner_id,
        file_name: "a.png".to_string(),
        description: String::new(),
        storage_key: format!("images/{}/a.png", owner_id),
        format: Some("PNG".to_string()),
        width: 8,
        height: 8,
        created_at: Utc::now(),
    };
    inner
        .insert(
            source.storage_key.clone(),
            common::encode(&rgb_image(8, 8), OutputFormat::Png),
        )
        .await;
    repo.insert_source_image(&source).await.unwrap();

    let harness = Harness::with_collaborators(
        repo.clone(),
        Arc::new(repo),
        Arc::new(ReadOnlyStorage { inner }),
    );
    let task = harness
        .add_task(&source, json!([{"operation": "flip", "params": {}}]), None)
        .await;

    let err = harness.orchestrator.execute(task.id).await.unwrap_err();
    let PipelineError::StorageFailure(message) = &err else {
        panic!("expected StorageFailure, got {:?}", err);
    };
    assert!(message.contains("read-only"));
    assert_eq!(harness.task(task.id).await.status, TaskStatus::Failed);
}

struct UnreachableCache;

#[async_trait]
impl CacheStore for UnreachableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

#[tokio::test]
async fn test_cache_outage_does_not_fail_tasks() {
    let repo = InMemoryRepository::new();
    let storage = Arc::new(MemoryStorage::new());
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        storage.clone(),
        Arc::new(pictor_processing::OperationRegistry::builtin()),
    )
    .with_cache(ResultCache::new(Arc::new(UnreachableCache)));

    let owner_id = Uuid::new_v4();
    let source = SourceImage {
        id: Uuid::new_v4(),
        owner_id,
        file_name: "a.png".to_string(),
        description: String::new(),
        storage_key: format!("images/{}/a.png", owner_id),
        format: Some("PNG".to_string()),
        width: 8,
        height: 8,
        created_at: Utc::now(),
    };
    storage
        .insert(
            source.storage_key.clone(),
            common::encode(&rgb_image(8, 8), OutputFormat::Png),
        )
        .await;
    repo.insert_source_image(&source).await.unwrap();

    let task = repo
        .create_task(pictor_core::models::NewTransformationTask {
            owner_id,
            original_image_id: source.id,
            transformations: vec![json!({"operation": "grayscale", "params": {}})],
            format: None,
        })
        .await
        .unwrap();

    let outcome = orchestrator.execute(task.id).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));
    assert_eq!(
        repo.get_task(task.id).await.unwrap().unwrap().status,
        TaskStatus::Success
    );
}

#[tokio::test]
async fn test_duplicate_delivery_runs_once() {
    let harness = Harness::new();
    let source = harness
        .add_source("a.png", &rgb_image(32, 32), OutputFormat::Png)
        .await;
    let task = harness
        .add_task(&source, json!([{"operation": "blur", "params": {}}]), None)
        .await;

    let (a, b) = tokio::join!(
        harness.orchestrator.execute(task.id),
        harness.orchestrator.execute(task.id)
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    let computed = outcomes
        .iter()
        .filter(|o| matches!(o, ExecutionOutcome::Completed { .. }))
        .count();
    assert_eq!(computed, 1, "{:?}", outcomes);
    assert_eq!(harness.repo.transformed_image_count().await, 1);
}

#[tokio::test]
async fn test_disabled_operations_from_config() {
    let repo = InMemoryRepository::new();
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let config = WorkerConfig {
        disabled_operations: vec!["blur".to_string()],
        ..WorkerConfig::default()
    };
    let orchestrator = PipelineOrchestrator::from_config(
        &config,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        storage.clone(),
    )
    .unwrap();
    assert!(!orchestrator.registry().operation_names().contains(&"blur"));

    let task = repo
        .create_task(pictor_core::models::NewTransformationTask {
            owner_id: Uuid::new_v4(),
            original_image_id: Uuid::new_v4(),
            transformations: vec![json!({"operation": "blur", "params": {}})],
            format: None,
        })
        .await
        .unwrap();
    let err = orchestrator.execute(task.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidTransformation(_)), "{:?}", err);

    let config = WorkerConfig {
        disabled_operations: vec!["teleport".to_string()],
        ..WorkerConfig::default()
    };
    assert!(PipelineOrchestrator::from_config(
        &config,
        Arc::new(repo.clone()),
        Arc::new(repo),
        storage
    )
    .is_err());
}
