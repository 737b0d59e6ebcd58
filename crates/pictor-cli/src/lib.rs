//! Helpers behind the `pictor` binary

use anyhow::{anyhow, bail, Context};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use pictor_core::models::{NewTransformationTask, SourceImage, TransformedImage};
use pictor_core::WorkerConfig;
use pictor_db::{ImageRepository, InMemoryRepository, TaskRepository};
use pictor_processing::{codec, OutputFormat};
use pictor_storage::{MemoryStorage, Storage};
use pictor_worker::{ExecutionOutcome, PipelineOrchestrator};

/// Parse a transformation list given on the command line.
///
/// Accepts a JSON array of `{operation, params}` objects, or a single object.
pub fn parse_transformations(raw: &str) -> anyhow::Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw).context("Transformations are not valid JSON")?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![value]),
        other => bail!("Expected a JSON array of transformations, got {}", other),
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Result of a local run
#[derive(Debug)]
pub struct LocalRun {
    pub image: TransformedImage,
    pub data: Bytes,
}

/// Run `transformations` over `data` with the same orchestrator the worker
/// uses, backed by in-memory persistence and blob storage.
pub async fn run_local(
    config: &WorkerConfig,
    file_name: &str,
    data: Bytes,
    transformations: Vec<Value>,
    format: Option<String>,
) -> anyhow::Result<LocalRun> {
    let decoded = codec::decode(&data).map_err(|e| anyhow!("{}: {}", file_name, e))?;
    let repo = InMemoryRepository::new();
    let storage = Arc::new(MemoryStorage::new());

    let owner_id = Uuid::new_v4();
    let source = SourceImage {
        id: Uuid::new_v4(),
        owner_id,
        file_name: file_name.to_string(),
        description: String::new(),
        storage_key: format!("images/{}/{}", owner_id, file_name),
        format: decoded
            .detected_format
            .and_then(OutputFormat::from_image_format)
            .map(|f| f.as_str().to_string()),
        width: decoded.image.width(),
        height: decoded.image.height(),
        created_at: Utc::now(),
    };
    storage.insert(source.storage_key.clone(), data).await;
    repo.insert_source_image(&source).await?;

    let task = repo
        .create_task(NewTransformationTask {
            owner_id,
            original_image_id: source.id,
            transformations,
            format,
        })
        .await?;

    let orchestrator = PipelineOrchestrator::from_config(
        config,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        storage.clone(),
    )?;

    let result_image_id = match orchestrator.execute(task.id).await? {
        ExecutionOutcome::Completed { result_image_id }
        | ExecutionOutcome::CacheHit { result_image_id } => result_image_id,
        ExecutionOutcome::Skipped { status } => bail!("Task was skipped in status {}", status),
    };

    let image = repo
        .get_transformed_image(result_image_id)
        .await?
        .ok_or_else(|| anyhow!("Result image {} missing", result_image_id))?;
    let data = storage.download(&image.storage_key).await?;

    Ok(LocalRun { image, data })
}
