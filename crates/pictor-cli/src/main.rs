//! Pictor CLI: run the transformation worker or try a chain locally.
//!
//! Configuration comes from the environment (and `.env`), see `WorkerConfig`.

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use pictor_cache::CacheKeyGenerator;
use pictor_cli::{parse_transformations, print_json, run_local};
use pictor_core::WorkerConfig;
use pictor_db::{PgRepository, TaskRepository};
use pictor_processing::OperationRegistry;
use pictor_worker::{PipelineOrchestrator, RepositoryPoller, TaskQueue, TaskQueueConfig};

#[derive(Parser)]
#[command(name = "pictor", about = "Asynchronous image transformation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker pool against PostgreSQL and the configured blob store
    Worker,
    /// Apply a transformation chain to a local file
    Apply {
        /// Source image
        input: PathBuf,
        /// Where to write the result
        output: PathBuf,
        /// JSON list of {"operation", "params"} objects
        #[arg(long, short)]
        transformations: String,
        /// Output format (defaults to the source format)
        #[arg(long, short)]
        format: Option<String>,
    },
    /// Print the result cache key of a request
    CacheKey {
        /// Source image UUID
        #[arg(long)]
        source: Uuid,
        /// JSON list of {"operation", "params"} objects
        #[arg(long, short)]
        transformations: String,
        #[arg(long, short)]
        format: Option<String>,
    },
    /// List the operations enabled by the current configuration
    Operations,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = WorkerConfig::from_env()?;

    match cli.command {
        Commands::Worker => run_worker(config).await?,
        Commands::Apply {
            input,
            output,
            transformations,
            format,
        } => {
            pictor_infra::init_telemetry("pictor-cli", config.log_format)?;
            let transformations = parse_transformations(&transformations)?;
            let data = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let file_name = input
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("input");

            let run = run_local(&config, file_name, Bytes::from(data), transformations, format)
                .await?;
            tokio::fs::write(&output, &run.data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&run.image.metadata)?;
        }
        Commands::CacheKey {
            source,
            transformations,
            format,
        } => {
            let transformations = parse_transformations(&transformations)?;
            let key = CacheKeyGenerator::new()
                .generate(source, &transformations, format.as_deref())
                .context("Transformations cannot be fingerprinted")?;
            print_json(&serde_json::json!({
                "key": key.as_str(),
                "canonical": key.canonical(),
            }))?;
        }
        Commands::Operations => {
            let registry = OperationRegistry::without(config.disabled_operations.as_slice())?;
            print_json(&registry.operation_names())?;
        }
    }

    Ok(())
}

async fn run_worker(config: WorkerConfig) -> anyhow::Result<()> {
    config.validate()?;
    pictor_infra::init_telemetry("pictor-worker", config.log_format)?;

    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage_backend,
        max_workers = config.task_queue_max_workers,
        "Starting Pictor worker"
    );

    let pool = pictor_db::connect(&config).await?;
    let repository = Arc::new(PgRepository::new(pool.clone()));
    let tasks: Arc<dyn TaskRepository> = repository.clone();

    let storage = pictor_storage::create_storage(&config)
        .await
        .context("Failed to initialise blob storage")?;

    let orchestrator = PipelineOrchestrator::from_config(&config, tasks.clone(), repository, storage)
        .context("Invalid DISABLED_OPERATIONS")?;

    let queue_config = TaskQueueConfig::from(&config);
    let poller = RepositoryPoller::new(
        tasks.clone(),
        Duration::from_millis(queue_config.poll_interval_ms),
        queue_config.max_workers * 2,
    )
    .with_listener(pool);

    let queue = TaskQueue::start(
        Arc::new(orchestrator),
        tasks,
        Box::new(poller),
        queue_config,
        None,
    );

    pictor_infra::shutdown_signal().await;
    queue.shutdown().await;

    tracing::info!("Pictor worker stopped");
    Ok(())
}
