//! Configuration module
//!
//! Worker configuration is read from the environment (after `.env` is loaded by
//! the binary). Numeric values that fail to parse fall back to their defaults;
//! structural problems are reported by [`WorkerConfig::validate`].

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const TASK_QUEUE_MAX_WORKERS: usize = 4;
const TASK_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const STALE_TASK_REAP_INTERVAL_SECS: u64 = 60;
const STALE_TASK_GRACE_PERIOD_SECS: i64 = 900;
const RESULT_CACHE_CAPACITY: usize = 10_000;
const JPEG_QUALITY: u8 = 90;
const LOCAL_STORAGE_PATH: &str = "./data/media";
const LOCAL_STORAGE_BASE_URL: &str = "http://localhost:4000/media";

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Transformation worker configuration
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Blob store
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    // Task queue
    pub task_queue_max_workers: usize,
    pub task_queue_poll_interval_ms: u64,
    /// Interval in seconds between runs of the stale task reaper. 0 = disabled.
    pub task_queue_stale_task_reap_interval_secs: u64,
    /// Age in seconds after which an IN_PROGRESS task is considered abandoned.
    pub task_queue_stale_task_grace_period_secs: i64,
    // Result cache
    pub result_cache_enabled: bool,
    pub result_cache_capacity: usize,
    // Encoding
    pub jpeg_quality: u8,
    /// Operation names removed from the registry (lowercased).
    pub disabled_operations: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: StorageBackend::Local,
            local_storage_path: LOCAL_STORAGE_PATH.to_string(),
            local_storage_base_url: LOCAL_STORAGE_BASE_URL.to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            task_queue_max_workers: TASK_QUEUE_MAX_WORKERS,
            task_queue_poll_interval_ms: TASK_QUEUE_POLL_INTERVAL_MS,
            task_queue_stale_task_reap_interval_secs: STALE_TASK_REAP_INTERVAL_SECS,
            task_queue_stale_task_grace_period_secs: STALE_TASK_GRACE_PERIOD_SECS,
            result_cache_enabled: true,
            result_cache_capacity: RESULT_CACHE_CAPACITY,
            jpeg_quality: JPEG_QUALITY,
            disabled_operations: Vec::new(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse::<LogFormat>()?,
            None => LogFormat::Pretty,
        };

        let config = WorkerConfig {
            environment: lookup("ENVIRONMENT")
                .or_else(|| lookup("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|| LOCAL_STORAGE_BASE_URL.to_string()),
            s3_bucket: lookup("S3_BUCKET").filter(|s| !s.is_empty()),
            s3_region: lookup("S3_REGION")
                .or_else(|| lookup("AWS_REGION"))
                .filter(|s| !s.is_empty()),
            s3_endpoint: lookup("S3_ENDPOINT").filter(|s| !s.is_empty()),
            task_queue_max_workers: lookup("TASK_QUEUE_MAX_WORKERS")
                .unwrap_or_else(|| TASK_QUEUE_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_WORKERS),
            task_queue_poll_interval_ms: lookup("TASK_QUEUE_POLL_INTERVAL_MS")
                .unwrap_or_else(|| TASK_QUEUE_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_POLL_INTERVAL_MS),
            task_queue_stale_task_reap_interval_secs: lookup(
                "TASK_QUEUE_STALE_TASK_REAP_INTERVAL_SECS",
            )
            .unwrap_or_else(|| STALE_TASK_REAP_INTERVAL_SECS.to_string())
            .parse()
            .unwrap_or(STALE_TASK_REAP_INTERVAL_SECS),
            task_queue_stale_task_grace_period_secs: lookup(
                "TASK_QUEUE_STALE_TASK_GRACE_PERIOD_SECS",
            )
            .unwrap_or_else(|| STALE_TASK_GRACE_PERIOD_SECS.to_string())
            .parse()
            .unwrap_or(STALE_TASK_GRACE_PERIOD_SECS),
            result_cache_enabled: lookup("RESULT_CACHE_ENABLED")
                .unwrap_or_else(|| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            result_cache_capacity: lookup("RESULT_CACHE_CAPACITY")
                .unwrap_or_else(|| RESULT_CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(RESULT_CACHE_CAPACITY),
            // Parsed as u16 so that out-of-range values reach validate() instead of
            // silently falling back to the default.
            jpeg_quality: lookup("JPEG_QUALITY")
                .and_then(|s| s.trim().parse::<u16>().ok())
                .map(|q| q.min(u8::MAX as u16) as u8)
                .unwrap_or(JPEG_QUALITY),
            disabled_operations: lookup("DISABLED_OPERATIONS")
                .map(|s| {
                    s.split(',')
                        .map(|op| op.trim().to_lowercase())
                        .filter(|op| !op.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.task_queue_max_workers == 0 {
            return Err(anyhow::anyhow!(
                "TASK_QUEUE_MAX_WORKERS must be at least 1"
            ));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow::anyhow!("JPEG_QUALITY must be between 1 and 100"));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must not be empty when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// `DATABASE_URL`, or an error naming the variable when it is missing.
    pub fn require_database_url(&self) -> Result<&str, anyhow::Error> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set to run the worker"))
    }
}
