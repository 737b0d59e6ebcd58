//! S3 (and S3-compatible) blob store over `object_store`.
//!
//! Credentials are read from the usual `AWS_*` environment variables.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{Error as ObjectStoreError, ObjectStoreExt, PutPayload};
use std::time::Instant;
use uuid::Uuid;

use crate::keys::{generate_storage_key, object_url_base};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;

#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    url_base: String,
}

impl S3Storage {
    /// `endpoint` points at an S3-compatible provider such as MinIO; plain
    /// `http://` endpoints are allowed.
    pub async fn new(bucket: String, region: String, endpoint: Option<String>) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(&region)
            .with_bucket_name(&bucket);
        if let Some(endpoint) = endpoint.as_deref() {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let url_base = object_url_base(endpoint.as_deref(), &bucket, &region);
        Ok(Self {
            store,
            bucket,
            url_base,
        })
    }

    fn object_error(
        &self,
        key: &str,
        started: Instant,
        err: ObjectStoreError,
        wrap: fn(String) -> StorageError,
    ) -> StorageError {
        if let ObjectStoreError::NotFound { .. } = err {
            return StorageError::NotFound(key.to_string());
        }
        tracing::error!(
            error = %err,
            bucket = %self.bucket,
            key = %key,
            duration_ms = started.elapsed().as_millis() as u64,
            "S3 request failed"
        );
        wrap(err.to_string())
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        owner_id: Uuid,
        filename: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<(String, String)> {
        let key = generate_storage_key(owner_id, filename)?;
        let size_bytes = data.len();
        let started = Instant::now();

        self.store
            .put(&Path::from(key.as_str()), PutPayload::from(data))
            .await
            .map_err(|e| self.object_error(&key, started, e, StorageError::UploadFailed))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes,
            duration_ms = started.elapsed().as_millis() as u64,
            "Stored object"
        );
        let url = format!("{}/{}", self.url_base, key);
        Ok((key, url))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        let started = Instant::now();
        let object = self
            .store
            .get(&Path::from(storage_key))
            .await
            .map_err(|e| self.object_error(storage_key, started, e, StorageError::DownloadFailed))?;
        object
            .bytes()
            .await
            .map_err(|e| self.object_error(storage_key, started, e, StorageError::DownloadFailed))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let started = Instant::now();
        match self.store.delete(&Path::from(storage_key)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(self.object_error(storage_key, started, e, StorageError::DeleteFailed)),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self.store.head(&Path::from(storage_key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
