//! Cache store abstraction and the in-process LRU backend

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Errors raised by a cache store backend
#[derive(Debug, thiserror::Error)]
pub enum CacheStoreError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation failed: {0}")]
    Operation(String),
}

/// Key-value store shared by all workers.
///
/// Entries may disappear at any time; a missing entry is a miss, never an
/// error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheStoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Bounded in-memory store, least recently used entries evicted first
pub struct InMemoryCacheStore {
    entries: Mutex<LruCache<String, String>>,
}

impl InMemoryCacheStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheStoreError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheStoreError::Unavailable(e.to_string()))?;
        entries.put(key.to_string(), value.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
