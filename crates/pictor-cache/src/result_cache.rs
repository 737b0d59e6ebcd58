use std::sync::Arc;
use uuid::Uuid;

use crate::cache_key::CacheKey;
use crate::store::CacheStore;

/// Best-effort map from [`CacheKey`] to the id of a stored result image.
///
/// Store errors are logged and swallowed: a failing cache turns every lookup
/// into a miss and every write into a no-op, but never fails a task.
#[derive(Clone)]
pub struct ResultCache {
    store: Option<Arc<dyn CacheStore>>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Cache that never hits and never stores
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Uuid> {
        let store = self.store.as_ref()?;

        match store.get(key.as_str()).await {
            Ok(Some(value)) => match Uuid::parse_str(&value) {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(
                        cache_key = %key,
                        value = %value,
                        "Ignoring malformed result cache entry"
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    cache_key = %key,
                    backend = store.backend_name(),
                    error = %e,
                    "Result cache lookup failed, treating as miss"
                );
                None
            }
        }
    }

    pub async fn set(&self, key: &CacheKey, result_image_id: Uuid) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        if let Err(e) = store.set(key.as_str(), &result_image_id.to_string()).await {
            tracing::warn!(
                cache_key = %key,
                result_image_id = %result_image_id,
                backend = store.backend_name(),
                error = %e,
                "Result cache write failed"
            );
        }
    }
}
