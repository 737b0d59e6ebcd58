//! Result cache for transformation chains
//!
//! Identical requests (same source image, same ordered chain, same target
//! format) map to the same [`CacheKey`]; the [`ResultCache`] remembers which
//! transformed image answered that key last.

pub mod cache_key;
pub mod result_cache;
pub mod store;

pub use cache_key::{CacheKey, CacheKeyGenerator};
pub use result_cache::ResultCache;
pub use store::{CacheStore, CacheStoreError, InMemoryCacheStore};
