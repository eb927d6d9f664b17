//! Tag-invalidated read cache.
//!
//! Every cached result is stored together with the version of each tag it was
//! registered under. Invalidating a tag bumps its version, so any entry that
//! recorded an older version is treated as a miss on its next read. Versions are
//! captured before the loader runs: a write that commits while a load is in
//! flight always leaves the freshly stored entry stale.
//!
//! The cache is never authoritative. Backend failures on the read path fall
//! through to the loader.

mod invalidation;
mod memory;
mod redis;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, warn};

use common::{AppError, AppResult};
use domain::TagSet;

pub use invalidation::Invalidation;
pub use memory::MemoryTagCache;
pub use self::redis::RedisTagCache;

/// Tag name to version.
pub type TagVersions = BTreeMap<String, u64>;

/// A serialized result and the tag versions it was computed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub versions: TagVersions,
}

/// Storage backend for cache entries and tag versions.
#[async_trait]
pub trait TagCache: Send + Sync {
    async fn load(&self, key: &str) -> AppResult<Option<CacheEntry>>;

    async fn store(&self, key: &str, entry: CacheEntry) -> AppResult<()>;

    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Current version of each tag; tags never invalidated are at version 0.
    async fn tag_versions(&self, tags: &TagSet) -> AppResult<TagVersions>;

    /// Bump the version of every tag in the set.
    async fn invalidate(&self, tags: &TagSet) -> AppResult<()>;

    async fn ping(&self) -> AppResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Hit and miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Typed read-through front end over a [`TagCache`] backend.
#[derive(Clone)]
pub struct DataCache {
    backend: Arc<dyn TagCache>,
    stats: Arc<CacheStats>,
}

impl DataCache {
    pub fn new(backend: Arc<dyn TagCache>) -> Self {
        Self {
            backend,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Process-local cache, used by tests and single-node deployments.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTagCache::new()))
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.backend.ping().await
    }

    /// Return the cached result for `key`, or run `loader` and cache its result
    /// under `tags`.
    pub async fn cached<T, F, Fut>(&self, key: &str, tags: TagSet, loader: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = AppResult<T>> + Send,
    {
        let versions = match self.backend.tag_versions(&tags).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache unavailable, reading from store");
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return loader().await;
            }
        };

        if let Some(value) = self.lookup::<T>(key, &versions).await {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");

        let value = loader().await?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                let entry = CacheEntry { payload, versions };
                if let Err(e) = self.backend.store(key, entry).await {
                    warn!(key = %key, error = %e, "Failed to store cache entry");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize cache entry"),
        }

        Ok(value)
    }

    /// Drop every cached result registered under any of `tags`.
    ///
    /// Failures are logged, not returned: the write that triggered the
    /// invalidation has already committed.
    pub async fn invalidate(&self, tags: TagSet) {
        if tags.is_empty() {
            return;
        }

        match self.backend.invalidate(&tags).await {
            Ok(()) => debug!(count = tags.len(), "Invalidated cache tags"),
            Err(e) => error!(
                error = %e,
                tags = ?tags.iter().collect::<Vec<_>>(),
                "Cache invalidation failed"
            ),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str, current: &TagVersions) -> Option<T> {
        let entry = match self.backend.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        if &entry.versions != current {
            debug!(key = %key, "Cache entry invalidated by tag");
            if let Err(e) = self.backend.remove(key).await {
                warn!(key = %key, error = %e, "Failed to drop stale cache entry");
            }
            return None;
        }

        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to deserialize cached value");
                None
            }
        }
    }
}

/// Convert a backend failure into an application error.
pub(crate) fn cache_error(e: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("Cache error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::tags::{global_tag, id_tag, CacheEntity};

    fn lesson_tags(id: &str) -> TagSet {
        TagSet::new()
            .with(global_tag(CacheEntity::Lessons))
            .with(id_tag(CacheEntity::Lessons, id))
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let cache = DataCache::in_memory();

        let first: String = cache
            .cached("lesson:1", lesson_tags("1"), || async { Ok("Intro".to_string()) })
            .await
            .unwrap();
        let second: String = cache
            .cached("lesson:1", lesson_tags("1"), || async {
                Ok("should not load".to_string())
            })
            .await
            .unwrap();

        assert_eq!(first, "Intro");
        assert_eq!(second, "Intro");
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[tokio::test]
    async fn test_invalidated_tag_forces_reload() {
        let cache = DataCache::in_memory();
        let _: String = cache
            .cached("lesson:1", lesson_tags("1"), || async { Ok("Old".to_string()) })
            .await
            .unwrap();

        cache
            .invalidate(TagSet::new().with(id_tag(CacheEntity::Lessons, "1")))
            .await;

        let reloaded: String = cache
            .cached("lesson:1", lesson_tags("1"), || async { Ok("New".to_string()) })
            .await
            .unwrap();
        assert_eq!(reloaded, "New");
    }

    #[tokio::test]
    async fn test_unrelated_tag_keeps_entry() {
        let cache = DataCache::in_memory();
        let _: String = cache
            .cached("lesson:1", lesson_tags("1"), || async { Ok("Kept".to_string()) })
            .await
            .unwrap();

        cache
            .invalidate(TagSet::new().with(id_tag(CacheEntity::Lessons, "2")))
            .await;

        let value: String = cache
            .cached("lesson:1", lesson_tags("1"), || async { Ok("Reloaded".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "Kept");
    }

    #[tokio::test]
    async fn test_invalidating_twice_matches_once() {
        let cache = DataCache::in_memory();
        let tags = TagSet::new().with(id_tag(CacheEntity::Lessons, "1"));
        cache.invalidate(tags.clone()).await;
        cache.invalidate(tags.clone()).await;

        let _: u32 = cache
            .cached("n", tags.clone(), || async { Ok(1) })
            .await
            .unwrap();
        let cached: u32 = cache.cached("n", tags, || async { Ok(2) }).await.unwrap();
        assert_eq!(cached, 1);
    }

    #[tokio::test]
    async fn test_invalidation_during_load_leaves_entry_stale() {
        let cache = DataCache::in_memory();
        let tags = lesson_tags("1");
        let writer = cache.clone();

        let loaded: String = cache
            .cached("lesson:1", tags.clone(), || async move {
                // A write commits and invalidates while this load is in flight.
                writer
                    .invalidate(TagSet::new().with(id_tag(CacheEntity::Lessons, "1")))
                    .await;
                Ok("Read before write".to_string())
            })
            .await
            .unwrap();
        assert_eq!(loaded, "Read before write");

        let next: String = cache
            .cached("lesson:1", tags, || async { Ok("Read after write".to_string()) })
            .await
            .unwrap();
        assert_eq!(next, "Read after write");
    }
}
