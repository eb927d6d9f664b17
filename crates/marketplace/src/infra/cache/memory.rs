//! Process-local cache backend.

use async_trait::async_trait;
use dashmap::DashMap;

use common::AppResult;
use domain::TagSet;

use super::{CacheEntry, TagCache, TagVersions};

/// In-memory backend. Entries live until invalidated or the process exits.
#[derive(Debug, Default)]
pub struct MemoryTagCache {
    entries: DashMap<String, CacheEntry>,
    versions: DashMap<String, u64>,
}

impl MemoryTagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TagCache for MemoryTagCache {
    async fn load(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> AppResult<()> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn tag_versions(&self, tags: &TagSet) -> AppResult<TagVersions> {
        Ok(tags
            .iter()
            .map(|tag| {
                let version = self.versions.get(tag).map(|v| *v).unwrap_or(0);
                (tag.clone(), version)
            })
            .collect())
    }

    async fn invalidate(&self, tags: &TagSet) -> AppResult<()> {
        for tag in tags.iter() {
            *self.versions.entry(tag.clone()).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_tags_start_at_zero() {
        let cache = MemoryTagCache::new();
        let tags = TagSet::new().with("global:lessons".to_string());

        let versions = cache.tag_versions(&tags).await.unwrap();
        assert_eq!(versions.get("global:lessons"), Some(&0));

        cache.invalidate(&tags).await.unwrap();
        let versions = cache.tag_versions(&tags).await.unwrap();
        assert_eq!(versions.get("global:lessons"), Some(&1));
    }
}
