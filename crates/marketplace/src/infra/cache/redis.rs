//! Redis cache backend.
//!
//! Entries are JSON strings under `{namespace}:entry:{key}`; tag versions are
//! integer counters under `{namespace}:tag:{tag}` bumped with INCR.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use common::{AppResult, CacheConfig};
use domain::TagSet;

use super::{cache_error, CacheEntry, TagCache, TagVersions};

/// Redis backend with connection pooling.
#[derive(Clone)]
pub struct RedisTagCache {
    connection: ConnectionManager,
    namespace: String,
}

impl RedisTagCache {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!(namespace = %config.namespace, "Redis cache connected");

        Ok(Self {
            connection,
            namespace: config.namespace.clone(),
        })
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}:entry:{}", self.namespace, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}:tag:{}", self.namespace, tag)
    }
}

#[async_trait]
impl TagCache for RedisTagCache {
    async fn load(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(self.entry_key(key)).await.map_err(cache_error)?;

        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding malformed cache entry");
                None
            }
        }))
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(&entry).map_err(cache_error)?;
        let _: () = conn
            .set(self.entry_key(key), json)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.entry_key(key)).await.map_err(cache_error)?;
        Ok(())
    }

    async fn tag_versions(&self, tags: &TagSet) -> AppResult<TagVersions> {
        if tags.is_empty() {
            return Ok(TagVersions::new());
        }

        let keys: Vec<String> = tags.iter().map(|tag| self.tag_key(tag)).collect();
        let mut conn = self.connection.clone();
        let values: Vec<Option<u64>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(tags
            .iter()
            .cloned()
            .zip(values.into_iter().map(|v| v.unwrap_or(0)))
            .collect())
    }

    async fn invalidate(&self, tags: &TagSet) -> AppResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for tag in tags.iter() {
            pipe.incr(self.tag_key(tag), 1).ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(cache_error)?;
        tracing::debug!(count = tags.len(), "Bumped tag versions");
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
