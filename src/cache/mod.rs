//! Channel cache
//!
//! Maps a channel id to its enriched [`ChannelRecord`] with a time-to-live, so
//! repeat lookups across tasks skip the upstream detail call.
//!
//! With a Redis URL configured, Redis is the primary store and the in-process
//! [`MemoryStore`](memory::MemoryStore) takes over whenever Redis fails. No
//! cache error ever reaches a caller: failures are logged and surface only
//! through [`ChannelCache::health_check`] and [`ChannelCache::stats`].

use crate::config::CacheConfig;
use crate::types::ChannelRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

mod memory;
mod redis;

use memory::MemoryStore;
use redis::RedisStore;

/// Cache health classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Primary store reachable
    Ok,
    /// Configured backing store unreachable; serving from process memory
    Degraded,
}

/// Result of a cache health check
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    /// Overall status
    pub status: HealthStatus,
    /// Store answering lookups ("redis" or "memory")
    pub backend: String,
    /// Human-readable detail
    pub message: String,
    /// Ping round-trip time in milliseconds (Redis only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

/// Cache diagnostics
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Configured primary store ("redis" or "memory")
    pub backend: String,
    /// Whether a Redis connection is currently open
    pub connected: bool,
    /// Channel ids known to Redis, when reachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_channels: Option<usize>,
    /// Entries held in process memory
    pub memory_entries: usize,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

struct CacheInner {
    redis: Option<RedisStore>,
    redis_configured: bool,
    memory: MemoryStore,
    ttl: Duration,
}

/// Degrading channel cache
///
/// Cheap to clone; all clones share the same stores.
#[derive(Clone)]
pub struct ChannelCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for ChannelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCache")
            .field("redis", &self.inner.redis)
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}

impl ChannelCache {
    /// Build the cache from config
    ///
    /// An unusable Redis URL is logged and the cache runs degraded on process
    /// memory.
    pub fn new(config: &CacheConfig) -> Self {
        let redis = config.redis_url.as_deref().and_then(|url| {
            match RedisStore::open(url, &config.key_prefix, config.connect_timeout) {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis cache disabled, using in-process cache");
                    None
                }
            }
        });

        Self {
            inner: Arc::new(CacheInner {
                redis,
                redis_configured: config.redis_url.is_some(),
                memory: MemoryStore::new(),
                ttl: config.ttl,
            }),
        }
    }

    /// In-process cache only
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(&CacheConfig {
            redis_url: None,
            ttl,
            ..CacheConfig::default()
        })
    }

    /// Configured entry lifetime
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Look up one channel
    pub async fn get(&self, channel_id: &str) -> Option<ChannelRecord> {
        let ids = [channel_id.to_string()];
        self.get_batch(&ids).await.remove(channel_id)
    }

    /// Look up many channels, returning only the hits
    pub async fn get_batch(&self, channel_ids: &[String]) -> HashMap<String, ChannelRecord> {
        let mut found = HashMap::new();

        if let Some(redis) = &self.inner.redis {
            match redis.get_many(channel_ids).await {
                Ok(hits) => found = hits,
                Err(e) => {
                    tracing::warn!(error = %e, "Redis lookup failed, using in-process cache");
                }
            }
        }

        if found.len() < channel_ids.len() {
            let missing: Vec<String> = channel_ids
                .iter()
                .filter(|id| !found.contains_key(*id))
                .cloned()
                .collect();
            found.extend(self.inner.memory.get_many(&missing).await);
        }

        found
    }

    /// Store a record with the default TTL
    pub async fn put(&self, channel_id: &str, record: &ChannelRecord) {
        self.put_with_ttl(channel_id, record, self.inner.ttl).await;
    }

    /// Store a record with an explicit TTL
    pub async fn put_with_ttl(&self, channel_id: &str, record: &ChannelRecord, ttl: Duration) {
        if let Some(redis) = &self.inner.redis {
            match redis.put(channel_id, record, ttl).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(channel_id, error = %e, "Redis write failed, caching in process");
                }
            }
        }
        self.inner.memory.put(channel_id, record.clone(), ttl).await;
    }

    /// Drop a channel from every store
    pub async fn invalidate(&self, channel_id: &str) {
        if let Some(redis) = &self.inner.redis {
            if let Err(e) = redis.delete(channel_id).await {
                tracing::warn!(channel_id, error = %e, "Redis delete failed");
            }
        }
        self.inner.memory.remove(channel_id).await;
    }

    /// Push a live entry's expiry out to now + `ttl`
    pub async fn extend_ttl(&self, channel_id: &str, ttl: Duration) -> bool {
        if let Some(redis) = &self.inner.redis {
            match redis.expire(channel_id, ttl).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(channel_id, error = %e, "Redis expire failed");
                }
            }
        }
        self.inner.memory.extend(channel_id, ttl).await
    }

    /// Ping the backing store
    pub async fn health_check(&self) -> CacheHealth {
        if !self.inner.redis_configured {
            return CacheHealth {
                status: HealthStatus::Ok,
                backend: "memory".into(),
                message: "in-process cache".into(),
                response_time_ms: None,
            };
        }

        let Some(redis) = &self.inner.redis else {
            return CacheHealth {
                status: HealthStatus::Degraded,
                backend: "memory".into(),
                message: "Redis URL unusable, serving from process memory".into(),
                response_time_ms: None,
            };
        };

        let started = std::time::Instant::now();
        match redis.ping().await {
            Ok(()) => CacheHealth {
                status: HealthStatus::Ok,
                backend: "redis".into(),
                message: "Redis connection healthy".into(),
                response_time_ms: Some(started.elapsed().as_millis() as u64),
            },
            Err(e) => CacheHealth {
                status: HealthStatus::Degraded,
                backend: "memory".into(),
                message: format!("Redis unreachable, serving from process memory: {e}"),
                response_time_ms: None,
            },
        }
    }

    /// Sweep expired entries and reconcile the Redis index set
    ///
    /// Returns how many entries or index members were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut removed = self.inner.memory.sweep().await;

        if let Some(redis) = &self.inner.redis {
            match redis.reconcile().await {
                Ok(count) => removed += count,
                Err(e) => tracing::warn!(error = %e, "Redis index reconcile failed"),
            }
        }

        tracing::info!(removed, "cache cleanup finished");
        removed
    }

    /// Cache diagnostics
    pub async fn stats(&self) -> CacheStats {
        let (connected, known_channels) = match &self.inner.redis {
            Some(redis) => {
                let known = redis.known_count().await.ok();
                (redis.is_connected().await, known)
            }
            None => (false, None),
        };

        CacheStats {
            backend: if self.inner.redis_configured {
                "redis".into()
            } else {
                "memory".into()
            },
            connected,
            known_channels,
            memory_entries: self.inner.memory.len().await,
            ttl_secs: self.inner.ttl.as_secs(),
        }
    }

    /// Release the Redis connection and drop in-process entries
    pub async fn close(&self) {
        if let Some(redis) = &self.inner.redis {
            redis.close().await;
        }
        self.inner.memory.clear().await;
    }
}
