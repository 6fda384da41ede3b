//! Redis-backed channel store
//!
//! # Key layout
//!
//! - `{prefix}:channel:{channel_id}` holds a JSON entry
//!   `{"data": <ChannelRecord>, "timestamp": <ms>, "expireAt": <ms>}` written
//!   with `SETEX`, so Redis expires it natively.
//! - `{prefix}:channels:set` is a set of every channel id ever written. It
//!   outlives the entries and is reconciled by [`RedisStore::reconcile`].
//!
//! A single multiplexed connection is opened lazily and shared. Any command
//! error drops it so the next call reconnects; after a failed connect the
//! store stays down for `RECONNECT_BACKOFF` instead of paying the connect
//! timeout on every lookup. Once closed the store refuses to reconnect.

use crate::error::CacheError;
use crate::types::ChannelRecord;
use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    data: ChannelRecord,
    timestamp: i64,
    expire_at: i64,
}

#[derive(Default)]
struct ConnectionSlot {
    conn: Option<MultiplexedConnection>,
    down_until: Option<Instant>,
}

pub(crate) struct RedisStore {
    client: ::redis::Client,
    key_prefix: String,
    connect_timeout: Duration,
    slot: Mutex<ConnectionSlot>,
    closed: AtomicBool,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Parse the URL; no connection is made until first use
    pub(crate) fn open(
        url: &str,
        key_prefix: &str,
        connect_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid Redis URL: {e}")))?;

        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            connect_timeout,
            slot: Mutex::new(ConnectionSlot::default()),
            closed: AtomicBool::new(false),
        })
    }

    fn channel_key(&self, channel_id: &str) -> String {
        format!("{}:channel:{}", self.key_prefix, channel_id)
    }

    fn index_key(&self) -> String {
        format!("{}:channels:set", self.key_prefix)
    }

    /// Shared connection, connecting if needed
    ///
    /// `force` ignores the reconnect backoff (health checks).
    async fn connection(&self, force: bool) -> Result<MultiplexedConnection, CacheError> {
        let mut slot = self.slot.lock().await;

        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Unavailable("Redis store closed".into()));
        }
        if let Some(conn) = &slot.conn {
            return Ok(conn.clone());
        }
        let backing_off = slot.down_until.is_some_and(|until| Instant::now() < until);
        if backing_off && !force {
            return Err(CacheError::Unavailable(
                "Redis marked down, waiting before reconnect".into(),
            ));
        }

        let connected = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await;

        match connected {
            Ok(Ok(conn)) => {
                if slot.down_until.take().is_some() {
                    tracing::info!("Redis connection restored");
                }
                slot.conn = Some(conn.clone());
                Ok(conn)
            }
            Ok(Err(e)) => {
                slot.down_until = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(CacheError::Unavailable(format!("failed to connect to Redis: {e}")))
            }
            Err(_) => {
                slot.down_until = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(CacheError::Unavailable(format!(
                    "Redis connect timed out after {:?}",
                    self.connect_timeout
                )))
            }
        }
    }

    async fn drop_connection(&self) {
        self.slot.lock().await.conn = None;
    }

    /// Run a command closure, dropping the connection on failure
    async fn with_conn<T, F, Fut>(&self, force: bool, op: F) -> Result<T, CacheError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = Result<T, ::redis::RedisError>>,
    {
        let conn = self.connection(force).await?;
        match op(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.drop_connection().await;
                Err(e.into())
            }
        }
    }

    pub(crate) async fn get_many(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ChannelRecord>, CacheError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.channel_key(id)).collect();
        let raw: Vec<Option<String>> = self
            .with_conn(false, |mut conn| async move { conn.mget(&keys).await })
            .await?;

        let mut found = HashMap::new();
        for (id, value) in ids.iter().zip(raw) {
            let Some(json) = value else { continue };
            match serde_json::from_str::<StoredEntry>(&json) {
                Ok(entry) => {
                    found.insert(id.clone(), entry.data);
                }
                Err(e) => {
                    let err = CacheError::Corrupt {
                        key: self.channel_key(id),
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %err, "ignoring unreadable cache entry");
                }
            }
        }

        Ok(found)
    }

    pub(crate) async fn put(
        &self,
        id: &str,
        record: &ChannelRecord,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = StoredEntry {
            data: record.clone(),
            timestamp: now,
            expire_at: now.saturating_add(ttl_ms),
        };
        let json = serde_json::to_string(&entry).map_err(|e| CacheError::Corrupt {
            key: self.channel_key(id),
            reason: e.to_string(),
        })?;

        let key = self.channel_key(id);
        let index = self.index_key();
        let seconds = ttl.as_secs().max(1);
        let id = id.to_string();

        self.with_conn(false, |mut conn| async move {
            let _: () = conn.set_ex(&key, json, seconds).await?;
            let _: () = conn.sadd(&index, &id).await?;
            Ok(())
        })
        .await
    }

    pub(crate) async fn delete(&self, id: &str) -> Result<(), CacheError> {
        let key = self.channel_key(id);
        let index = self.index_key();
        let id = id.to_string();

        self.with_conn(false, |mut conn| async move {
            let _: () = conn.del(&key).await?;
            let _: () = conn.srem(&index, &id).await?;
            Ok(())
        })
        .await
    }

    pub(crate) async fn expire(&self, id: &str, ttl: Duration) -> Result<bool, CacheError> {
        let key = self.channel_key(id);
        let seconds = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);

        self.with_conn(false, |mut conn| async move { conn.expire(&key, seconds).await })
            .await
    }

    pub(crate) async fn ping(&self) -> Result<(), CacheError> {
        self.with_conn(true, |mut conn| async move {
            let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    /// Remove index members whose entry has expired, returning how many
    pub(crate) async fn reconcile(&self) -> Result<usize, CacheError> {
        let index = self.index_key();
        let members: Vec<String> = {
            let index = index.clone();
            self.with_conn(false, |mut conn| async move { conn.smembers(&index).await })
                .await?
        };

        let mut removed = 0;
        for id in members {
            let key = self.channel_key(&id);
            let index = index.clone();
            let stale = self
                .with_conn(false, |mut conn| async move {
                    let exists: bool = conn.exists(&key).await?;
                    if !exists {
                        let _: () = conn.srem(&index, &id).await?;
                    }
                    Ok(!exists)
                })
                .await?;
            if stale {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Channel ids in the index set (may include expired ones until reconciled)
    pub(crate) async fn known_count(&self) -> Result<usize, CacheError> {
        let index = self.index_key();
        self.with_conn(false, |mut conn| async move { conn.scard(&index).await })
            .await
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.slot.lock().await.conn.is_some()
    }

    pub(crate) async fn close(&self) {
        let mut slot = self.slot.lock().await;
        self.closed.store(true, Ordering::Release);
        if slot.conn.take().is_some() {
            tracing::info!("Redis connection released");
        }
    }
}
