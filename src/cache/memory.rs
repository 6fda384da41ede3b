//! In-process TTL store
//!
//! Primary store when no Redis URL is configured, fallback when Redis is
//! unreachable. Entries expire lazily on read and are swept by
//! [`MemoryStore::sweep`].

use crate::types::ChannelRecord;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct MemoryEntry {
    record: ChannelRecord,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get_many(&self, ids: &[String]) -> HashMap<String, ChannelRecord> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let mut found = HashMap::new();

        for id in ids {
            match entries.get(id) {
                Some(entry) if entry.is_live(now) => {
                    found.insert(id.clone(), entry.record.clone());
                }
                Some(_) => {
                    entries.remove(id);
                }
                None => {}
            }
        }

        found
    }

    pub(crate) async fn put(&self, id: &str, record: ChannelRecord, ttl: Duration) {
        let entry = MemoryEntry {
            record,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().await.insert(id.to_string(), entry);
    }

    pub(crate) async fn remove(&self, id: &str) -> bool {
        self.entries.lock().await.remove(id).is_some()
    }

    /// Push a live entry's expiry out to now + `ttl`
    pub(crate) async fn extend(&self, id: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get_mut(id) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub(crate) async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub(crate) async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
