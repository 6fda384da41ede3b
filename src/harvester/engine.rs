//! Enrichment loop for a single task
//!
//! One [`TaskRunner`] drives one task from creation to a terminal state:
//! page through keyword search, resolve and deduplicate channel ids, detail
//! them in batches (cache first), and offer each record to the task's filter
//! until the target is met or the search space runs out.
//!
//! Upstream calls are wrapped by [`TaskRunner::call_upstream`], which gates
//! on the shared [`RateGovernor`], retries transient failures with backoff and
//! cools down on quota/rate errors. Every wait in there is cut short by the
//! task's cancellation token; an in-flight request is always allowed to finish.

use super::state::{Offer, TaskState};
use crate::cache::ChannelCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::rate_governor::RateGovernor;
use crate::retry::{Backoff, IsRetryable, sleep_or_cancel};
use crate::types::{ChannelRecord, TaskId};
use crate::youtube::{SearchClient, SearchPage};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Whether the loop should keep paging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

/// Channel ids discovered so far in one task
#[derive(Debug, Default)]
struct Discovery {
    /// Channels queued or processed (never fetched twice)
    processed: HashSet<String>,
    /// Author handles and video ids already sent for resolution
    resolved_handles: HashSet<String>,
    ceiling: usize,
}

impl Discovery {
    fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            ..Self::default()
        }
    }

    fn ceiling_hit(&self) -> bool {
        self.processed.len() >= self.ceiling
    }

    /// Register a channel id; true if it is new and under the ceiling
    fn admit(&mut self, channel_id: String) -> bool {
        if self.ceiling_hit() || self.processed.contains(&channel_id) {
            return false;
        }
        self.processed.insert(channel_id)
    }
}

pub(crate) struct TaskRunner {
    pub(crate) id: TaskId,
    pub(crate) query: String,
    pub(crate) state: Arc<RwLock<TaskState>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) client: Arc<dyn SearchClient>,
    pub(crate) cache: ChannelCache,
    pub(crate) governor: RateGovernor,
    pub(crate) config: Arc<Config>,
}

impl TaskRunner {
    /// Run the task to a terminal state
    pub(crate) async fn run(self) {
        tracing::info!(task_id = %self.id, query = %self.query, "enrichment task started");

        match self.enrich().await {
            Ok(()) => {
                // exhausted search space or ceiling; no-op if already terminal
                self.state.write().await.complete();
            }
            Err(Error::Cancelled) => {}
            Err(e) => {
                tracing::error!(task_id = %self.id, error = %e, "enrichment task failed");
                self.state.write().await.fail(e.to_string());
            }
        }

        let snapshot = self.state.read().await.snapshot();
        tracing::info!(
            task_id = %self.id,
            status = ?snapshot.status,
            accepted = snapshot.current_count,
            scanned = snapshot.scanned_count,
            "enrichment task finished"
        );
    }

    async fn is_running(&self) -> bool {
        self.state.read().await.is_running()
    }

    async fn enrich(&self) -> Result<()> {
        let mut discovery = Discovery::new(self.config.tasks.max_discovered_channels);
        let mut page_token: Option<String> = None;
        let mut page_number = 0usize;

        while self.is_running().await {
            let page = self
                .call_upstream("search", || {
                    self.client.search(&self.query, page_token.as_deref())
                })
                .await?;
            page_number += 1;

            let last_page = page.is_last_page();
            page_token = page.next_page_token.clone();

            let new_ids = self.discover(&page, &mut discovery).await?;
            tracing::debug!(
                task_id = %self.id,
                page = page_number,
                new_channels = new_ids.len(),
                discovered = discovery.processed.len(),
                "search page processed"
            );

            if !new_ids.is_empty() && self.enrich_channels(&new_ids).await? == Flow::Done {
                return Ok(());
            }

            if last_page {
                tracing::debug!(task_id = %self.id, "search results exhausted");
                return Ok(());
            }
            if discovery.ceiling_hit() {
                tracing::info!(
                    task_id = %self.id,
                    ceiling = discovery.ceiling,
                    "discovered channel ceiling reached"
                );
                return Ok(());
            }
        }

        Ok(())
    }

    /// New channel ids from one page, in discovery order
    async fn discover(&self, page: &SearchPage, discovery: &mut Discovery) -> Result<Vec<String>> {
        let mut new_ids = Vec::new();
        let mut pending_videos = Vec::new();

        for item in &page.items {
            if let Some(channel_id) = item.direct_channel_id() {
                if discovery.admit(channel_id.clone()) {
                    new_ids.push(channel_id);
                }
                continue;
            }

            let Some(video_id) = item.video_id.clone() else {
                continue;
            };
            let handle = item.author_url.clone().unwrap_or_else(|| video_id.clone());
            if discovery.resolved_handles.insert(handle) {
                pending_videos.push(video_id);
            }
        }

        if pending_videos.is_empty() || discovery.ceiling_hit() {
            return Ok(new_ids);
        }

        let resolved = self
            .call_upstream("videos", || {
                self.client.resolve_video_channels(&pending_videos)
            })
            .await;

        match resolved {
            Ok(pairs) => {
                let owners: HashMap<String, String> = pairs.into_iter().collect();
                for video_id in &pending_videos {
                    if let Some(channel_id) = owners.get(video_id) {
                        if discovery.admit(channel_id.clone()) {
                            new_ids.push(channel_id.clone());
                        }
                    }
                }
            }
            Err(e) if e.is_quota_error() || matches!(e, Error::Cancelled) => return Err(e),
            Err(e) => {
                tracing::warn!(
                    task_id = %self.id,
                    videos = pending_videos.len(),
                    error = %e,
                    "video to channel resolution failed, skipping those results"
                );
            }
        }

        Ok(new_ids)
    }

    /// Detail and filter new channels, batch by batch
    async fn enrich_channels(&self, channel_ids: &[String]) -> Result<Flow> {
        let batch_size = self.config.tasks.detail_batch_size.max(1);

        for batch in channel_ids.chunks(batch_size) {
            if !self.is_running().await {
                return Ok(Flow::Done);
            }

            let mut cached = self.cache.get_batch(batch).await;
            let misses: Vec<String> = batch
                .iter()
                .filter(|id| !cached.contains_key(*id))
                .cloned()
                .collect();

            let mut fetched: HashMap<String, ChannelRecord> = HashMap::new();
            if !misses.is_empty() {
                let details = self
                    .call_upstream("channels", || self.client.channel_details(&misses))
                    .await;

                match details {
                    Ok(details) => {
                        for detail in details {
                            let record = detail.into_record();
                            self.cache.put(&record.channel_id, &record).await;
                            fetched.insert(record.channel_id.clone(), record);
                        }
                    }
                    Err(e) if e.is_quota_error() || matches!(e, Error::Cancelled) => {
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(
                            task_id = %self.id,
                            batch_size = batch.len(),
                            error = %e,
                            "channel detail batch failed, skipping"
                        );
                        continue;
                    }
                }
            }

            tracing::debug!(
                task_id = %self.id,
                cache_hits = cached.len(),
                fetched = fetched.len(),
                "channel batch detailed"
            );

            for channel_id in batch {
                // ids the provider did not return (deleted, terminated) are skipped
                let Some(record) = cached
                    .remove(channel_id)
                    .or_else(|| fetched.remove(channel_id))
                else {
                    continue;
                };

                let outcome = self.state.write().await.offer(record);
                match outcome {
                    Offer::TargetReached => {
                        tracing::info!(task_id = %self.id, "target count reached");
                        return Ok(Flow::Done);
                    }
                    Offer::NotRunning => return Ok(Flow::Done),
                    Offer::Accepted | Offer::Rejected => {}
                }
            }
        }

        Ok(Flow::Continue)
    }

    /// Issue one upstream call through the governor, retry and cooldown policy
    async fn call_upstream<T, F, Fut>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = Backoff::new(&self.config.retry);
        let mut quota_hits = 0u32;

        loop {
            if !self.governor.acquire(&self.cancel).await {
                return Err(Error::Cancelled);
            }

            let result = op().await;
            self.governor.record_request(result.is_ok()).await;

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.is_quota_error() {
                quota_hits += 1;
                if quota_hits > self.config.rate_limit.max_quota_retries {
                    return Err(err);
                }
                let cooldown = self.governor.quota_cooldown();
                tracing::warn!(
                    task_id = %self.id,
                    operation,
                    attempt = quota_hits,
                    cooldown_secs = cooldown.as_secs(),
                    error = %err,
                    "upstream quota or rate limit hit, cooling down"
                );
                if !sleep_or_cancel(cooldown, &self.cancel).await {
                    return Err(Error::Cancelled);
                }
                continue;
            }

            if err.is_retryable() {
                if let Some(delay) = backoff.next_delay() {
                    tracing::warn!(
                        task_id = %self.id,
                        operation,
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient upstream failure, retrying"
                    );
                    if !sleep_or_cancel(delay, &self.cancel).await {
                        return Err(Error::Cancelled);
                    }
                    continue;
                }
            }

            return Err(err);
        }
    }
}
