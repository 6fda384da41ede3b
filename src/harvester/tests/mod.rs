//! Harvester tests driven by an in-process search client

use super::*;
use crate::error::UpstreamError;
use crate::youtube::{ChannelDetail, ChannelSnippet, SearchItem, SearchPage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::Notify;


/// Scripted [`SearchClient`] with call counters
#[derive(Default)]
pub(super) struct MockSearchClient {
    pages: Vec<SearchPage>,
    details: HashMap<String, ChannelDetail>,
    video_owners: HashMap<String, String>,
    search_errors: Mutex<HashMap<usize, VecDeque<Error>>>,
    detail_errors: Mutex<VecDeque<Error>>,
    /// Detail calls beyond the first N wait for a notification
    detail_gate: Option<(usize, Arc<Notify>)>,
    pub(super) search_calls: AtomicUsize,
    pub(super) detail_calls: AtomicUsize,
    pub(super) video_calls: AtomicUsize,
    pub(super) requested_ids: Mutex<Vec<String>>,
}

impl MockSearchClient {
    /// Pages of channel ids; `emails` lists the ids whose description has an email
    pub(super) fn new(layout: &[&[&str]], emails: &[&str]) -> Self {
        let page_count = layout.len();
        let pages = layout
            .iter()
            .enumerate()
            .map(|(index, ids)| SearchPage {
                items: ids
                    .iter()
                    .map(|id| SearchItem {
                        video_id: Some(format!("vid-{id}")),
                        channel_id: Some(id.to_string()),
                        author_url: None,
                    })
                    .collect(),
                next_page_token: (index + 1 < page_count).then(|| format!("page-{}", index + 1)),
            })
            .collect();

        let details = layout
            .iter()
            .flat_map(|ids| ids.iter())
            .map(|id| (id.to_string(), channel(id, emails.contains(id))))
            .collect();

        Self {
            pages,
            details,
            ..Self::default()
        }
    }

    pub(super) fn with_pages(mut self, pages: Vec<SearchPage>) -> Self {
        self.pages = pages;
        self
    }

    pub(super) fn with_detail(mut self, detail: ChannelDetail) -> Self {
        self.details.insert(detail.id.clone(), detail);
        self
    }

    pub(super) fn with_video_owner(mut self, video_id: &str, channel_id: &str) -> Self {
        self.video_owners
            .insert(video_id.to_string(), channel_id.to_string());
        self
    }

    pub(super) fn with_search_errors(self, page: usize, errors: Vec<Error>) -> Self {
        self.search_errors
            .lock()
            .unwrap()
            .insert(page, errors.into());
        self
    }

    pub(super) fn with_detail_errors(self, errors: Vec<Error>) -> Self {
        *self.detail_errors.lock().unwrap() = errors.into();
        self
    }

    pub(super) fn with_detail_gate(mut self, open_calls: usize, gate: Arc<Notify>) -> Self {
        self.detail_gate = Some((open_calls, gate));
        self
    }

    pub(super) fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub(super) fn detail_lookups(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub(super) fn requested(&self) -> Vec<String> {
        self.requested_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, _query: &str, page_token: Option<&str>) -> Result<SearchPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let index = page_token
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);

        let scripted = self
            .search_errors
            .lock()
            .unwrap()
            .get_mut(&index)
            .and_then(|errors| errors.pop_front());
        if let Some(err) = scripted {
            return Err(err);
        }

        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn channel_details(&self, channel_ids: &[String]) -> Result<Vec<ChannelDetail>> {
        let call = self.detail_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested_ids
            .lock()
            .unwrap()
            .extend(channel_ids.iter().cloned());

        if let Some((open_calls, gate)) = &self.detail_gate {
            if call > *open_calls {
                gate.notified().await;
            }
        }

        let scripted = self.detail_errors.lock().unwrap().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }

        Ok(channel_ids
            .iter()
            .filter_map(|id| self.details.get(id).cloned())
            .collect())
    }

    async fn resolve_video_channels(&self, video_ids: &[String]) -> Result<Vec<(String, String)>> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        Ok(video_ids
            .iter()
            .filter_map(|v| self.video_owners.get(v).map(|c| (v.clone(), c.clone())))
            .collect())
    }
}

/// Provider detail record, with a contact email when `with_email`
pub(super) fn channel(id: &str, with_email: bool) -> ChannelDetail {
    let description = if with_email {
        format!("Business inquiries: contact@{}.com", id.to_lowercase())
    } else {
        "New recipes every Sunday".to_string()
    };

    ChannelDetail {
        id: id.to_string(),
        snippet: ChannelSnippet {
            title: format!("Channel {id}"),
            description,
            ..ChannelSnippet::default()
        },
        ..ChannelDetail::default()
    }
}

pub(super) fn quota_error() -> Error {
    Error::Upstream(UpstreamError::QuotaExceeded {
        message: "The request cannot be completed because you have exceeded your quota.".into(),
    })
}

pub(super) fn api_error(status: u16, reason: &str) -> Error {
    Error::Upstream(UpstreamError::Api {
        status,
        reason: reason.into(),
        message: format!("provider said {reason}"),
    })
}

/// Fast pacing so tests spend no time in governor waits
pub(super) fn test_config() -> Config {
    let mut config = Config::default();
    config.rate_limit.base_delay = Duration::ZERO;
    config.rate_limit.quota_cooldown = Duration::from_secs(1);
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.jitter = false;
    config
}

pub(super) fn harvester_with(client: &Arc<MockSearchClient>, config: Config) -> ChannelHarvester {
    let cache = ChannelCache::in_memory(Duration::from_secs(3600));
    ChannelHarvester::with_parts(config, client.clone(), cache)
}

/// Poll until `done` holds for the task's snapshot
pub(super) async fn wait_for(
    harvester: &ChannelHarvester,
    id: TaskId,
    done: impl Fn(&TaskSnapshot) -> bool,
) -> TaskSnapshot {
    for _ in 0..2_000 {
        if let Some(snapshot) = harvester.get_task(id).await {
            if done(&snapshot) {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} never reached the expected state");
}

pub(super) async fn wait_terminal(harvester: &ChannelHarvester, id: TaskId) -> TaskSnapshot {
    wait_for(harvester, id, |s| s.status.is_terminal()).await
}

pub(super) fn result_ids(snapshot: &TaskSnapshot) -> Vec<&str> {
    snapshot
        .results
        .iter()
        .map(|r| r.channel_id.as_str())
        .collect()
}
