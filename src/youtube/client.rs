//! reqwest-backed [`SearchClient`] for the YouTube Data API v3

use super::types::{
    ChannelDetail, ChannelListResponse, ErrorEnvelope, SearchListResponse, VideoListResponse,
};
use super::{SearchClient, SearchItem, SearchPage};
use crate::config::{PROVIDER_MAX_BATCH, YoutubeConfig};
use crate::error::{Error, Result, UpstreamError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Provider reasons that mean the daily quota is gone
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];

/// Provider reasons that mean "slow down"
const RATE_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// YouTube Data API v3 client
#[derive(Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: usize,
}

impl std::fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl YoutubeClient {
    /// Build a client from the `youtube` config section
    pub fn new(config: &YoutubeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_size: config.search_page_size,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, resource);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = classify_error(status.as_u16(), &body);
            tracing::warn!(resource, status = status.as_u16(), error = %error, "YouTube API request failed");
            return Err(error.into());
        }

        serde_json::from_str(&body).map_err(|e| {
            UpstreamError::InvalidResponse(format!("{resource}: {e}")).into()
        })
    }
}

/// Map a non-success provider response to an [`UpstreamError`]
pub(crate) fn classify_error(status: u16, body: &str) -> UpstreamError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let reason = envelope
        .error
        .errors
        .first()
        .map(|e| e.reason.clone())
        .unwrap_or_default();
    let message = if envelope.error.message.is_empty() {
        body.chars().take(200).collect()
    } else {
        envelope.error.message
    };

    if status == 403 && QUOTA_REASONS.contains(&reason.as_str()) {
        UpstreamError::QuotaExceeded { message }
    } else if status == 429 || RATE_REASONS.contains(&reason.as_str()) {
        UpstreamError::RateLimited { message }
    } else {
        UpstreamError::Api {
            status,
            reason,
            message,
        }
    }
}

#[async_trait]
impl SearchClient for YoutubeClient {
    async fn search(&self, query: &str, page_token: Option<&str>) -> Result<SearchPage> {
        let max_results = self.page_size.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("q", query),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: SearchListResponse = self.get_json("search", &params).await?;

        let items = response
            .items
            .into_iter()
            .map(|hit| SearchItem {
                video_id: hit.id.video_id,
                channel_id: hit.snippet.channel_id.or(hit.id.channel_id),
                author_url: None,
            })
            .collect();

        Ok(SearchPage {
            items,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn channel_details(&self, channel_ids: &[String]) -> Result<Vec<ChannelDetail>> {
        if channel_ids.is_empty() {
            return Ok(Vec::new());
        }
        if channel_ids.len() > PROVIDER_MAX_BATCH {
            return Err(Error::Validation(format!(
                "channel batch of {} exceeds provider limit of {}",
                channel_ids.len(),
                PROVIDER_MAX_BATCH
            )));
        }

        let ids = channel_ids.join(",");
        let response: ChannelListResponse = self
            .get_json(
                "channels",
                &[
                    ("part", "snippet,statistics,brandingSettings"),
                    ("id", ids.as_str()),
                    ("maxResults", "50"),
                ],
            )
            .await?;

        Ok(response.items)
    }

    async fn resolve_video_channels(&self, video_ids: &[String]) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::with_capacity(video_ids.len());

        for chunk in video_ids.chunks(PROVIDER_MAX_BATCH) {
            let ids = chunk.join(",");
            let response: VideoListResponse = self
                .get_json("videos", &[("part", "snippet"), ("id", ids.as_str())])
                .await?;

            pairs.extend(
                response
                    .items
                    .into_iter()
                    .filter_map(|video| video.snippet.channel_id.map(|c| (video.id, c))),
            );
        }

        Ok(pairs)
    }
}
