//! External search client
//!
//! The harvester only needs three provider operations: keyword search by page,
//! batched channel detail lookup, and resolving video ids to their owning
//! channel. [`SearchClient`] is that seam; [`YoutubeClient`] implements it
//! against the YouTube Data API v3 and tests substitute in-process mocks.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

mod client;
mod types;

pub use client::YoutubeClient;
pub use types::{
    BrandingChannel, BrandingSettings, ChannelDetail, ChannelSnippet, ChannelStatistics,
    Localized, Thumbnail, Thumbnails,
};

#[allow(clippy::expect_used)]
static CHANNEL_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/channel/([\w-]+)").expect("channel URL pattern is valid"));

/// One search hit, reduced to what channel resolution needs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchItem {
    /// Video identifier, used as fallback for channel resolution
    pub video_id: Option<String>,
    /// Stable channel identifier, when the provider exposes one
    pub channel_id: Option<String>,
    /// Author URL, either `/channel/<id>` or a handle-style `/@name`
    pub author_url: Option<String>,
}

impl SearchItem {
    /// Channel id available without another upstream call
    pub fn direct_channel_id(&self) -> Option<String> {
        self.channel_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| self.author_url.as_deref().and_then(extract_channel_id))
    }
}

/// One page of search results
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Hits in provider order
    pub items: Vec<SearchItem>,
    /// Cursor for the following page; `None` on the last page
    pub next_page_token: Option<String>,
}

impl SearchPage {
    /// Whether the provider signaled there are no more pages
    pub fn is_last_page(&self) -> bool {
        self.next_page_token.is_none()
    }
}

/// Upstream content API operations used by the harvester
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch one page of keyword search results
    async fn search(&self, query: &str, page_token: Option<&str>) -> Result<SearchPage>;

    /// Fetch full detail records for at most [`PROVIDER_MAX_BATCH`](crate::config::PROVIDER_MAX_BATCH) channels
    ///
    /// Unknown ids are silently absent from the result.
    async fn channel_details(&self, channel_ids: &[String]) -> Result<Vec<ChannelDetail>>;

    /// Map video ids to `(video_id, channel_id)` pairs
    async fn resolve_video_channels(&self, video_ids: &[String]) -> Result<Vec<(String, String)>>;
}

/// Pull the channel id out of a `/channel/<id>` author URL
///
/// Handle-style URLs (`/@name`, `/user/name`) return `None`.
pub fn extract_channel_id(author_url: &str) -> Option<String> {
    CHANNEL_URL_PATTERN
        .captures(author_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
