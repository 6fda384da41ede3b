//! Wire types for the YouTube Data API v3
//!
//! Only the fields the harvester reads are modeled; everything is defaulted so
//! partial provider payloads still decode.

use crate::email::extract_emails;
use crate::types::ChannelRecord;
use serde::{Deserialize, Serialize};

/// `search.list` response page
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct SearchResult {
    #[serde(default)]
    pub id: SearchResultId,
    #[serde(default)]
    pub snippet: SearchSnippet,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResultId {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchSnippet {
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// `channels.list` response
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelDetail>,
}

/// `videos.list` response
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub snippet: SearchSnippet,
}

/// Provider error envelope: `{"error": {"code", "message", "errors": [{"reason"}]}}`
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorBody,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ErrorItem {
    #[serde(default)]
    pub reason: String,
}

/// Full channel detail record as returned by `channels.list`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetail {
    /// Channel identifier
    pub id: String,
    /// Title, descriptions, thumbnails
    #[serde(default)]
    pub snippet: ChannelSnippet,
    /// Public counters
    #[serde(default)]
    pub statistics: ChannelStatistics,
    /// Branding metadata
    #[serde(default)]
    pub branding_settings: BrandingSettings,
}

/// `snippet` part of a channel
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    /// Channel title
    #[serde(default)]
    pub title: String,
    /// Primary description
    #[serde(default)]
    pub description: String,
    /// Vanity URL
    #[serde(default)]
    pub custom_url: Option<String>,
    /// Thumbnail set
    #[serde(default)]
    pub thumbnails: Thumbnails,
    /// Localized title/description
    #[serde(default)]
    pub localized: Option<Localized>,
    /// Country the channel is associated with
    #[serde(default)]
    pub country: Option<String>,
}

/// Thumbnail set; only the default size is used
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnails {
    /// Default-size thumbnail
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

/// Single thumbnail
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Image URL
    pub url: String,
}

/// Localized snippet fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Localized {
    /// Localized description
    #[serde(default)]
    pub description: Option<String>,
}

/// `statistics` part of a channel; counts stay strings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    /// Subscriber count (absent when hidden by the owner)
    #[serde(default)]
    pub subscriber_count: Option<String>,
    /// Total views
    #[serde(default)]
    pub view_count: Option<String>,
    /// Uploaded videos
    #[serde(default)]
    pub video_count: Option<String>,
}

/// `brandingSettings` part of a channel
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandingSettings {
    /// Channel branding
    #[serde(default)]
    pub channel: Option<BrandingChannel>,
}

/// `brandingSettings.channel`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandingChannel {
    /// Branding description
    #[serde(default)]
    pub description: Option<String>,
    /// Space-separated keywords
    #[serde(default)]
    pub keywords: Option<String>,
    /// Branding country
    #[serde(default)]
    pub country: Option<String>,
}

impl ChannelDetail {
    /// Build the enriched record, extracting emails from every description field
    pub fn into_record(self) -> ChannelRecord {
        let branding = self.branding_settings.channel.unwrap_or_default();
        let localized_description = self.snippet.localized.and_then(|l| l.description);

        let emails = extract_emails([
            Some(self.snippet.description.as_str()),
            localized_description.as_deref(),
            branding.description.as_deref(),
        ]);

        ChannelRecord {
            channel_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            custom_url: self.snippet.custom_url,
            subscribers: self
                .statistics
                .subscriber_count
                .unwrap_or_else(|| "0".into()),
            views: self.statistics.view_count.unwrap_or_else(|| "0".into()),
            videos: self.statistics.video_count.unwrap_or_else(|| "0".into()),
            thumbnail: self
                .snippet
                .thumbnails
                .default
                .map(|t| t.url)
                .unwrap_or_default(),
            emails,
            keywords: branding.keywords,
            country: self.snippet.country.or(branding.country),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_detail_decodes_provider_payload() {
        let json = serde_json::json!({
            "kind": "youtube#channel",
            "id": "UCabc",
            "snippet": {
                "title": "Pasta Lab",
                "description": "Weekly pasta. business@pastalab.it",
                "customUrl": "@pastalab",
                "thumbnails": { "default": { "url": "https://yt3.ggpht.com/a.jpg", "width": 88 } },
                "localized": { "title": "Pasta Lab", "description": "Weekly pasta. business@pastalab.it" }
            },
            "statistics": {
                "viewCount": "123456789012345678901",
                "subscriberCount": "42000",
                "hiddenSubscriberCount": false,
                "videoCount": "310"
            },
            "brandingSettings": {
                "channel": { "description": "Press: press@pastalab.it", "keywords": "pasta cooking", "country": "IT" }
            }
        });

        let detail: ChannelDetail = serde_json::from_value(json).unwrap();
        let record = detail.into_record();

        assert_eq!(record.channel_id, "UCabc");
        assert_eq!(record.custom_url.as_deref(), Some("@pastalab"));
        assert_eq!(record.views, "123456789012345678901");
        assert_eq!(record.thumbnail, "https://yt3.ggpht.com/a.jpg");
        assert_eq!(
            record.emails,
            vec!["business@pastalab.it", "press@pastalab.it"]
        );
        assert_eq!(record.keywords.as_deref(), Some("pasta cooking"));
        assert_eq!(record.country.as_deref(), Some("IT"));
    }

    #[test]
    fn sparse_channel_detail_still_builds_a_record() {
        let detail: ChannelDetail = serde_json::from_str(r#"{"id":"UCbare"}"#).unwrap();
        let record = detail.into_record();

        assert_eq!(record.channel_id, "UCbare");
        assert_eq!(record.subscribers, "0");
        assert!(record.thumbnail.is_empty());
        assert!(record.emails.is_empty());
    }
}
