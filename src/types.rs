//! Core types for channel-scout

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for an enrichment task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
    /// Generate a fresh random TaskId
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task status
///
/// `Running` is the only non-terminal state; the others are final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Engine loop is executing
    Running,
    /// Target reached or search space exhausted
    Completed,
    /// Stopped on external request
    Stopped,
    /// Unrecoverable engine fault
    Error,
}

impl TaskStatus {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

/// Which discovered channels a task keeps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Keep only channels with at least one extracted email (wire value "1")
    EmailsOnly,
    /// Keep every channel that could be detailed (wire value "2")
    All,
}

impl FilterMode {
    /// Whether a channel with the given emails passes this filter
    pub fn accepts(&self, emails: &[String]) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::EmailsOnly => !emails.is_empty(),
        }
    }
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "emails-only" | "emails_only" => Ok(FilterMode::EmailsOnly),
            "2" | "all" => Ok(FilterMode::All),
            other => Err(format!(
                "invalid filter mode '{other}' (expected '1' for emails only or '2' for all channels)"
            )),
        }
    }
}

/// Enriched channel snapshot
///
/// Counts are kept as the provider's decimal strings; they can exceed the
/// range some consumers treat as safe integers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    /// Provider channel identifier
    pub channel_id: String,
    /// Channel title
    pub title: String,
    /// Primary channel description
    pub description: String,
    /// Vanity URL (e.g. "@somechannel")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    /// Subscriber count as reported upstream
    pub subscribers: String,
    /// Total view count as reported upstream
    pub views: String,
    /// Uploaded video count as reported upstream
    pub videos: String,
    /// Default thumbnail URL
    pub thumbnail: String,
    /// Distinct emails found in the channel's descriptions
    pub emails: Vec<String>,
    /// Branding keywords
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Branding country
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Point-in-time view of a task, as returned to pollers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    /// Task identifier
    pub task_id: TaskId,
    /// Search keyword
    pub query: String,
    /// Filter applied to discovered channels
    pub filter_mode: FilterMode,
    /// Requested number of accepted channels
    pub target_count: usize,
    /// Current status
    pub status: TaskStatus,
    /// Integer percentage of the target reached (100 once completed)
    pub progress: u8,
    /// Accepted channel count (always equals `results.len()`)
    pub current_count: usize,
    /// Channels reported as found; mirrors the accepted count
    pub total_found: usize,
    /// Channels that were detailed and run through the filter, accepted or not
    pub scanned_count: usize,
    /// Accepted channels in discovery order
    pub results: Vec<ChannelRecord>,
    /// Failure description when status is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the task was created
    pub started_at: DateTime<Utc>,
    /// When the task reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Registry-wide task counts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskStats {
    /// Tasks currently tracked
    pub total: usize,
    /// Tasks in `running`
    pub running: usize,
    /// Tasks in `completed`
    pub completed: usize,
    /// Tasks in `stopped`
    pub stopped: usize,
    /// Tasks in `error`
    pub error: usize,
}
