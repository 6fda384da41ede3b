//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Start, poll and stop enrichment tasks
//! - [`diagnostics`] - Registry, quota and cache diagnostics
//! - [`system`] - Health and OpenAPI

use crate::cache::CacheStats;
use crate::error::{Error, Result};
use crate::rate_governor::GovernorStats;
use crate::types::{ChannelRecord, FilterMode, TaskId, TaskStats};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod diagnostics;
mod system;
mod tasks;

pub use diagnostics::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /start
///
/// `filterMode` and `targetCount` accept either JSON strings or numbers, and
/// the short names `q`, `type` and `count` are accepted as aliases.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskRequest {
    /// Search keywords
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    /// "1" keeps only channels with an email, "2" keeps every channel
    #[serde(default, alias = "type")]
    #[schema(value_type = Option<String>, example = "1")]
    pub filter_mode: Option<Value>,
    /// Number of channels to collect
    #[serde(default, alias = "count")]
    #[schema(value_type = Option<u64>, example = 50)]
    pub target_count: Option<Value>,
}

impl StartTaskRequest {
    /// Validate the loosely typed body into task parameters
    pub(crate) fn parse(self) -> Result<(String, FilterMode, usize)> {
        let query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::Validation("query is required".into()))?;

        let filter_mode = match self.filter_mode {
            Some(Value::String(s)) => s.parse::<FilterMode>(),
            Some(Value::Number(n)) => n.to_string().parse::<FilterMode>(),
            Some(other) => Err(format!("invalid filter mode {other}")),
            None => Err("filterMode is required".to_string()),
        }
        .map_err(Error::Validation)?;

        let target_count = match self.target_count {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::Validation("targetCount must be a positive integer".into()))?;

        Ok((query, filter_mode, target_count))
    }
}

/// Response for POST /start
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskResponse {
    /// Identifier to poll with
    pub task_id: TaskId,
    /// Always "started"
    pub status: String,
    /// Normalized search keywords
    pub query: String,
    /// Filter applied to discovered channels
    pub filter_mode: FilterMode,
    /// Number of channels to collect
    pub target_count: usize,
    /// Always 0
    pub progress: u8,
    /// Always 0
    pub current_count: usize,
    /// Always 0
    pub total_found: usize,
    /// Always empty
    pub results: Vec<ChannelRecord>,
}

/// Response for GET /stats
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Task counts by status
    pub tasks: TaskStats,
    /// Concurrent task ceiling
    pub max_active_tasks: usize,
    /// Upstream request usage
    pub rate_limit: GovernorStats,
    /// Channel cache diagnostics
    pub cache: CacheStats,
}

/// Response for GET /quota
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    /// Upstream request usage
    pub usage: GovernorStats,
    /// Set once daily usage crosses the warning ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response for POST /cache/cleanup
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CleanupResponse {
    /// Expired or dangling entries removed
    pub removed: usize,
}
