//! Diagnostics handlers: registry stats, quota usage, cache health and cleanup.

use super::{CleanupResponse, QuotaResponse, StatsResponse};
use crate::api::AppState;
use crate::cache::{CacheHealth, HealthStatus};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /stats - Task counts with governor and cache diagnostics
#[utoipa::path(
    get,
    path = "/api/user-details/stats",
    tag = "diagnostics",
    responses(
        (status = 200, description = "Registry, rate limit and cache statistics", body = StatsResponse)
    )
)]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let harvester = &state.harvester;

    Json(StatsResponse {
        tasks: harvester.stats().await,
        max_active_tasks: harvester.config().tasks.max_active_tasks,
        rate_limit: harvester.governor().stats().await,
        cache: harvester.cache().stats().await,
    })
}

/// GET /quota - Upstream request budget usage
#[utoipa::path(
    get,
    path = "/api/user-details/quota",
    tag = "diagnostics",
    responses(
        (status = 200, description = "Request usage per window, with a warning near the daily budget", body = QuotaResponse)
    )
)]
pub async fn quota(State(state): State<AppState>) -> Json<QuotaResponse> {
    let governor = state.harvester.governor();

    Json(QuotaResponse {
        usage: governor.stats().await,
        warning: governor.quota_warning().await,
    })
}

/// GET /cache/health - Check the cache backing store
#[utoipa::path(
    get,
    path = "/api/user-details/cache/health",
    tag = "diagnostics",
    responses(
        (status = 200, description = "Primary store reachable", body = CacheHealth),
        (status = 503, description = "Backing store unreachable; serving from process memory", body = CacheHealth)
    )
)]
pub async fn cache_health(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.harvester.cache().health_check().await;

    let status = match health.status {
        HealthStatus::Ok => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(health))
}

/// POST /cache/cleanup - Sweep expired cache entries
#[utoipa::path(
    post,
    path = "/api/user-details/cache/cleanup",
    tag = "diagnostics",
    responses(
        (status = 200, description = "Number of entries removed", body = CleanupResponse)
    )
)]
pub async fn cache_cleanup(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.harvester.cache().cleanup_expired().await;
    tracing::debug!(removed, "cache cleanup requested over HTTP");

    Json(CleanupResponse { removed })
}
