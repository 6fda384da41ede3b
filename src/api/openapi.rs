//! OpenAPI documentation and schema generation
//!
//! Describes the channel-scout REST API using utoipa for compile-time spec
//! generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the channel-scout REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "channel-scout REST API",
        version = "0.1.0",
        description = "Start keyword searches that collect channel details and contact emails in the background, then poll them for results",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5432", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::start_task,
        crate::api::routes::task_status,
        crate::api::routes::stop_task,

        // Diagnostics
        crate::api::routes::stats,
        crate::api::routes::quota,
        crate::api::routes::cache_health,
        crate::api::routes::cache_cleanup,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::FilterMode,
        crate::types::ChannelRecord,
        crate::types::TaskSnapshot,
        crate::types::TaskStats,
        crate::rate_governor::GovernorStats,
        crate::cache::HealthStatus,
        crate::cache::CacheHealth,
        crate::cache::CacheStats,

        crate::api::routes::StartTaskRequest,
        crate::api::routes::StartTaskResponse,
        crate::api::routes::StatsResponse,
        crate::api::routes::QuotaResponse,
        crate::api::routes::CleanupResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Enrichment tasks - Start a search, poll its progress, stop it"),
        (name = "diagnostics", description = "Diagnostics - Task counts, upstream quota usage, cache health and cleanup"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
