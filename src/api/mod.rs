//! REST API server module
//!
//! Thin HTTP surface over [`ChannelHarvester`]: start enrichment tasks, poll
//! and stop them, and read rate limit and cache diagnostics.

use crate::{ChannelHarvester, Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks (`/api/user-details`)
/// - `POST /start` - Create an enrichment task
/// - `GET /status/:task_id` - Poll a task snapshot
/// - `DELETE /stop/:task_id` - Stop a running task
///
/// ## Diagnostics (`/api/user-details`)
/// - `GET /stats` - Task counts, rate limit usage, cache statistics
/// - `GET /quota` - Upstream request budget usage
/// - `GET /cache/health` - Cache backing store health (200 ok / 503 degraded)
/// - `POST /cache/cleanup` - Sweep expired cache entries
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(harvester: Arc<ChannelHarvester>, config: Arc<Config>) -> Router {
    let state = AppState::new(harvester, config.clone());

    let tasks = Router::new()
        .route("/start", post(routes::start_task))
        .route("/status/:task_id", get(routes::task_status))
        .route("/stop/:task_id", delete(routes::stop_task))
        .route("/stats", get(routes::stats))
        .route("/quota", get(routes::quota))
        .route("/cache/health", get(routes::cache_health))
        .route("/cache/cleanup", post(routes::cache_cleanup));

    let router = Router::new()
        .nest("/api/user-details", tasks)
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the document so the routes do not overlap
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address
///
/// Serves until `shutdown` resolves, then lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use channel_scout::{ChannelHarvester, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::from_env()?);
/// let harvester = Arc::new(ChannelHarvester::new((*config).clone())?);
///
/// channel_scout::api::start_api_server(harvester, config, async {
///     tokio::signal::ctrl_c().await.ok();
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    harvester: Arc<ChannelHarvester>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;
    tracing::info!(address = %bind_address, "starting API server");

    let app = create_router(harvester, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
