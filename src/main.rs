//! channel-scout server binary
//!
//! Reads configuration from the environment (and `.env` when present), serves
//! the REST API and stops every running task on SIGTERM/SIGINT.

use channel_scout::{ChannelHarvester, Config, api, wait_for_signal};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,channel_scout=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bind_address = %config.server.api.bind_address,
        redis = config.cache.redis_url.is_some(),
        max_active_tasks = config.tasks.max_active_tasks,
        "configuration loaded"
    );

    let harvester = Arc::new(ChannelHarvester::new(config.clone())?);

    let health = harvester.cache().health_check().await;
    tracing::info!(status = ?health.status, backend = %health.backend, "{}", health.message);

    api::start_api_server(harvester.clone(), Arc::new(config), wait_for_signal()).await?;

    harvester.shutdown().await;
    Ok(())
}
