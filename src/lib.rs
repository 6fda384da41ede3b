//! # channel-scout
//!
//! Keyword search over YouTube with background enrichment of the channels it
//! turns up: channel details, statistics and contact emails pulled from their
//! descriptions.
//!
//! ## Design Philosophy
//!
//! channel-scout is designed to be:
//! - **Fire and forget** - Starting a task returns immediately; callers poll for progress
//! - **Quota aware** - One process-wide governor paces every upstream request
//! - **Degrading, not failing** - Cache outages fall back to process memory
//! - **Library-first** - The HTTP server is a thin layer over [`ChannelHarvester`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use channel_scout::{ChannelHarvester, Config, FilterMode, TaskStatus};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let harvester = ChannelHarvester::new(Config::from_env()?)?;
//!
//!     let task_id = harvester
//!         .create_task("sourdough baking", FilterMode::EmailsOnly, 25)
//!         .await?;
//!
//!     while let Some(snapshot) = harvester.get_task(task_id).await {
//!         if snapshot.status != TaskStatus::Running {
//!             for channel in &snapshot.results {
//!                 println!("{}: {:?}", channel.title, channel.emails);
//!             }
//!             break;
//!         }
//!         tokio::time::sleep(Duration::from_secs(2)).await;
//!     }
//!
//!     harvester.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Channel cache with Redis and in-process stores
pub mod cache;
/// Configuration types
pub mod config;
/// Contact email extraction
pub mod email;
/// Error types
pub mod error;
/// Task registry and enrichment engine
pub mod harvester;
/// Upstream request pacing
pub mod rate_governor;
/// Retry classification and backoff
pub mod retry;
/// Core types
pub mod types;
/// YouTube Data API client
pub mod youtube;

// Re-export commonly used types
pub use cache::{CacheHealth, CacheStats, ChannelCache, HealthStatus};
pub use config::Config;
pub use email::extract_emails;
pub use error::{ApiError, CacheError, Error, ErrorDetail, Result, ToHttpStatus, UpstreamError};
pub use harvester::ChannelHarvester;
pub use rate_governor::{GovernorStats, RateGovernor};
pub use types::{ChannelRecord, FilterMode, TaskId, TaskSnapshot, TaskStats, TaskStatus};
pub use youtube::{SearchClient, YoutubeClient};

/// Helper function to run the harvester with graceful signal handling.
///
/// Waits for a termination signal and then calls the harvester's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use channel_scout::{ChannelHarvester, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let harvester = ChannelHarvester::new(Config::from_env()?)?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&harvester).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(harvester: &ChannelHarvester) {
    wait_for_signal().await;
    harvester.shutdown().await;
}

/// Resolve once SIGTERM or SIGINT (Ctrl+C elsewhere) arrives
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("received SIGINT (Ctrl+C)");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve once SIGTERM or SIGINT (Ctrl+C elsewhere) arrives
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("received Ctrl+C");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    }
}
