//! Task registry and enrichment engine
//!
//! The `ChannelHarvester` struct and its methods are organized by domain:
//! - [`state`] - Per-task state and transition rules
//! - [`engine`] - The enrichment loop run for every task
//! - [`control`] - Stop, cleanup, emergency reset and shutdown
//!
//! Tasks live in memory only. Each one runs as its own tokio task and shares
//! the harvester's [`RateGovernor`] and [`ChannelCache`] with every other task.

mod control;
mod engine;
mod state;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::cache::ChannelCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::rate_governor::RateGovernor;
use crate::types::{FilterMode, TaskId, TaskSnapshot, TaskStats, TaskStatus};
use crate::youtube::{SearchClient, YoutubeClient};
use engine::TaskRunner;
use state::TaskState;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// A tracked task: shared state plus the token that interrupts its waits
#[derive(Clone)]
pub(crate) struct TaskHandle {
    pub(crate) state: Arc<RwLock<TaskState>>,
    pub(crate) cancel: CancellationToken,
}

/// Task registry (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ChannelHarvester {
    /// Configuration shared with every task
    pub(crate) config: Arc<Config>,
    /// Upstream content API
    pub(crate) client: Arc<dyn SearchClient>,
    /// Channel cache shared across tasks
    pub(crate) cache: ChannelCache,
    /// Process-wide request governor
    pub(crate) governor: RateGovernor,
    /// Tracked tasks by id
    pub(crate) tasks: Arc<RwLock<HashMap<TaskId, TaskHandle>>>,
    /// Cleared during shutdown to reject new tasks
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl std::fmt::Debug for ChannelHarvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHarvester")
            .field("cache", &self.cache)
            .field("governor", &self.governor)
            .finish_non_exhaustive()
    }
}

impl ChannelHarvester {
    /// Build a harvester talking to the YouTube Data API
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid configuration and
    /// [`Error::Network`] if the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use channel_scout::{ChannelHarvester, Config, FilterMode};
    ///
    /// # async fn example() -> channel_scout::Result<()> {
    /// let harvester = ChannelHarvester::new(Config::from_env()?)?;
    /// let task_id = harvester.create_task("cooking", FilterMode::EmailsOnly, 50).await?;
    ///
    /// if let Some(snapshot) = harvester.get_task(task_id).await {
    ///     println!("{}% done", snapshot.progress);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        if config.youtube.api_key.is_empty() {
            tracing::warn!("YOUTUBE_API_KEY is not set, upstream requests will be rejected");
        }

        let client = Arc::new(YoutubeClient::new(&config.youtube)?);
        let cache = ChannelCache::new(&config.cache);
        Ok(Self::with_parts(config, client, cache))
    }

    /// Build a harvester from explicit collaborators
    pub fn with_parts(config: Config, client: Arc<dyn SearchClient>, cache: ChannelCache) -> Self {
        let governor = RateGovernor::new(config.rate_limit.clone());

        Self {
            config: Arc::new(config),
            client,
            cache,
            governor,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a task and start enriching in the background
    ///
    /// Returns as soon as the task is registered.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty query or a target outside
    ///   `1..=tasks.max_target_count`
    /// - [`Error::TooManyTasks`] when `tasks.max_active_tasks` are running
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    pub async fn create_task(
        &self,
        query: &str,
        filter_mode: FilterMode,
        target_count: usize,
    ) -> Result<TaskId> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }
        let max_target = self.config.tasks.max_target_count;
        if target_count == 0 || target_count > max_target {
            return Err(Error::Validation(format!(
                "target count must be between 1 and {max_target}"
            )));
        }
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = TaskId::new();
        let handle = TaskHandle {
            state: Arc::new(RwLock::new(TaskState::new(
                id,
                query.to_string(),
                filter_mode,
                target_count,
            ))),
            cancel: CancellationToken::new(),
        };

        {
            // count and insert under one lock so concurrent creates cannot overshoot
            let mut tasks = self.tasks.write().await;
            let active = count_running(&tasks).await;
            let limit = self.config.tasks.max_active_tasks;
            if active >= limit {
                return Err(Error::TooManyTasks { active, limit });
            }
            tasks.insert(id, handle.clone());
        }

        tracing::info!(
            task_id = %id,
            query,
            filter_mode = ?filter_mode,
            target_count,
            "task created"
        );

        self.spawn_runner(id, query.to_string(), handle);
        Ok(id)
    }

    fn spawn_runner(&self, id: TaskId, query: String, handle: TaskHandle) {
        let runner = TaskRunner {
            id,
            query,
            state: handle.state.clone(),
            cancel: handle.cancel.clone(),
            client: self.client.clone(),
            cache: self.cache.clone(),
            governor: self.governor.clone(),
            config: self.config.clone(),
        };

        let state = handle.state;
        tokio::spawn(async move {
            // a panic inside the loop still leaves the task in a terminal state
            if let Err(e) = tokio::spawn(runner.run()).await {
                tracing::error!(task_id = %id, error = %e, "enrichment task aborted");
                state.write().await.fail(format!("task aborted: {e}"));
            }
        });
    }

    /// Current snapshot of a task, if tracked
    pub async fn get_task(&self, id: TaskId) -> Option<TaskSnapshot> {
        let handle = self.tasks.read().await.get(&id).cloned()?;
        let snapshot = handle.state.read().await.snapshot();
        Some(snapshot)
    }

    /// Number of tasks still running
    pub async fn active_count(&self) -> usize {
        count_running(&*self.tasks.read().await).await
    }

    /// Task counts by status
    pub async fn stats(&self) -> TaskStats {
        let tasks = self.tasks.read().await;
        let mut stats = TaskStats {
            total: tasks.len(),
            ..TaskStats::default()
        };

        for handle in tasks.values() {
            match handle.state.read().await.status() {
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Stopped => stats.stopped += 1,
                TaskStatus::Error => stats.error += 1,
            }
        }

        stats
    }

    /// Shared request governor
    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Shared channel cache
    pub fn cache(&self) -> &ChannelCache {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

async fn count_running(tasks: &HashMap<TaskId, TaskHandle>) -> usize {
    let mut running = 0;
    for handle in tasks.values() {
        if handle.state.read().await.is_running() {
            running += 1;
        }
    }
    running
}
