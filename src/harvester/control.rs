//! Task control: stop, cleanup, emergency reset and shutdown

use super::ChannelHarvester;
use crate::types::TaskId;
use std::sync::atomic::Ordering;

impl ChannelHarvester {
    /// Request a cooperative stop
    ///
    /// The task is marked `stopped` immediately and its pending waits are
    /// interrupted; an upstream call already in flight finishes first, but its
    /// results are not added. Returns `false` if the task is unknown or already
    /// terminal.
    pub async fn stop_task(&self, id: TaskId) -> bool {
        let Some(handle) = self.tasks.read().await.get(&id).cloned() else {
            return false;
        };

        let stopped = handle.state.write().await.stop();
        if stopped {
            handle.cancel.cancel();
            tracing::info!(task_id = %id, "task stopped");
        }
        stopped
    }

    /// Forget a terminal task
    ///
    /// Running tasks are left alone; returns whether anything was removed.
    pub async fn cleanup_task(&self, id: TaskId) -> bool {
        let mut tasks = self.tasks.write().await;

        let terminal = match tasks.get(&id) {
            Some(handle) => !handle.state.read().await.is_running(),
            None => return false,
        };
        if terminal {
            tasks.remove(&id);
            tracing::debug!(task_id = %id, "task cleaned up");
        }
        terminal
    }

    /// Stop every task and forget all of them
    ///
    /// Emergency reset for a wedged registry.
    pub async fn force_clear_all(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let cleared = tasks.len();

        for handle in tasks.values() {
            handle.state.write().await.stop();
            handle.cancel.cancel();
        }
        tasks.clear();

        tracing::warn!(cleared, "all tasks force-cleared");
        cleared
    }

    /// Stop accepting tasks, stop running ones and release the cache
    ///
    /// Stopped tasks stay queryable until the process exits.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down harvester");
        self.accepting_new.store(false, Ordering::SeqCst);

        let mut stopped = 0usize;
        for handle in self.tasks.read().await.values() {
            if handle.state.write().await.stop() {
                stopped += 1;
            }
            handle.cancel.cancel();
        }

        self.cache.close().await;
        tracing::info!(stopped, "harvester shutdown complete");
    }
}
