//! Per-task mutable state and its transition rules
//!
//! Every mutation goes through a method here, so the invariants hold after
//! each one:
//! - `results.len()` is the accepted count
//! - progress is `floor(accepted * 100 / target)` while running, 100 once completed
//! - status only moves forward out of `Running`; terminal states are frozen

use crate::types::{ChannelRecord, FilterMode, TaskId, TaskSnapshot, TaskStatus};
use chrono::{DateTime, Utc};

/// Outcome of offering a detailed channel to a task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Offer {
    /// Passed the filter and was appended
    Accepted,
    /// Failed the filter
    Rejected,
    /// Appended, and the target is now met (task completed)
    TargetReached,
    /// Task is no longer running; nothing changed
    NotRunning,
}

#[derive(Debug, Clone)]
pub(crate) struct TaskState {
    id: TaskId,
    query: String,
    filter_mode: FilterMode,
    target_count: usize,
    status: TaskStatus,
    progress: u8,
    results: Vec<ChannelRecord>,
    scanned_count: usize,
    error: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskState {
    pub(crate) fn new(id: TaskId, query: String, filter_mode: FilterMode, target_count: usize) -> Self {
        Self {
            id,
            query,
            filter_mode,
            target_count,
            status: TaskStatus::Running,
            progress: 0,
            results: Vec::new(),
            scanned_count: 0,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn status(&self) -> TaskStatus {
        self.status
    }

    pub(crate) fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    /// Run a detailed channel through the filter
    pub(crate) fn offer(&mut self, record: ChannelRecord) -> Offer {
        if !self.is_running() {
            return Offer::NotRunning;
        }

        self.scanned_count += 1;
        if !self.filter_mode.accepts(&record.emails) {
            return Offer::Rejected;
        }

        self.results.push(record);
        if self.results.len() >= self.target_count {
            self.finish(TaskStatus::Completed);
            return Offer::TargetReached;
        }

        let percent = self.results.len() * 100 / self.target_count;
        // integer floor never decreases as results only grow
        self.progress = percent.min(99) as u8;
        Offer::Accepted
    }

    /// Mark the task completed (search space exhausted or target met)
    pub(crate) fn complete(&mut self) -> bool {
        self.finish(TaskStatus::Completed)
    }

    /// External stop request
    pub(crate) fn stop(&mut self) -> bool {
        self.finish(TaskStatus::Stopped)
    }

    /// Engine-level fault; accumulated results are kept
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.error = Some(message.into());
        self.finish(TaskStatus::Error)
    }

    fn finish(&mut self, status: TaskStatus) -> bool {
        if !self.is_running() || status == TaskStatus::Running {
            return false;
        }
        self.status = status;
        if status == TaskStatus::Completed {
            self.progress = 100;
        }
        self.finished_at = Some(Utc::now());
        true
    }

    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.id,
            query: self.query.clone(),
            filter_mode: self.filter_mode,
            target_count: self.target_count,
            status: self.status,
            progress: self.progress,
            current_count: self.results.len(),
            total_found: self.results.len(),
            scanned_count: self.scanned_count,
            results: self.results.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}
