//! Poller snapshots and derived accessors

use serde::Serialize;

use crate::error::PollFetchError;
use crate::types::{Task, TaskId, TaskResult, TaskStatus};

/// Lifecycle phase of the poller for the tracked identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollPhase {
    /// No task id set
    Idle,
    /// No fetch has succeeded yet for the current id
    Connecting,
    /// At least one fetch succeeded; the task is not terminal
    Live,
    /// A terminal status was observed; polling stopped
    Terminal,
}

/// Point-in-time view of a poller
///
/// Every identifier change produces a fresh snapshot with a higher
/// `generation`; nothing carries over from the previous id.
#[derive(Clone, Debug, Serialize)]
pub struct PollState {
    /// Incremented on every identifier change
    pub generation: u64,
    /// The tracked task id
    pub task_id: Option<TaskId>,
    /// Last successfully fetched record
    pub task: Option<Task>,
    /// Lifecycle phase
    pub phase: PollPhase,
    /// Whether the most recent fetch succeeded
    pub connected: bool,
    /// Error of the most recent fetch, cleared by the next success
    pub fetch_error: Option<PollFetchError>,
    /// True only while the first fetch for the current id is in flight
    pub loading: bool,
    /// Failed fetches since the last success
    pub consecutive_failures: u32,
    /// The loop stopped after too many failed fetches in a row
    pub gave_up: bool,
}

impl PollState {
    pub(crate) fn idle(generation: u64) -> Self {
        Self {
            generation,
            task_id: None,
            task: None,
            phase: PollPhase::Idle,
            connected: false,
            fetch_error: None,
            loading: false,
            consecutive_failures: 0,
            gave_up: false,
        }
    }

    pub(crate) fn connecting(generation: u64, task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
            phase: PollPhase::Connecting,
            loading: true,
            ..Self::idle(generation)
        }
    }

    /// Status of the last fetched record
    pub fn status(&self) -> Option<TaskStatus> {
        self.task.as_ref().map(|t| t.status)
    }

    /// Progress percentage (0 when no record is loaded)
    pub fn progress(&self) -> u8 {
        self.task.as_ref().map_or(0, |t| t.progress)
    }

    /// Result payload, only once the task completed
    pub fn result(&self) -> Option<&TaskResult> {
        self.task
            .as_ref()
            .filter(|t| t.status == TaskStatus::Completed)
            .and_then(|t| t.result.as_ref())
    }

    /// Error to display
    ///
    /// A failed fetch takes precedence over the task's own `error_message`.
    pub fn error(&self) -> Option<&str> {
        self.fetch_error
            .as_ref()
            .map(|e| e.message.as_str())
            .or_else(|| self.task.as_ref().and_then(|t| t.error_message.as_deref()))
    }

    /// Whether the first fetch for the current id is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the most recent fetch succeeded
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether polling stopped on a terminal status
    pub fn is_terminal(&self) -> bool {
        self.phase == PollPhase::Terminal
    }

    /// Whether the poller is no longer fetching for its current id
    pub fn is_stopped(&self) -> bool {
        matches!(self.phase, PollPhase::Idle | PollPhase::Terminal) || self.gave_up
    }
}
