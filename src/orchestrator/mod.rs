//! Per-tab feature state machine
//!
//! A [`FeatureOrchestrator`] owns the task id of one feature tab and wires
//! submission, polling and result display together:
//!
//! ```text
//!   form --submit--> polling --completed--> result --reset--> form
//!                       |                      |
//!                       +--failed--> error     +--change format--> polling
//!                                      |
//!                                      +--retry--> form
//! ```
//!
//! The phase is derived from the poller snapshot, so it can never disagree
//! with the tracked task. Transitions are reported as [`Event`]s on a broadcast
//! channel and the "has active result" flag is published on a watch channel
//! for the tab-switch guard ([`FeatureTabs`]).

mod images;
mod tabs;


pub use images::ImageSession;
pub use tabs::{FeatureTabs, SwitchOutcome};

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::catalog::FormatPreset;
use crate::client::{TaskSource, TaskSubmitter, VtoolClient};
use crate::config::PollingConfig;
use crate::error::{Error, Result, ValidationError};
use crate::poller::{PollState, TaskPoller};
use crate::types::{Event, Phase, ProcessOptions, SourceUrl, TaskId, TaskResult, TaskStatus, TaskType};

/// Capacity of the event channel; slow subscribers miss the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shown when a task failed without an error message
const TASK_FAILED_FALLBACK: &str = "Task failed";

/// What a feature tab should display
#[derive(Clone, Debug)]
pub enum OrchestratorView {
    /// Input form, with the last submission error inline
    Form {
        /// Inline error from the last rejected submission
        error: Option<String>,
    },
    /// Progress of the tracked task
    Polling {
        /// Current poller snapshot
        state: PollState,
    },
    /// The task failed
    Error {
        /// Message to display next to the retry action
        message: String,
    },
    /// The task completed
    Result {
        /// The completed task
        task_id: TaskId,
        /// Result payload (absent if the backend sent none)
        result: Option<TaskResult>,
        /// Inline error from a rejected format change
        format_error: Option<String>,
    },
}

impl OrchestratorView {
    /// Phase this view belongs to
    pub fn phase(&self) -> Phase {
        match self {
            OrchestratorView::Form { .. } => Phase::Form,
            OrchestratorView::Polling { .. } => Phase::Polling,
            OrchestratorView::Error { .. } => Phase::Error,
            OrchestratorView::Result { .. } => Phase::Result,
        }
    }
}

#[derive(Debug, Default)]
struct FormState {
    /// Source URL of the tracked task, kept for reprocessing
    last_url: Option<SourceUrl>,
    form_error: Option<String>,
    format_error: Option<String>,
}

/// State machine for one feature tab
///
/// Must be created inside a Tokio runtime: construction spawns the task that
/// translates poller snapshots into phase events. Dropping the orchestrator
/// stops polling and publishes "no active result".
pub struct FeatureOrchestrator {
    feature: TaskType,
    submitter: Arc<dyn TaskSubmitter>,
    poller: TaskPoller,
    form: Mutex<FormState>,
    /// Serializes transitions that await the network
    transition: tokio::sync::Mutex<()>,
    event_tx: broadcast::Sender<Event>,
    active_tx: Arc<watch::Sender<bool>>,
    watcher: CancellationToken,
}

impl FeatureOrchestrator {
    /// Create an orchestrator in the `form` phase
    pub fn new(
        feature: TaskType,
        submitter: Arc<dyn TaskSubmitter>,
        source: Arc<dyn TaskSource>,
        polling: PollingConfig,
    ) -> Self {
        let poller = TaskPoller::new(source, polling);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (active_tx, _) = watch::channel(false);
        let active_tx = Arc::new(active_tx);
        let watcher = CancellationToken::new();

        tokio::spawn(watch_phases(
            feature,
            poller.subscribe(),
            event_tx.clone(),
            active_tx.clone(),
            watcher.clone(),
        ));

        Self {
            feature,
            submitter,
            poller,
            form: Mutex::new(FormState::default()),
            transition: tokio::sync::Mutex::new(()),
            event_tx,
            active_tx,
            watcher,
        }
    }

    /// Create an orchestrator backed by the HTTP client
    pub fn with_client(feature: TaskType, client: &VtoolClient, polling: PollingConfig) -> Self {
        let client = Arc::new(client.clone());
        Self::new(feature, client.clone(), client, polling)
    }

    /// The feature tab this orchestrator drives
    pub fn feature(&self) -> TaskType {
        self.feature
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        phase_of(&self.poller.snapshot())
    }

    /// The tracked task id
    pub fn task_id(&self) -> Option<TaskId> {
        self.poller.task_id()
    }

    /// Source URL kept for reprocessing
    pub fn last_url(&self) -> Option<SourceUrl> {
        self.form().last_url.clone()
    }

    /// The underlying poller
    pub fn poller(&self) -> &TaskPoller {
        &self.poller
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Receiver of the "has active result" flag
    pub fn active_result(&self) -> watch::Receiver<bool> {
        self.active_tx.subscribe()
    }

    /// Whether a completed result is currently shown
    pub fn has_active_result(&self) -> bool {
        *self.active_tx.borrow()
    }

    /// What the tab should display right now
    pub fn view(&self) -> OrchestratorView {
        let state = self.poller.snapshot();
        let form = self.form();
        match phase_of(&state) {
            Phase::Form => OrchestratorView::Form {
                error: form.form_error.clone(),
            },
            Phase::Polling => OrchestratorView::Polling { state },
            Phase::Error => OrchestratorView::Error {
                message: state.error().unwrap_or(TASK_FAILED_FALLBACK).to_string(),
            },
            Phase::Result => OrchestratorView::Result {
                task_id: state.task_id.clone().unwrap_or_else(|| TaskId::new("")),
                result: state.result().cloned(),
                format_error: form.format_error.clone(),
            },
        }
    }

    /// Submit a new task from the form
    ///
    /// Validation and submission failures are recorded as the inline form
    /// error, reported as [`Event::SubmissionFailed`] and returned; the phase
    /// stays `form`.
    pub async fn submit(&self, url: &str, options: Option<ProcessOptions>) -> Result<TaskId> {
        let _transition = self.transition.lock().await;
        self.expect_phase("submit", &[Phase::Form])?;

        let outcome = self.create(url, options.as_ref()).await;
        let (task_id, source_url) = match outcome {
            Ok(created) => created,
            Err(e) => {
                let message = e.user_message();
                self.form().form_error = Some(message.clone());
                self.emit_submission_failed(message);
                return Err(e);
            }
        };

        {
            let mut form = self.form();
            form.last_url = Some(source_url.clone());
            form.form_error = None;
            form.format_error = None;
        }
        self.poller.set_task(Some(task_id.clone())).await;
        self.event_tx
            .send(Event::Submitted {
                feature: self.feature,
                task_id: task_id.clone(),
                url: source_url,
            })
            .ok();

        Ok(task_id)
    }

    /// Return to the form after a failed task
    ///
    /// Clears the task id only; nothing is resubmitted.
    pub async fn retry(&self) -> Result<()> {
        let _transition = self.transition.lock().await;
        self.expect_phase("retry", &[Phase::Error])?;

        self.poller.clear().await;
        tracing::debug!(feature = %self.feature, "returned to form after failure");
        Ok(())
    }

    /// Drop the tracked task and the stored URL and return to the form
    ///
    /// Also serves as "cancel" while polling.
    pub async fn reset(&self) -> Result<()> {
        let _transition = self.transition.lock().await;
        self.expect_phase("reset", &[Phase::Polling, Phase::Error, Phase::Result])?;

        self.poller.clear().await;
        *self.form() = FormState::default();
        self.event_tx
            .send(Event::Reset {
                feature: self.feature,
            })
            .ok();
        tracing::debug!(feature = %self.feature, "orchestrator reset");
        Ok(())
    }

    /// Resubmit the completed task's source URL with another preset
    pub async fn change_format(&self, preset: &FormatPreset) -> Result<TaskId> {
        self.change_format_with(preset.to_options()).await
    }

    /// Resubmit the completed task's source URL with explicit options
    ///
    /// On success the new task id replaces the old one and the phase returns
    /// to `polling`. On failure the phase stays `result` and the message is
    /// kept as the inline format error.
    pub async fn change_format_with(&self, options: ProcessOptions) -> Result<TaskId> {
        let _transition = self.transition.lock().await;
        self.expect_phase("change format", &[Phase::Result])?;

        if !self.feature.supports_format_change() {
            return Err(ValidationError::FormatChangeUnsupported(self.feature).into());
        }
        let url = self
            .form()
            .last_url
            .clone()
            .ok_or(ValidationError::MissingSourceUrl)?;

        let created = match self.submitter.submit(self.feature, &url, Some(&options)).await {
            Ok(created) => created,
            Err(e) => {
                let message = e.user_message();
                tracing::warn!(feature = %self.feature, url = %url, error = %message, "format change rejected");
                self.form().format_error = Some(message.clone());
                self.emit_submission_failed(message);
                return Err(e);
            }
        };

        let previous = self.poller.task_id();
        self.form().format_error = None;
        self.poller.set_task(Some(created.task_id.clone())).await;
        tracing::info!(
            feature = %self.feature,
            previous = ?previous.as_ref().map(TaskId::as_str),
            task_id = %created.task_id,
            "resubmitted with new format"
        );
        self.event_tx
            .send(Event::Submitted {
                feature: self.feature,
                task_id: created.task_id.clone(),
                url,
            })
            .ok();

        Ok(created.task_id)
    }

    async fn create(
        &self,
        url: &str,
        options: Option<&ProcessOptions>,
    ) -> Result<(TaskId, SourceUrl)> {
        if self.feature.requires_image_upload() {
            return Err(ValidationError::ImageUploadRequired(self.feature).into());
        }
        let url = SourceUrl::parse(url)?;
        let created = self.submitter.submit(self.feature, &url, options).await?;
        Ok((created.task_id, url))
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<()> {
        let phase = self.phase();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                operation,
                current_state: phase.to_string(),
            })
        }
    }

    fn emit_submission_failed(&self, error: String) {
        self.event_tx
            .send(Event::SubmissionFailed {
                feature: self.feature,
                error,
            })
            .ok();
    }

    fn form(&self) -> MutexGuard<'_, FormState> {
        // FormState has no invariants a panicking writer could break
        self.form.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for FeatureOrchestrator {
    fn drop(&mut self) {
        self.watcher.cancel();
        self.active_tx.send_replace(false);
    }
}

/// Phase implied by a poller snapshot
fn phase_of(state: &PollState) -> Phase {
    if state.task_id.is_none() {
        return Phase::Form;
    }
    if !state.is_terminal() {
        return Phase::Polling;
    }
    match state.status() {
        Some(TaskStatus::Failed) => Phase::Error,
        Some(TaskStatus::Completed) => Phase::Result,
        _ => Phase::Polling,
    }
}

/// Translate poller snapshots into phase events until cancelled
async fn watch_phases(
    feature: TaskType,
    mut rx: watch::Receiver<PollState>,
    event_tx: broadcast::Sender<Event>,
    active_tx: Arc<watch::Sender<bool>>,
    token: CancellationToken,
) {
    let mut last = Phase::Form;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let phase = phase_of(&rx.borrow_and_update());
        if phase == last {
            continue;
        }

        tracing::debug!(feature = %feature, from = %last, to = %phase, "phase changed");
        event_tx
            .send(Event::PhaseChanged {
                feature,
                from: last,
                to: phase,
            })
            .ok();

        let active = phase == Phase::Result;
        if active != (last == Phase::Result) {
            active_tx.send_replace(active);
            event_tx
                .send(Event::ActiveResultChanged { feature, active })
                .ok();
        }
        last = phase;
    }
}
