//! Task status polling
//!
//! A [`TaskPoller`] tracks at most one task id at a time. Setting an id spawns
//! a polling loop owned by a [`CancellationToken`]; changing or clearing the id
//! cancels that loop and waits for it to finish before anything else happens,
//! so two loops never overlap and a superseded loop can never write state.
//!
//! Fetches are strictly sequential: the next fetch is scheduled `interval`
//! after the previous one settles. A failed fetch marks the poller
//! disconnected but does not stop it. Polling ends on the first terminal status
//! (`completed`/`failed`), when the id is cleared, or, if configured, after too
//! many consecutive failures.
//!
//! Snapshots are published on a [`tokio::sync::watch`] channel.

mod state;


pub use state::{PollPhase, PollState};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::client::TaskSource;
use crate::config::PollingConfig;
use crate::error::{Error, PollFetchError, Result};
use crate::types::{Task, TaskId, TaskStatus};

/// Polls one task id at a time (cloneable - state is Arc-wrapped)
#[derive(Clone)]
pub struct TaskPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    source: Arc<dyn TaskSource>,
    config: PollingConfig,
    state: Arc<watch::Sender<PollState>>,
    generation: AtomicU64,
    active: Mutex<Option<PollHandle>>,
}

/// The running loop for one identifier
struct PollHandle {
    task_id: TaskId,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.active.get_mut().take() {
            handle.token.cancel();
        }
    }
}

impl TaskPoller {
    /// Create an idle poller reading from `source`
    pub fn new(source: Arc<dyn TaskSource>, config: PollingConfig) -> Self {
        let (state, _) = watch::channel(PollState::idle(0));
        Self {
            inner: Arc::new(PollerInner {
                source,
                config,
                state: Arc::new(state),
                generation: AtomicU64::new(0),
                active: Mutex::new(None),
            }),
        }
    }

    /// Track a new task id, or stop tracking with `None`
    ///
    /// The previous loop (if any) is cancelled and awaited first. Exposed
    /// state is reset before the new loop starts. Setting the id that is
    /// already tracked is a no-op, including after a terminal status, unless
    /// the loop gave up after repeated fetch failures: then polling restarts
    /// for that id with a fresh failure count.
    pub async fn set_task(&self, task_id: Option<TaskId>) {
        let mut active = self.inner.active.lock().await;

        if let (Some(current), Some(next)) = (active.as_ref(), task_id.as_ref())
            && current.task_id == *next
            && !self.inner.state.borrow().gave_up
        {
            tracing::debug!(task_id = %next, "task already tracked");
            return;
        }

        if let Some(previous) = active.take() {
            previous.token.cancel();
            if let Err(e) = previous.join.await
                && e.is_panic()
            {
                tracing::warn!(task_id = %previous.task_id, "polling loop panicked");
            }
            tracing::debug!(task_id = %previous.task_id, "stopped polling");
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(task_id) = task_id else {
            self.inner.state.send_replace(PollState::idle(generation));
            return;
        };

        self.inner
            .state
            .send_replace(PollState::connecting(generation, task_id.clone()));

        let token = CancellationToken::new();
        let join = tokio::spawn(poll_loop(PollLoop {
            source: self.inner.source.clone(),
            state: self.inner.state.clone(),
            config: self.inner.config.clone(),
            task_id: task_id.clone(),
            generation,
            token: token.clone(),
        }));

        tracing::debug!(task_id = %task_id, generation, "started polling");
        *active = Some(PollHandle {
            task_id,
            token,
            join,
        });
    }

    /// Stop tracking and clear all exposed state
    pub async fn clear(&self) {
        self.set_task(None).await;
    }

    /// The currently tracked id
    pub fn task_id(&self) -> Option<TaskId> {
        self.inner.state.borrow().task_id.clone()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> PollState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }

    /// Snapshots as a stream, starting with the current one
    pub fn updates(&self) -> WatchStream<PollState> {
        WatchStream::new(self.subscribe())
    }

    /// Wait until the tracked task reaches a terminal status
    ///
    /// Returns the completed record, [`Error::TaskFailed`] for a failed task,
    /// or the last fetch error when the poller gave up. Fails with
    /// [`Error::InvalidTransition`] when nothing is tracked or the id is
    /// replaced while waiting.
    pub async fn wait_for_terminal(&self) -> Result<Task> {
        let mut rx = self.subscribe();
        let generation = {
            let current = rx.borrow_and_update();
            if current.task_id.is_none() {
                return Err(Error::InvalidTransition {
                    operation: "wait for a terminal status",
                    current_state: "idle".to_string(),
                });
            }
            current.generation
        };

        let state = rx
            .wait_for(|s| s.generation != generation || s.is_terminal() || s.gave_up)
            .await
            .map_err(|_| Error::InvalidTransition {
                operation: "wait for a terminal status",
                current_state: "closed".to_string(),
            })?
            .clone();

        if state.generation != generation {
            return Err(Error::InvalidTransition {
                operation: "wait for a terminal status",
                current_state: "superseded".to_string(),
            });
        }

        if state.gave_up {
            let error = state.fetch_error.unwrap_or_else(|| PollFetchError {
                task_id: state.task_id.clone().unwrap_or_else(|| TaskId::new("")),
                message: crate::error::FETCH_TASK_FALLBACK.to_string(),
                status: None,
                timed_out: false,
            });
            return Err(error.into());
        }

        match state.task {
            Some(task) if task.status == TaskStatus::Failed => Err(Error::TaskFailed {
                id: task.id,
                message: task
                    .error_message
                    .unwrap_or_else(|| "Task failed".to_string()),
            }),
            Some(task) => Ok(task),
            None => Err(Error::InvalidTransition {
                operation: "wait for a terminal status",
                current_state: "idle".to_string(),
            }),
        }
    }
}

struct PollLoop {
    source: Arc<dyn TaskSource>,
    state: Arc<watch::Sender<PollState>>,
    config: PollingConfig,
    task_id: TaskId,
    generation: u64,
    token: CancellationToken,
}

impl PollLoop {
    /// Apply `f` to the snapshot if it still belongs to this loop
    fn update(&self, f: impl FnOnce(&mut PollState)) {
        let generation = self.generation;
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            f(s);
            true
        });
    }

    async fn fetch(&self) -> std::result::Result<Task, PollFetchError> {
        let fetch = self.source.fetch_task(&self.task_id);
        let outcome = match self.config.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(PollFetchError {
                        task_id: self.task_id.clone(),
                        message: format!("status request timed out after {}ms", limit.as_millis()),
                        status: None,
                        timed_out: true,
                    });
                }
            },
            None => fetch.await,
        };

        outcome.map_err(|e| match e {
            Error::PollFetch(e) => e,
            other => PollFetchError {
                task_id: self.task_id.clone(),
                message: other.user_message(),
                status: None,
                timed_out: false,
            },
        })
    }

    /// Sleep for the poll interval; false when cancelled
    async fn pause(&self, interval: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }
}

async fn poll_loop(ctx: PollLoop) {
    let task_id = ctx.task_id.clone();
    let mut failures: u32 = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = ctx.token.cancelled() => {
                tracing::debug!(task_id = %task_id, "polling cancelled during fetch");
                return;
            }
            outcome = ctx.fetch() => outcome,
        };

        match outcome {
            Ok(task) => {
                failures = 0;
                let status = task.status;
                let progress = task.progress;
                let terminal = status.is_terminal();

                tracing::debug!(task_id = %task_id, status = %status, progress, "task status");

                ctx.update(|s| {
                    s.task = Some(task);
                    s.phase = if terminal {
                        PollPhase::Terminal
                    } else {
                        PollPhase::Live
                    };
                    s.connected = true;
                    s.fetch_error = None;
                    s.loading = false;
                    s.consecutive_failures = 0;
                });

                if terminal {
                    tracing::info!(task_id = %task_id, status = %status, "task reached terminal status");
                    return;
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                tracing::warn!(
                    task_id = %task_id,
                    error = %e,
                    timed_out = e.timed_out,
                    consecutive_failures = failures,
                    "status fetch failed"
                );

                let gave_up = ctx
                    .config
                    .max_consecutive_failures
                    .is_some_and(|max| failures >= max);

                ctx.update(|s| {
                    s.connected = false;
                    s.fetch_error = Some(e);
                    s.loading = false;
                    s.consecutive_failures = failures;
                    s.gave_up = gave_up;
                });

                if gave_up {
                    tracing::error!(
                        task_id = %task_id,
                        consecutive_failures = failures,
                        "giving up on task after repeated fetch failures"
                    );
                    return;
                }
            }
        }

        if !ctx.pause(ctx.config.interval).await {
            tracing::debug!(task_id = %task_id, "polling cancelled while waiting");
            return;
        }
    }
}
