//! Scripted backend double shared by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::client::{TaskSource, TaskSubmitter};
use crate::error::{PollFetchError, Result, SubmissionError};
use crate::types::{
    CreateTaskResponse, DownloadResult, ProcessOptions, SourceUrl, Task, TaskId, TaskResult,
    TaskStatus, TaskType,
};

/// Build a task record
pub(crate) fn task(id: &str, task_type: TaskType, status: TaskStatus, progress: u8) -> Task {
    let now = Utc::now();
    Task {
        id: TaskId::from(id),
        task_type,
        status,
        progress,
        input_url: "https://tiktok.com/@a/video/123".to_string(),
        result: None,
        error_message: None,
        user_id: None,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

pub(crate) fn download_result() -> TaskResult {
    TaskResult::Download(DownloadResult {
        download_url: "http://localhost:8000/api/files/abc.mp4".to_string(),
        filename: "v.mp4".to_string(),
        file_size: 1_048_576,
        duration: Some(12.0),
        thumbnail_url: None,
    })
}

/// One scripted answer to a status fetch
#[derive(Clone, Debug)]
pub(crate) enum Step {
    Status(TaskStatus, u8),
    Completed(TaskResult),
    Failed(&'static str),
    FetchError(&'static str),
    /// Never answers
    Hang,
}

/// A recorded creation request
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Submission {
    pub task_type: TaskType,
    pub url: String,
    pub options: Option<ProcessOptions>,
}

/// In-memory [`TaskSource`] and [`TaskSubmitter`]
///
/// Each id replays its script in order and repeats the last step once the
/// script is exhausted. Unknown ids answer with a 404 fetch error.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    task_type: Option<TaskType>,
    scripts: Mutex<HashMap<TaskId, VecDeque<Step>>>,
    fetches: Mutex<HashMap<TaskId, usize>>,
    submissions: Mutex<Vec<Submission>>,
    submit_results: Mutex<VecDeque<std::result::Result<&'static str, SubmissionError>>>,
    fetch_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new(task_type: TaskType) -> Self {
        Self {
            task_type: Some(task_type),
            ..Default::default()
        }
    }

    pub(crate) fn script(self, id: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(TaskId::from(id), steps.into());
        self
    }

    pub(crate) fn fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Queue the outcome of the next `submit` call (ids default to "task-N")
    pub(crate) fn next_submission(self, outcome: std::result::Result<&'static str, SubmissionError>) -> Self {
        self.submit_results.lock().unwrap().push_back(outcome);
        self
    }

    pub(crate) fn fetch_count(&self, id: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(&TaskId::from(id))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    fn next_step(&self, id: &TaskId) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let steps = scripts.get_mut(id)?;
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskSource for ScriptedBackend {
    async fn fetch_task(&self, id: &TaskId) -> Result<Task> {
        *self.fetches.lock().unwrap().entry(id.clone()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let fetch_error = |message: &str, status: Option<u16>| PollFetchError {
            task_id: id.clone(),
            message: message.to_string(),
            status,
            timed_out: false,
        };

        let task_type = self.task_type.unwrap_or(TaskType::Download);
        match self.next_step(id) {
            None => Err(fetch_error("Task not found", Some(404)).into()),
            Some(Step::Status(status, progress)) => Ok(task(id.as_str(), task_type, status, progress)),
            Some(Step::Completed(result)) => {
                let mut record = task(id.as_str(), task_type, TaskStatus::Completed, 100);
                record.result = Some(result);
                Ok(record)
            }
            Some(Step::Failed(message)) => {
                let mut record = task(id.as_str(), task_type, TaskStatus::Failed, 100);
                record.error_message = Some(message.to_string());
                Ok(record)
            }
            Some(Step::FetchError(message)) => Err(fetch_error(message, None).into()),
            Some(Step::Hang) => std::future::pending().await,
        }
    }
}

#[async_trait]
impl TaskSubmitter for ScriptedBackend {
    async fn submit(
        &self,
        task_type: TaskType,
        url: &SourceUrl,
        options: Option<&ProcessOptions>,
    ) -> Result<CreateTaskResponse> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(Submission {
            task_type,
            url: url.as_str().to_string(),
            options: options.cloned(),
        });
        let count = submissions.len();
        drop(submissions);

        match self.submit_results.lock().unwrap().pop_front() {
            Some(Err(e)) => Err(e.into()),
            Some(Ok(id)) => Ok(CreateTaskResponse {
                task_id: TaskId::from(id),
                message: "Task created".to_string(),
            }),
            None => Ok(CreateTaskResponse {
                task_id: TaskId::from(format!("task-{count}")),
                message: "Task created".to_string(),
            }),
        }
    }
}
