//! Task creation, status fetches and health checks.

use async_trait::async_trait;

use super::{TaskSource, TaskSubmitter, VtoolClient, error_message};
use crate::catalog::PROCESS_ENDPOINT;
use crate::error::{
    CREATE_TASK_FALLBACK, Error, FETCH_TASK_FALLBACK, PollFetchError, Result, SubmissionError,
    ValidationError,
};
use crate::types::{
    CreateTaskRequest, CreateTaskResponse, HealthStatus, ProcessOptions, SourceUrl, Task, TaskId,
    TaskType,
};

impl VtoolClient {
    /// Create a processing task
    ///
    /// The URL is validated first; an empty or malformed URL fails with
    /// [`Error::Validation`] without any request being sent. Otherwise exactly
    /// one `POST /api/process` is issued. Nothing is retried.
    pub async fn create_task(
        &self,
        task_type: TaskType,
        url: &str,
        options: Option<&ProcessOptions>,
    ) -> Result<CreateTaskResponse> {
        let url = SourceUrl::parse(url)?;
        self.submit(task_type, &url, options).await
    }

    /// Fetch the current record of a task (`GET /api/tasks/{id}`)
    pub async fn get_task(&self, id: &TaskId) -> Result<Task> {
        self.fetch_task(id).await
    }

    /// Check backend liveness (`GET /health`)
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoint("health")?;
        let response = self
            .with_timeout(self.inner.http.get(url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TaskSubmitter for VtoolClient {
    async fn submit(
        &self,
        task_type: TaskType,
        url: &SourceUrl,
        options: Option<&ProcessOptions>,
    ) -> Result<CreateTaskResponse> {
        if task_type.requires_image_upload() {
            return Err(ValidationError::ImageUploadRequired(task_type).into());
        }

        let endpoint = self.endpoint(PROCESS_ENDPOINT)?;
        let body = CreateTaskRequest {
            task_type,
            url: url.as_str(),
            options,
        };

        tracing::debug!(task_type = %task_type, url = %url, "creating task");

        let response = self
            .with_timeout(self.inner.http.post(endpoint).json(&body))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(task_type = %task_type, error = %e, "task creation request failed");
                SubmissionError {
                    message: e.to_string(),
                    status: None,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, CREATE_TASK_FALLBACK).await;
            tracing::warn!(
                task_type = %task_type,
                status = status.as_u16(),
                error = %message,
                "task creation rejected"
            );
            return Err(SubmissionError {
                message,
                status: Some(status.as_u16()),
            }
            .into());
        }

        let created: CreateTaskResponse = response.json().await.map_err(|e| {
            tracing::warn!(task_type = %task_type, error = %e, "unreadable task creation response");
            SubmissionError {
                message: CREATE_TASK_FALLBACK.to_string(),
                status: Some(status.as_u16()),
            }
        })?;

        tracing::info!(task_type = %task_type, task_id = %created.task_id, "task created");
        Ok(created)
    }
}

#[async_trait]
impl TaskSource for VtoolClient {
    async fn fetch_task(&self, id: &TaskId) -> Result<Task> {
        let endpoint = self.endpoint(&format!(
            "api/tasks/{}",
            urlencoding::encode(id.as_str())
        ))?;

        let response = self.inner.http.get(endpoint).send().await.map_err(|e| {
            Error::from(PollFetchError {
                task_id: id.clone(),
                message: e.to_string(),
                status: None,
                timed_out: e.is_timeout(),
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, FETCH_TASK_FALLBACK).await;
            return Err(PollFetchError {
                task_id: id.clone(),
                message,
                status: Some(status.as_u16()),
                timed_out: false,
            }
            .into());
        }

        response.json::<Task>().await.map_err(|e| {
            tracing::warn!(task_id = %id, error = %e, "unreadable task record");
            Error::from(PollFetchError {
                task_id: id.clone(),
                message: FETCH_TASK_FALLBACK.to_string(),
                status: Some(status.as_u16()),
                timed_out: false,
            })
        })
    }
}
