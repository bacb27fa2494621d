//! Trait seams between the lifecycle machinery and the network.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CreateTaskResponse, ProcessOptions, SourceUrl, Task, TaskId, TaskType};

/// Creates backend tasks
///
/// Implementations send exactly one creation request per call and never retry.
/// Failures are reported as [`crate::Error::Submission`].
#[async_trait]
pub trait TaskSubmitter: Send + Sync + 'static {
    /// Create a task for an already validated source URL
    async fn submit(
        &self,
        task_type: TaskType,
        url: &SourceUrl,
        options: Option<&ProcessOptions>,
    ) -> Result<CreateTaskResponse>;
}

/// Reads task state
///
/// Failures are reported as [`crate::Error::PollFetch`].
#[async_trait]
pub trait TaskSource: Send + Sync + 'static {
    /// Fetch the current record of a task
    async fn fetch_task(&self, id: &TaskId) -> Result<Task>;
}
