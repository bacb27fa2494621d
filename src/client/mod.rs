//! HTTP client for the processing backend.
//!
//! [`VtoolClient`] is split by concern:
//! - [`tasks`] - task creation, status fetches and health checks
//! - [`images`] - synchronous image uploads (background/object removal)
//! - [`traits`] - the [`TaskSubmitter`] and [`TaskSource`] seams used by the
//!   poller and orchestrators

mod images;
mod tasks;
mod traits;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use images::{ImageMode, ImageUpload, ProcessedImage};
pub use traits::{TaskSource, TaskSubmitter};

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::{ApiConfig, Config};
use crate::error::{Error, ErrorBody, Result};

/// Backend API client (cloneable - state is Arc-wrapped)
///
/// # Example
///
/// ```no_run
/// use vtool_client::{TaskType, VtoolClient};
///
/// # async fn example() -> vtool_client::Result<()> {
/// let client = VtoolClient::builder()
///     .base_url("http://localhost:8000")
///     .build()?;
///
/// let created = client
///     .create_task(TaskType::Download, "https://tiktok.com/@a/video/123", None)
///     .await?;
/// let task = client.get_task(&created.task_id).await?;
/// println!("{} is {}", task.id, task.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct VtoolClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    /// Applied to submissions and uploads; status fetches are bounded by the poller
    pub(crate) request_timeout: Option<Duration>,
}

impl std::fmt::Debug for VtoolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VtoolClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("request_timeout", &self.inner.request_timeout)
            .finish_non_exhaustive()
    }
}

impl VtoolClient {
    /// Create a new client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder().api_config(&config.api).build()
    }

    /// The API origin requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config {
                message: format!("cannot build URL for '{path}': {e}"),
                key: Some("api.base_url".to_string()),
            })
    }

    pub(crate) fn with_timeout(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.inner.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

/// Builder for [`VtoolClient`]
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API origin (default: "http://localhost:8000")
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the timeout for submissions and uploads
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Copy base URL and timeout from an [`ApiConfig`]
    pub fn api_config(mut self, api: &ApiConfig) -> Self {
        self.base_url = Some(api.base_url.clone());
        self.request_timeout = api.request_timeout;
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS settings, ...)
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<VtoolClient> {
        let raw = self
            .base_url
            .unwrap_or_else(|| crate::config::DEFAULT_API_URL.to_string());
        let mut base_url = Url::parse(&raw).map_err(|e| Error::Config {
            message: format!("invalid base URL '{raw}': {e}"),
            key: Some("api.base_url".to_string()),
        })?;
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(VtoolClient {
            inner: Arc::new(ClientInner {
                http: self.http.unwrap_or_default(),
                base_url,
                request_timeout: self.request_timeout,
            }),
        })
    }
}

/// Read a non-success response into its display message
pub(crate) async fn error_message(response: reqwest::Response, fallback: &str) -> String {
    match response.bytes().await {
        Ok(body) => ErrorBody::message_or(&body, fallback),
        Err(_) => fallback.to_string(),
    }
}
