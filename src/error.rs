//! Error types for vtool-client
//!
//! This module provides the error taxonomy of the task lifecycle:
//! - [`ValidationError`] - malformed input caught before any network call
//! - [`SubmissionError`] - task creation (or image upload) rejected or unreachable
//! - [`PollFetchError`] - a single status fetch failed (recoverable)
//! - [`Error::TaskFailed`] - the backend reported terminal status `failed`
//!
//! Backend error bodies (`{"detail": "..."}`) are decoded through [`ErrorBody`],
//! which falls back to a generic message when the body is not usable.

use crate::types::{TaskId, TaskType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for vtool-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback message when a task creation failure carries no usable detail
pub const CREATE_TASK_FALLBACK: &str = "Failed to create task";

/// Fallback message when a status fetch failure carries no usable detail
pub const FETCH_TASK_FALLBACK: &str = "Failed to fetch task";

/// Fallback message when an image upload failure carries no usable detail
pub const PROCESS_IMAGE_FALLBACK: &str = "Failed to process image";

/// Main error type for vtool-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// Input rejected before reaching the backend
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Task creation request failed
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),

    /// A single status fetch failed
    #[error("status fetch failed: {0}")]
    PollFetch(#[from] PollFetchError),

    /// The backend reported terminal status `failed`
    #[error("task {id} failed: {message}")]
    TaskFailed {
        /// The failed task
        id: TaskId,
        /// The backend's `error_message`
        message: String,
    },

    /// Orchestrator operation attempted from a phase that does not allow it
    #[error("cannot {operation} while in {current_state} state")]
    InvalidTransition {
        /// The operation that was attempted (e.g., "retry", "change format")
        operation: &'static str,
        /// The current phase that prevents the operation
        current_state: String,
    },

    /// Network error not otherwise classified
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The source URL is empty or whitespace
    #[error("URL is required")]
    EmptyUrl,

    /// The source URL does not parse
    #[error("invalid URL '{input}': {reason}")]
    MalformedUrl {
        /// The rejected input (trimmed)
        input: String,
        /// Parser diagnostic
        reason: String,
    },

    /// The feature only accepts image uploads, not URLs
    #[error("{0} requires an image upload, not a URL")]
    ImageUploadRequired(TaskType),

    /// An image upload with no bytes
    #[error("image '{filename}' is empty")]
    EmptyImage {
        /// The uploaded file name
        filename: String,
    },

    /// An image upload whose MIME type does not parse
    #[error("image '{filename}' has an invalid content type '{content_type}'")]
    InvalidContentType {
        /// The uploaded file name
        filename: String,
        /// The rejected MIME type
        content_type: String,
    },

    /// Format change requested for a feature that has no format choice
    #[error("{0} does not support changing the output format")]
    FormatChangeUnsupported(TaskType),

    /// Reprocessing requested but no source URL was stored
    #[error("no source URL to reprocess")]
    MissingSourceUrl,
}

/// Task creation failure
///
/// `message` is the backend's `detail` when available, otherwise a generic
/// fallback; it is displayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmissionError {
    /// Display message
    pub message: String,
    /// HTTP status when the backend answered (None for transport failures)
    pub status: Option<u16>,
}

/// Status fetch failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct PollFetchError {
    /// The task whose status was requested
    pub task_id: TaskId,
    /// Display message
    pub message: String,
    /// HTTP status when the backend answered (None for transport failures)
    pub status: Option<u16>,
    /// Whether the fetch was abandoned by the configured fetch timeout
    pub timed_out: bool,
}

/// Backend error body (`{"detail": ...}`)
///
/// `detail` is kept as raw JSON because validation failures carry an array
/// of objects instead of a string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error detail as sent by the backend
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Extract a displayable message from a raw response body
    ///
    /// Returns the `detail` string when the body is JSON with a non-empty string
    /// `detail`, otherwise `fallback`.
    pub fn message_or(body: &[u8], fallback: &str) -> String {
        serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| match b.detail {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(e) => match e {
                ValidationError::EmptyUrl => "url_required",
                ValidationError::MalformedUrl { .. } => "url_invalid",
                ValidationError::ImageUploadRequired(_) => "image_upload_required",
                ValidationError::EmptyImage { .. } => "empty_image",
                ValidationError::InvalidContentType { .. } => "invalid_content_type",
                ValidationError::FormatChangeUnsupported(_) => "format_change_unsupported",
                ValidationError::MissingSourceUrl => "missing_source_url",
            },
            Error::Submission(_) => "submission_failed",
            Error::PollFetch(e) if e.timed_out => "poll_timeout",
            Error::PollFetch(_) => "poll_fetch_failed",
            Error::TaskFailed { .. } => "task_failed",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the failure is transient and the same operation may succeed on a later attempt
    ///
    /// Only status fetches are retried automatically (by the poll schedule); a
    /// recoverable submission error still needs the user to resubmit.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::PollFetch(_) => true,
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Submission(e) => e.status.is_none_or(|s| s >= 500),
            Error::Config { .. }
            | Error::Validation(_)
            | Error::TaskFailed { .. }
            | Error::InvalidTransition { .. }
            | Error::Serialization(_) => false,
        }
    }

    /// Text suitable for inline display next to the form or task view
    ///
    /// Backend-supplied messages are returned verbatim, without the category
    /// prefix that `Display` adds.
    pub fn user_message(&self) -> String {
        match self {
            Error::Submission(e) => e.message.clone(),
            Error::PollFetch(e) => e.message.clone(),
            Error::TaskFailed { message, .. } => message.clone(),
            Error::Validation(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}
