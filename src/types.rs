//! Core types for vtool-client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Opaque task identifier assigned by the backend at creation time
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of processing job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Video download
    Download,
    /// AI summary of a video
    Summary,
    /// Metadata and engagement analysis
    Spy,
    /// Slideshow image extraction
    Slideshow,
    /// Audio extraction and vocal separation
    Audio,
    /// Image background removal (upload-based, no polling)
    #[serde(rename = "removebg")]
    RemoveBg,
}

impl TaskType {
    /// Every task type, in tab order
    pub const ALL: [TaskType; 6] = [
        TaskType::Download,
        TaskType::Summary,
        TaskType::Spy,
        TaskType::Slideshow,
        TaskType::Audio,
        TaskType::RemoveBg,
    ];

    /// Wire name of the task type
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Download => "download",
            TaskType::Summary => "summary",
            TaskType::Spy => "spy",
            TaskType::Slideshow => "slideshow",
            TaskType::Audio => "audio",
            TaskType::RemoveBg => "removebg",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown task type '{s}'"))
    }
}

/// Backend-reported task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, not started
    Pending,
    /// Running
    Processing,
    /// Finished successfully; `result` is present
    Completed,
    /// Finished with an error; `error_message` is present
    Failed,
}

impl TaskStatus {
    /// `completed` and `failed` never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source URL that passed client-side validation
///
/// Holds the trimmed input text exactly as typed, so a later reprocessing
/// request resubmits the same string rather than a normalized form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Validate user input as a source URL
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        url::Url::parse(trimmed).map_err(|e| ValidationError::MalformedUrl {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(trimmed.to_string()))
    }

    /// The validated URL text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output format class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Video container
    Video,
    /// Audio only
    Audio,
}

/// Stem to isolate for audio tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparationMode {
    /// Voice only
    Vocals,
    /// Everything but the voice
    Instrumental,
    /// Drums
    Drum,
    /// Bass
    Bass,
    /// Remaining stems
    Other,
}

/// Optional output parameters attached to a submission
///
/// Every field is optional; an absent field means "backend default".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Target format class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    /// Quality/resolution selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Source-specific format selector (yt-dlp syntax)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytdlp_format: Option<String>,
    /// Audio bitrate in kbps (e.g. "320")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<String>,
    /// Stem separation mode for audio tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separation: Option<SeparationMode>,
}

/// Body of `POST /api/process`
#[derive(Clone, Debug, Serialize)]
pub struct CreateTaskRequest<'a> {
    /// Task type
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Source URL
    pub url: &'a str,
    /// Output options, flattened into the body
    #[serde(flatten)]
    pub options: Option<&'a ProcessOptions>,
}

/// Response of `POST /api/process`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    /// Identifier of the new task
    pub task_id: TaskId,
    /// Human-readable confirmation
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /health`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Reported status (e.g. "healthy")
    pub status: String,
    /// Any additional fields the backend reports
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Task record as returned by `GET /api/tasks/{id}`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Kind of processing job
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Current status
    pub status: TaskStatus,
    /// Progress percentage, clamped into 0..=100 (not guaranteed monotonic)
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    /// Source URL the task was created with
    pub input_url: String,
    /// Result payload (present once completed)
    #[serde(default)]
    pub result: Option<TaskResult>,
    /// Error message (present once failed)
    #[serde(default)]
    pub error_message: Option<String>,
    /// Owning user, when the backend tracks one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Creation time, when the backend reports one
    #[serde(default, deserialize_with = "crate::utils::deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time, when the backend reports one
    #[serde(default, deserialize_with = "crate::utils::deserialize_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the task reached `completed` or `failed`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map_or(0, |p| p.clamp(0.0, 100.0).round() as u8))
}

/// Result of a download task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Where the file can be fetched
    pub download_url: String,
    /// Suggested file name
    pub filename: String,
    /// Size in bytes
    pub file_size: u64,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Poster image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Result of an AI summary task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Summary in Markdown
    pub markdown: String,
    /// Word count of the summary
    pub word_count: u64,
    /// Extracted topics
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Result of a metadata ("spy") task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpyResult {
    /// Source platform (e.g. "tiktok")
    pub platform: String,
    /// Author handle or name
    pub author: String,
    /// Author avatar image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    /// Video title
    pub title: String,
    /// Video description
    #[serde(default)]
    pub description: String,
    /// Views
    pub view_count: u64,
    /// Likes
    pub like_count: u64,
    /// Comments
    pub comment_count: u64,
    /// Shares, when the platform reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_count: Option<u64>,
    /// Hashtags without the leading '#'
    #[serde(default)]
    pub tags: Vec<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Thumbnail image
    pub thumbnail_url: String,
    /// Publication date as reported by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
}

/// Result of a slideshow task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlideshowResult {
    /// Archive with every image
    pub download_url: String,
    /// Image URLs in slide order
    pub images: Vec<String>,
    /// Background audio track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Archive file name
    pub filename: String,
}

/// Result of an audio task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioResult {
    /// Primary (full mix) track
    pub download_url: String,
    /// Primary track file name
    pub filename: String,
    /// Duration in seconds
    pub duration: f64,
    /// Container/codec (e.g. "mp3")
    pub format: String,
    /// Primary track size in bytes
    pub file_size: u64,
    /// Separated vocals track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocals_url: Option<String>,
    /// Separated vocals file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocals_filename: Option<String>,
    /// Separated instrumental track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumental_url: Option<String>,
    /// Separated instrumental file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumental_filename: Option<String>,
}

/// Result payload the client could not map to a known variant
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawResult {
    /// The `type` tag, if one was present
    pub kind: Option<String>,
    /// The payload as received
    pub payload: serde_json::Value,
}

/// Typed result payload, keyed by the `type` tag
///
/// Deserialization never fails on a well-formed JSON value: an unknown tag,
/// or a known tag whose fields do not match, becomes [`TaskResult::Unrecognized`].
#[derive(Clone, Debug, PartialEq)]
pub enum TaskResult {
    /// `type: "download"`
    Download(DownloadResult),
    /// `type: "summary"`
    Summary(SummaryResult),
    /// `type: "spy"`
    Spy(SpyResult),
    /// `type: "slideshow"`
    Slideshow(SlideshowResult),
    /// `type: "audio"`
    Audio(AudioResult),
    /// Anything else
    Unrecognized(RawResult),
}

impl TaskResult {
    /// Decode a raw JSON payload
    pub fn from_value(payload: serde_json::Value) -> Self {
        let kind = payload
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let decoded = match kind.as_deref() {
            Some("download") => serde_json::from_value(payload.clone()).map(TaskResult::Download),
            Some("summary") => serde_json::from_value(payload.clone()).map(TaskResult::Summary),
            Some("spy") => serde_json::from_value(payload.clone()).map(TaskResult::Spy),
            Some("slideshow") => serde_json::from_value(payload.clone()).map(TaskResult::Slideshow),
            Some("audio") => serde_json::from_value(payload.clone()).map(TaskResult::Audio),
            _ => return TaskResult::Unrecognized(RawResult { kind, payload }),
        };

        match decoded {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(kind = ?kind, error = %e, "result payload does not match its type tag");
                TaskResult::Unrecognized(RawResult { kind, payload })
            }
        }
    }

    /// The discriminant tag (`"unknown"` when the payload had none)
    pub fn kind(&self) -> &str {
        match self {
            TaskResult::Download(_) => "download",
            TaskResult::Summary(_) => "summary",
            TaskResult::Spy(_) => "spy",
            TaskResult::Slideshow(_) => "slideshow",
            TaskResult::Audio(_) => "audio",
            TaskResult::Unrecognized(raw) => raw.kind.as_deref().unwrap_or("unknown"),
        }
    }

    /// Task type matching the tag, for known variants
    pub fn task_type(&self) -> Option<TaskType> {
        match self {
            TaskResult::Download(_) => Some(TaskType::Download),
            TaskResult::Summary(_) => Some(TaskType::Summary),
            TaskResult::Spy(_) => Some(TaskType::Spy),
            TaskResult::Slideshow(_) => Some(TaskType::Slideshow),
            TaskResult::Audio(_) => Some(TaskType::Audio),
            TaskResult::Unrecognized(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for TaskResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let payload = serde_json::Value::deserialize(deserializer)?;
        Ok(TaskResult::from_value(payload))
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedResult<'a> {
    Download(&'a DownloadResult),
    Summary(&'a SummaryResult),
    Spy(&'a SpyResult),
    Slideshow(&'a SlideshowResult),
    Audio(&'a AudioResult),
}

impl Serialize for TaskResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TaskResult::Download(r) => TaggedResult::Download(r).serialize(serializer),
            TaskResult::Summary(r) => TaggedResult::Summary(r).serialize(serializer),
            TaskResult::Spy(r) => TaggedResult::Spy(r).serialize(serializer),
            TaskResult::Slideshow(r) => TaggedResult::Slideshow(r).serialize(serializer),
            TaskResult::Audio(r) => TaggedResult::Audio(r).serialize(serializer),
            TaskResult::Unrecognized(raw) => raw.payload.serialize(serializer),
        }
    }
}

/// Phase of a feature orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No active task; the input form is shown
    Form,
    /// A task is tracked and not yet terminal
    Polling,
    /// The task failed
    Error,
    /// The task completed with a result
    Result,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Form => "form",
            Phase::Polling => "polling",
            Phase::Error => "error",
            Phase::Result => "result",
        })
    }
}

/// Event emitted by a feature orchestrator
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task was created and is now tracked
    Submitted {
        /// Feature tab
        feature: TaskType,
        /// New task
        task_id: TaskId,
        /// Source URL it was created with
        url: SourceUrl,
    },

    /// The orchestrator moved between phases
    PhaseChanged {
        /// Feature tab
        feature: TaskType,
        /// Previous phase
        from: Phase,
        /// New phase
        to: Phase,
    },

    /// The "has active result" flag flipped
    ActiveResultChanged {
        /// Feature tab
        feature: TaskType,
        /// Whether a completed result is on screen
        active: bool,
    },

    /// A submission or resubmission was rejected
    SubmissionFailed {
        /// Feature tab
        feature: TaskType,
        /// Inline error text
        error: String,
    },

    /// The tracked task was dropped and the form restored
    Reset {
        /// Feature tab
        feature: TaskType,
    },
}
