//! Feature and output-format catalog
//!
//! Static descriptions of every feature tab and of the format presets offered
//! when a download is (re)processed. Lookups are exhaustive matches over
//! [`TaskType`], so a new task type without catalog entries does not compile.

use crate::types::{OutputFormat, ProcessOptions, SeparationMode, TaskType};

/// Endpoint for URL-based processing tasks
pub const PROCESS_ENDPOINT: &str = "/api/process";

/// Endpoint for background removal uploads
pub const REMOVE_BG_ENDPOINT: &str = "/api/v1/remove-bg";

/// Endpoint for object removal (inpainting) uploads
pub const REMOVE_OBJECT_ENDPOINT: &str = "/api/v1/inpainting/remove-object";

/// Display and routing data for one feature tab
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureInfo {
    /// Task type this tab submits
    pub task_type: TaskType,
    /// Tab label
    pub label: &'static str,
    /// One-line description under the tab title
    pub description: &'static str,
    /// Input placeholder
    pub placeholder: &'static str,
    /// Backend endpoint the tab submits to
    pub endpoint: &'static str,
    /// Icon name
    pub icon: &'static str,
}

impl TaskType {
    /// Catalog entry for this task type
    pub fn info(self) -> FeatureInfo {
        let (label, description, placeholder, endpoint, icon) = match self {
            TaskType::Download => (
                "Video Downloader",
                "Download videos without watermark in the quality you choose",
                "Paste a TikTok, YouTube or Facebook video URL...",
                PROCESS_ENDPOINT,
                "download",
            ),
            TaskType::Summary => (
                "AI Summary",
                "Get the key points of any video as a structured summary",
                "Paste a YouTube video URL to summarize...",
                PROCESS_ENDPOINT,
                "brain",
            ),
            TaskType::Spy => (
                "Video Spy",
                "Inspect author, engagement and tags of any video",
                "Paste a video URL to analyze...",
                PROCESS_ENDPOINT,
                "eye",
            ),
            TaskType::Slideshow => (
                "Slideshow Downloader",
                "Save every image of a photo slideshow in one archive",
                "Paste a TikTok slideshow URL...",
                PROCESS_ENDPOINT,
                "images",
            ),
            TaskType::Audio => (
                "Vocal Remover",
                "Extract the audio track and split vocals from the instrumental",
                "Paste a video or song URL...",
                PROCESS_ENDPOINT,
                "scissors",
            ),
            TaskType::RemoveBg => (
                "Remove Background",
                "Cut out the subject of an image or erase unwanted objects",
                "Upload an image (.jpg, .png, .webp)",
                REMOVE_BG_ENDPOINT,
                "eraser",
            ),
        };
        FeatureInfo {
            task_type: self,
            label,
            description,
            placeholder,
            endpoint,
            icon,
        }
    }

    /// Whether a completed task can be resubmitted with another format preset
    pub fn supports_format_change(self) -> bool {
        match self {
            TaskType::Download => true,
            TaskType::Summary
            | TaskType::Spy
            | TaskType::Slideshow
            | TaskType::Audio
            | TaskType::RemoveBg => false,
        }
    }

    /// Whether submissions are image uploads instead of URL tasks
    pub fn requires_image_upload(self) -> bool {
        match self {
            TaskType::RemoveBg => true,
            TaskType::Download
            | TaskType::Summary
            | TaskType::Spy
            | TaskType::Slideshow
            | TaskType::Audio => false,
        }
    }
}

/// A selectable output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatPreset {
    /// Stable identifier (e.g. "video-720", "audio-320")
    pub id: &'static str,
    /// Display label, also sent as the quality selector
    pub label: &'static str,
    /// Quality hint shown next to the label
    pub quality: &'static str,
    /// Format class
    pub format: OutputFormat,
    /// yt-dlp format selector
    pub ytdlp_format: &'static str,
    /// Stem separation for audio presets
    pub separation: Option<SeparationMode>,
}

/// Video presets, best first
pub static VIDEO_PRESETS: [FormatPreset; 5] = [
    video_preset(
        "video-1080",
        "1080p (.mp4)",
        "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best",
    ),
    video_preset(
        "video-720",
        "720p (.mp4)",
        "bestvideo[height<=720]+bestaudio/best[height<=720]/best",
    ),
    video_preset(
        "video-360",
        "360p (.mp4)",
        "bestvideo[height<=360]+bestaudio/best[height<=360]/best",
    ),
    video_preset(
        "video-240",
        "240p (.mp4)",
        "bestvideo[height<=240]+bestaudio/best[height<=240]/best",
    ),
    video_preset(
        "video-144",
        "144p (.mp4)",
        "bestvideo[height<=144]+bestaudio/best[height<=144]/best",
    ),
];

/// Audio presets
pub static AUDIO_PRESETS: [FormatPreset; 1] = [FormatPreset {
    id: "audio-320",
    label: "MP3 - Original (320kbps)",
    quality: "High",
    format: OutputFormat::Audio,
    ytdlp_format: "bestaudio",
    separation: None,
}];

const fn video_preset(
    id: &'static str,
    label: &'static str,
    ytdlp_format: &'static str,
) -> FormatPreset {
    FormatPreset {
        id,
        label,
        quality: "Auto",
        format: OutputFormat::Video,
        ytdlp_format,
        separation: None,
    }
}

impl FormatPreset {
    /// Preset selected when the format dialog opens
    pub const DEFAULT_ID: &'static str = "video-1080";

    /// Look up a preset by id
    pub fn find(id: &str) -> Option<&'static FormatPreset> {
        VIDEO_PRESETS
            .iter()
            .chain(AUDIO_PRESETS.iter())
            .find(|p| p.id == id)
    }

    /// Submission options for this preset
    ///
    /// The audio bitrate is derived from the preset id ("...320" -> "320",
    /// "...128" -> "128").
    pub fn to_options(&self) -> ProcessOptions {
        let audio_bitrate = if self.id.contains("320") {
            Some("320".to_string())
        } else if self.id.contains("128") {
            Some("128".to_string())
        } else {
            None
        };
        ProcessOptions {
            format: Some(self.format),
            quality: Some(self.label.to_string()),
            ytdlp_format: Some(self.ytdlp_format.to_string()),
            audio_bitrate,
            separation: self.separation,
        }
    }
}

/// Presets offered for a source URL
///
/// TikTok sources only offer video presets.
pub fn presets_for_url(url: &str) -> Vec<&'static FormatPreset> {
    let tiktok = url.to_lowercase().contains("tiktok.com");
    VIDEO_PRESETS
        .iter()
        .chain(AUDIO_PRESETS.iter().filter(|_| !tiktok))
        .collect()
}
