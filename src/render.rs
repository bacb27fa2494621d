//! Result presentation
//!
//! [`render`] turns a [`TaskResult`] into a display model. Dispatch is an
//! exhaustive match on the result variant; payloads the client could not type
//! fall through to [`RawCard`], which never fails. Nothing here performs I/O:
//! download links are data, and acting on them is up to the front end.

use serde::Serialize;

use crate::poller::PollState;
use crate::types::{
    AudioResult, DownloadResult, RawResult, SlideshowResult, SpyResult, SummaryResult,
    TaskResult, TaskStatus,
};
use crate::utils::{format_count, format_duration, format_file_size};

/// Number of slideshow images shown before the overflow counter
pub const SLIDESHOW_PREVIEW_LIMIT: usize = 6;

const DEFAULT_VOCALS_FILENAME: &str = "vocals.mp3";
const DEFAULT_INSTRUMENTAL_FILENAME: &str = "instrumental.mp3";

/// Something the user can click to save a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    /// File location
    pub url: String,
    /// Suggested file name
    pub filename: String,
}

/// Download result card
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DownloadCard {
    /// Video player source
    pub video_src: String,
    /// Player poster
    pub poster: Option<String>,
    /// File size, e.g. "1 MB"
    pub file_size: String,
    /// Duration as `m:ss`, when known
    pub duration: Option<String>,
    /// Save action
    pub download: DownloadLink,
}

/// Summary result card
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryCard {
    /// Word count badge, e.g. "250 words"
    pub word_count: String,
    /// Topic chips
    pub topics: Vec<String>,
    /// Summary body (Markdown)
    pub markdown: String,
}

/// One engagement figure
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Stat {
    /// Label
    pub label: &'static str,
    /// Compact value, e.g. "1.2K"
    pub value: String,
    /// Exact value
    pub raw: u64,
}

/// Metadata ("spy") result card
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpyCard {
    /// Video title
    pub title: String,
    /// Author name
    pub author: String,
    /// Author avatar
    pub author_avatar: Option<String>,
    /// Source platform
    pub platform: String,
    /// Publication date as reported
    pub publish_date: Option<String>,
    /// Thumbnail image
    pub thumbnail_url: String,
    /// Duration as `m:ss`
    pub duration: String,
    /// Description text
    pub description: String,
    /// Views, likes, comments, shares
    pub stats: [Stat; 4],
    /// Hashtags with a leading '#'
    pub tags: Vec<String>,
}

/// Slideshow result card
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlideshowCard {
    /// At most [`SLIDESHOW_PREVIEW_LIMIT`] images, in order
    pub preview: Vec<String>,
    /// Images not in the preview (shown as "+N" on the last tile)
    pub overflow: usize,
    /// Total number of images
    pub image_count: usize,
    /// Background audio track
    pub audio_url: Option<String>,
    /// Archive download
    pub download: DownloadLink,
}

/// Which stem an audio track holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// The full mix
    Full,
    /// Vocals only
    Vocals,
    /// Everything but the vocals
    Instrumental,
}

impl TrackKind {
    /// Display title
    pub fn title(self) -> &'static str {
        match self {
            TrackKind::Full => "Full Audio",
            TrackKind::Vocals => "Vocals Only",
            TrackKind::Instrumental => "Instrumental (Beat)",
        }
    }
}

/// One playable, downloadable audio track
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    /// Stem
    pub kind: TrackKind,
    /// Save action (also the player source)
    pub download: DownloadLink,
}

/// Audio result card
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AudioCard {
    /// Size of the full mix
    pub file_size: String,
    /// Duration as `m:ss`
    pub duration: String,
    /// Upper-cased container, e.g. "MP3"
    pub format: String,
    /// Full mix first, then whichever stems are present
    pub tracks: Vec<AudioTrack>,
}

/// Fallback for payloads without a typed variant
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawCard {
    /// The payload's `type` tag, if any
    pub kind: Option<String>,
    /// Pretty-printed payload
    pub json: String,
}

/// Display model chosen for a result
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "presentation", rename_all = "lowercase")]
pub enum Presentation {
    /// Video player and download
    Download(DownloadCard),
    /// Markdown summary
    Summary(SummaryCard),
    /// Metadata and engagement
    Spy(SpyCard),
    /// Image grid and archive
    Slideshow(SlideshowCard),
    /// Track list
    Audio(AudioCard),
    /// Raw payload dump
    Raw(RawCard),
}

impl Presentation {
    /// The result tag this presentation was chosen for
    pub fn kind(&self) -> &str {
        match self {
            Presentation::Download(_) => "download",
            Presentation::Summary(_) => "summary",
            Presentation::Spy(_) => "spy",
            Presentation::Slideshow(_) => "slideshow",
            Presentation::Audio(_) => "audio",
            Presentation::Raw(raw) => raw.kind.as_deref().unwrap_or("unknown"),
        }
    }

    /// Whether the raw fallback was used
    pub fn is_fallback(&self) -> bool {
        matches!(self, Presentation::Raw(_))
    }
}

/// Choose and build the presentation for a result
pub fn render(result: &TaskResult) -> Presentation {
    match result {
        TaskResult::Download(r) => Presentation::Download(download_card(r)),
        TaskResult::Summary(r) => Presentation::Summary(summary_card(r)),
        TaskResult::Spy(r) => Presentation::Spy(spy_card(r)),
        TaskResult::Slideshow(r) => Presentation::Slideshow(slideshow_card(r)),
        TaskResult::Audio(r) => Presentation::Audio(audio_card(r)),
        TaskResult::Unrecognized(raw) => Presentation::Raw(raw_card(raw)),
    }
}

fn download_card(r: &DownloadResult) -> DownloadCard {
    DownloadCard {
        video_src: r.download_url.clone(),
        poster: r.thumbnail_url.clone(),
        file_size: format_file_size(r.file_size),
        duration: r.duration.map(format_duration),
        download: DownloadLink {
            url: r.download_url.clone(),
            filename: r.filename.clone(),
        },
    }
}

fn summary_card(r: &SummaryResult) -> SummaryCard {
    SummaryCard {
        word_count: format!("{} words", r.word_count),
        topics: r.topics.clone(),
        markdown: r.markdown.clone(),
    }
}

fn stat(label: &'static str, raw: u64) -> Stat {
    Stat {
        label,
        value: format_count(raw),
        raw,
    }
}

fn spy_card(r: &SpyResult) -> SpyCard {
    SpyCard {
        title: r.title.clone(),
        author: r.author.clone(),
        author_avatar: r.author_avatar.clone(),
        platform: r.platform.clone(),
        publish_date: r.publish_date.clone(),
        thumbnail_url: r.thumbnail_url.clone(),
        duration: format_duration(r.duration),
        description: r.description.clone(),
        stats: [
            stat("Views", r.view_count),
            stat("Likes", r.like_count),
            stat("Comments", r.comment_count),
            stat("Shares", r.share_count.unwrap_or(0)),
        ],
        tags: r.tags.iter().map(|t| format!("#{t}")).collect(),
    }
}

fn slideshow_card(r: &SlideshowResult) -> SlideshowCard {
    let image_count = r.images.len();
    SlideshowCard {
        preview: r
            .images
            .iter()
            .take(SLIDESHOW_PREVIEW_LIMIT)
            .cloned()
            .collect(),
        overflow: image_count.saturating_sub(SLIDESHOW_PREVIEW_LIMIT),
        image_count,
        audio_url: r.audio_url.clone(),
        download: DownloadLink {
            url: r.download_url.clone(),
            filename: r.filename.clone(),
        },
    }
}

fn audio_card(r: &AudioResult) -> AudioCard {
    let mut tracks = vec![AudioTrack {
        kind: TrackKind::Full,
        download: DownloadLink {
            url: r.download_url.clone(),
            filename: r.filename.clone(),
        },
    }];

    let stems = [
        (
            TrackKind::Vocals,
            &r.vocals_url,
            &r.vocals_filename,
            DEFAULT_VOCALS_FILENAME,
        ),
        (
            TrackKind::Instrumental,
            &r.instrumental_url,
            &r.instrumental_filename,
            DEFAULT_INSTRUMENTAL_FILENAME,
        ),
    ];
    for (kind, url, filename, default) in stems {
        if let Some(url) = url {
            tracks.push(AudioTrack {
                kind,
                download: DownloadLink {
                    url: url.clone(),
                    filename: filename.clone().unwrap_or_else(|| default.to_string()),
                },
            });
        }
    }

    AudioCard {
        file_size: format_file_size(r.file_size),
        duration: format_duration(r.duration),
        format: r.format.to_uppercase(),
        tracks,
    }
}

fn raw_card(raw: &RawResult) -> RawCard {
    RawCard {
        kind: raw.kind.clone(),
        json: serde_json::to_string_pretty(&raw.payload)
            .unwrap_or_else(|_| raw.payload.to_string()),
    }
}

/// Connection indicator under the progress bar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connection {
    /// No fetch has completed yet
    Connecting,
    /// The last fetch succeeded
    Live,
    /// The last fetch failed; polling continues
    Reconnecting,
}

impl Connection {
    /// Indicator text
    pub fn label(self) -> &'static str {
        match self {
            Connection::Connecting => "Connecting...",
            Connection::Live => "Real-time updates active",
            Connection::Reconnecting => "Reconnecting...",
        }
    }
}

/// Progress display for a tracked task
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    /// Status (pending until the first record arrives)
    pub status: TaskStatus,
    /// Status badge text
    pub label: &'static str,
    /// Progress bar fill, 0..=100
    pub percent: u8,
    /// Spinner and shimmer while processing
    pub animated: bool,
    /// Connection indicator
    pub connection: Connection,
}

impl ProgressView {
    /// Build from a poller snapshot
    pub fn from_state(state: &PollState) -> Self {
        let status = state.status().unwrap_or(TaskStatus::Pending);
        let connection = if state.is_connected() {
            Connection::Live
        } else if state.fetch_error.is_some() {
            Connection::Reconnecting
        } else {
            Connection::Connecting
        };

        Self {
            status,
            label: match status {
                TaskStatus::Pending => "Pending",
                TaskStatus::Processing => "Processing",
                TaskStatus::Completed => "Completed",
                TaskStatus::Failed => "Failed",
            },
            percent: state.progress().min(100),
            animated: status == TaskStatus::Processing,
            connection,
        }
    }
}
