// Common data models for the YouTube adapter

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::DownloadError;

/// Host-level quality tier that drives codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    HiFi,
    Lossless,
    High,
    Medium,
    Low,
    Minimum,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::HiFi,
        Quality::Lossless,
        Quality::High,
        Quality::Medium,
        Quality::Low,
        Quality::Minimum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HiFi => "hifi",
            Self::Lossless => "lossless",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Minimum => "minimum",
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::HiFi
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hifi" => Ok(Self::HiFi),
            "lossless" => Ok(Self::Lossless),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "minimum" => Ok(Self::Minimum),
            other => Err(format!(
                "unknown quality '{}' (expected hifi, lossless, high, medium, low or minimum)",
                other
            )),
        }
    }
}

/// Audio codec of a produced file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Opus,
    Aac,
    Mp3,
    Vorbis,
}

impl Codec {
    /// Container extension the codec is extracted into
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Aac => "m4a",
            Self::Mp3 => "mp3",
            Self::Vorbis => "ogg",
        }
    }

    /// Value passed to yt-dlp `--audio-format`
    pub fn audio_format_arg(&self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Aac => "m4a",
            Self::Mp3 => "mp3",
            Self::Vorbis => "vorbis",
        }
    }

    /// YouTube never serves these natively, so FFmpeg must encode them
    pub fn requires_transcoder(&self) -> bool {
        matches!(self, Self::Mp3 | Self::Vorbis)
    }

    /// Map a downloaded file extension back to the codec it carries
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "opus" | "webm" => Some(Self::Opus),
            "m4a" | "aac" => Some(Self::Aac),
            "mp3" => Some(Self::Mp3),
            "ogg" => Some(Self::Vorbis),
            _ => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opus => write!(f, "opus"),
            Self::Aac => write!(f, "aac"),
            Self::Mp3 => write!(f, "mp3"),
            Self::Vorbis => write!(f, "vorbis"),
        }
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opus" => Ok(Self::Opus),
            "aac" | "m4a" => Ok(Self::Aac),
            "mp3" => Ok(Self::Mp3),
            "vorbis" | "ogg" => Ok(Self::Vorbis),
            other => Err(format!("unknown codec '{}' (expected opus, aac, mp3 or vorbis)", other)),
        }
    }
}

/// Kind of media a target or result refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Track,
    Playlist,
    Album,
    /// A YouTube channel
    Artist,
}

impl MediaKind {
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::Track)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track => write!(f, "track"),
            Self::Playlist => write!(f, "playlist"),
            Self::Album => write!(f, "album"),
            Self::Artist => write!(f, "artist"),
        }
    }
}

/// Resolved YouTube identifier plus what it points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTarget {
    pub kind: MediaKind,
    pub id: String,
}

impl MediaTarget {
    pub fn track(id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Track,
            id: id.into(),
        }
    }

    pub fn playlist(id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Playlist,
            id: id.into(),
        }
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Artist,
            id: id.into(),
        }
    }

    /// Canonical URL handed to the engine
    pub fn url(&self) -> String {
        match self.kind {
            MediaKind::Track => format!("https://www.youtube.com/watch?v={}", self.id),
            MediaKind::Playlist | MediaKind::Album => {
                format!("https://www.youtube.com/playlist?list={}", self.id)
            }
            MediaKind::Artist => {
                if is_channel_id(&self.id) {
                    format!("https://www.youtube.com/channel/{}", self.id)
                } else if self.id.starts_with("c/") || self.id.starts_with("user/") {
                    format!("https://www.youtube.com/{}", self.id)
                } else {
                    format!("https://www.youtube.com/@{}", self.id)
                }
            }
        }
    }
}

impl fmt::Display for MediaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// `UC` + 22 characters is a channel id; everything else is a handle or custom name
pub fn is_channel_id(id: &str) -> bool {
    id.len() == 24 && id.starts_with("UC")
}

/// One download issued by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub target: MediaTarget,
    pub quality: Quality,
    /// Explicit codec that bypasses the quality table
    pub format_override: Option<Codec>,
    /// Directory the audio file is written into
    pub destination: PathBuf,
    /// File name without extension; defaults to the video id
    pub file_stem: Option<String>,
}

impl DownloadRequest {
    pub fn new(target: MediaTarget, quality: Quality, destination: impl Into<PathBuf>) -> Self {
        Self {
            target,
            quality,
            format_override: None,
            destination: destination.into(),
            file_stem: None,
        }
    }

    pub fn with_format_override(mut self, codec: Option<Codec>) -> Self {
        self.format_override = codec;
        self
    }

    pub fn with_file_stem(mut self, stem: Option<String>) -> Self {
        self.file_stem = stem;
        self
    }

    pub fn file_stem(&self) -> &str {
        self.file_stem.as_deref().unwrap_or(&self.target.id)
    }
}

/// Lifecycle of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Issued,
    InProgress,
    Succeeded,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "issued"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedTrack {
    pub target: MediaTarget,
    pub path: PathBuf,
    /// Codec of the produced file
    pub codec: Codec,
    /// Codecs tried, in order; the last one succeeded
    pub attempted: Vec<Codec>,
}

impl DownloadedTrack {
    pub fn fell_back(&self) -> bool {
        self.attempted.len() > 1
    }
}

pub type DownloadOutcome = Result<DownloadedTrack, DownloadError>;

/// One search hit, shaped the same way for every search kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub kind: MediaKind,
    pub name: String,
    pub artists: Vec<String>,
    pub duration: Option<u64>,
    pub year: Option<String>,
    pub additional: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub url: String,
}

impl SearchResult {
    pub fn target(&self) -> MediaTarget {
        MediaTarget {
            kind: self.kind,
            id: self.id.clone(),
        }
    }

    /// Build the request that downloads what this hit describes
    pub fn to_request(&self, quality: Quality, destination: impl Into<PathBuf>) -> DownloadRequest {
        DownloadRequest::new(self.target(), quality, destination)
    }
}

/// Thumbnail entry as reported by yt-dlp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u64>,
    #[serde(default)]
    pub height: Option<u64>,
}

impl Thumbnail {
    pub fn area(&self) -> u64 {
        self.width.unwrap_or(0) * self.height.unwrap_or(0)
    }
}

/// Audio-relevant subset of a yt-dlp format entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFormat {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio bitrate in kbps
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate in kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl AudioFormat {
    /// No video stream and a real audio stream
    pub fn is_audio_only(&self) -> bool {
        self.vcodec.as_deref() == Some("none")
            && self.acodec.as_deref().map_or(false, |a| a != "none")
    }

    pub fn bitrate(&self) -> f64 {
        self.abr.filter(|b| *b > 0.0).or(self.tbr).unwrap_or(0.0)
    }
}

/// Info dict (or flat entry) emitted by `yt-dlp -J`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub channel_thumbnail: Option<String>,
    #[serde(default)]
    pub playlist_count: Option<u64>,
    #[serde(default)]
    pub n_entries: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` when the dict carries no listing at all
    #[serde(default, deserialize_with = "skip_null_entries")]
    pub entries: Option<Vec<EngineInfo>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<AudioFormat>,
}

impl EngineInfo {
    pub fn entry_count(&self) -> Option<u64> {
        self.playlist_count.or(self.n_entries)
    }

    /// Listed entries that carry an id
    pub fn listed(&self) -> impl Iterator<Item = &EngineInfo> {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.id.as_deref().map_or(false, |id| !id.is_empty()))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn skip_null_entries<'de, D>(deserializer: D) -> Result<Option<Vec<EngineInfo>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<EngineInfo>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|entries| entries.into_iter().flatten().collect()))
}

/// Track metadata handed to the host before download
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
    pub album: String,
    pub album_id: String,
    pub artists: Vec<String>,
    pub artist_id: String,
    pub codec: Codec,
    pub cover_url: String,
    pub release_year: i32,
    pub release_date: Option<String>,
    pub duration: Option<u64>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    /// kHz
    pub sample_rate: f32,
    pub preview_url: Option<String>,
    /// Set when the engine could not describe the video
    pub error: Option<String>,
}

/// Playlist (or album) listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub creator_id: String,
    pub tracks: Vec<String>,
    pub release_year: i32,
    pub cover_url: String,
    pub description: String,
}

/// Channel listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistInfo {
    pub id: String,
    pub name: String,
    pub cover_url: Option<String>,
    pub tracks: Vec<String>,
}
