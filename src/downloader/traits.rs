// Media engine capability trait

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{Codec, EngineInfo};

/// One strict download attempt for a single codec
#[derive(Debug, Clone)]
pub struct FetchJob<'a> {
    pub url: String,
    pub codec: Codec,
    /// Directory the file is written into
    pub destination: &'a Path,
    /// File name without extension
    pub file_stem: &'a str,
    /// Staged copy of the cookie jar, if one is configured and readable
    pub cookies: Option<&'a Path>,
    /// FFmpeg location; `None` means no transcoding is possible
    pub transcoder: Option<&'a Path>,
}

impl FetchJob<'_> {
    /// `<destination>/<stem>.%(ext)s`
    pub fn output_template(&self) -> PathBuf {
        self.destination.join(format!("{}.%(ext)s", self.file_stem))
    }
}

/// Metadata extraction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoQuery {
    /// URL or `ytsearchN:` expression
    pub url: String,
    /// List playlist entries without resolving each one
    pub flat: bool,
    /// yt-dlp `--playlist-items` value
    pub playlist_items: Option<String>,
}

impl InfoQuery {
    pub fn full(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            flat: false,
            playlist_items: None,
        }
    }

    pub fn flat(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            flat: true,
            playlist_items: None,
        }
    }

    pub fn with_items(mut self, items: impl Into<String>) -> Self {
        self.playlist_items = Some(items.into());
        self
    }
}

/// External download engine (yt-dlp in production, fakes in tests)
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Download one audio file in `job.codec`, returning the produced path.
    /// Must report `DownloadError::FormatUnavailable` when no stream for the codec exists.
    async fn fetch(&self, job: &FetchJob<'_>) -> Result<PathBuf, DownloadError>;

    /// Extract an info dict for a video, playlist, channel or search expression
    async fn extract(
        &self,
        query: &InfoQuery,
        cookies: Option<&Path>,
    ) -> Result<EngineInfo, DownloadError>;
}
