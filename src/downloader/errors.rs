// Error types for the YouTube adapter

use std::fmt;
use std::path::Path;

use thiserror::Error;

use super::diagnostics::{analyze_error, FailureReason};
use super::models::Codec;

/// Error taxonomy exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EngineUnavailable,
    TranscoderMissing,
    TargetUnavailable,
    AuthRequired,
    RateLimited,
    ChallengeUnsolved,
    SearchFailed,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EngineUnavailable => "EngineUnavailable",
            Self::TranscoderMissing => "TranscoderMissing",
            Self::TargetUnavailable => "TargetUnavailable",
            Self::AuthRequired => "AuthRequired",
            Self::RateLimited => "RateLimited",
            Self::ChallengeUnsolved => "ChallengeUnsolved",
            Self::SearchFailed => "SearchFailed",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp binary missing or not runnable
    #[error("yt-dlp is not available: {0}")]
    EngineUnavailable(String),

    /// FFmpeg missing for a request that needs transcoding
    #[error("FFmpeg not found: {0}")]
    TranscoderMissing(String),

    /// Removed, region-locked or otherwise inaccessible
    #[error("Content unavailable: {0}")]
    TargetUnavailable(String),

    /// Age-restricted or login-gated without valid cookies
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Rate limited by YouTube: {0}")]
    RateLimited(String),

    /// Signature / n-challenge solving failed
    #[error("YouTube challenge could not be solved: {0}")]
    ChallengeUnsolved(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// No stream for this codec; the adapter moves on to the next fallback
    #[error("No {0} audio stream available")]
    FormatUnavailable(Codec),

    #[error("Not a YouTube video, playlist or channel: {0}")]
    InvalidTarget(String),

    #[error("yt-dlp timed out after {0}s")]
    Timeout(u64),

    /// Engine failure the classifier did not recognise
    #[error("yt-dlp failed (exit code {code:?}): {message}")]
    Engine { code: Option<i32>, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Unreadable or malformed settings file
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Classify a failed engine run from its stderr and exit code.
    /// `codec` is the codec being attempted, if any.
    pub fn from_engine_output(stderr: &str, code: Option<i32>, codec: Option<Codec>) -> Self {
        let diagnostics = analyze_error(stderr);
        let context = diagnostics
            .context
            .unwrap_or_else(|| diagnostics.reason.description().to_string());

        match diagnostics.reason {
            FailureReason::TranscoderMissing => Self::TranscoderMissing(context),
            FailureReason::ChallengeUnsolved => Self::ChallengeUnsolved(context),
            FailureReason::AuthRequired => Self::AuthRequired(context),
            FailureReason::RateLimited => Self::RateLimited(context),
            FailureReason::TargetUnavailable => Self::TargetUnavailable(context),
            FailureReason::FormatUnavailable => match codec {
                Some(codec) => Self::FormatUnavailable(codec),
                None => Self::TargetUnavailable(context),
            },
            FailureReason::NetworkTimeout | FailureReason::Unknown => Self::Engine {
                code,
                message: context,
            },
        }
    }

    /// Search calls report every engine-side failure as `SearchFailed`
    pub fn into_search_failure(self) -> Self {
        match self {
            Self::EngineUnavailable(_) | Self::SearchFailed(_) => self,
            other => Self::SearchFailed(other.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Self::TranscoderMissing(_) => ErrorKind::TranscoderMissing,
            Self::TargetUnavailable(_) | Self::FormatUnavailable(_) => ErrorKind::TargetUnavailable,
            Self::AuthRequired(_) => ErrorKind::AuthRequired,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ChallengeUnsolved(_) => ErrorKind::ChallengeUnsolved,
            Self::SearchFailed(_) => ErrorKind::SearchFailed,
            Self::InvalidTarget(_)
            | Self::Timeout(_)
            | Self::Engine { .. }
            | Self::Parse(_)
            | Self::Config(_)
            | Self::Io(_) => ErrorKind::Other,
        }
    }

    /// User-facing hint for the error kind
    pub fn remediation(&self, cookies_path: &Path) -> Option<String> {
        let hint = match self.kind() {
            ErrorKind::EngineUnavailable => {
                "Install or upgrade yt-dlp (pip install -U yt-dlp), or set `ytdlp_path` in the youtube module settings.".to_string()
            }
            ErrorKind::TranscoderMissing => {
                "Install FFmpeg, or set `ffmpeg_path` under global.advanced in config/settings.json.".to_string()
            }
            ErrorKind::TargetUnavailable => format!(
                "The content is removed, private or region-locked. Retry manually with cookies at {}.",
                cookies_path.display()
            ),
            ErrorKind::AuthRequired => format!(
                "Export cookies from a logged-in browser (Netscape cookies.txt) to {}.",
                cookies_path.display()
            ),
            ErrorKind::RateLimited => {
                "YouTube is throttling requests. Wait a while, then retry; consider raising download_pause_seconds.".to_string()
            }
            ErrorKind::ChallengeUnsolved => {
                "Upgrade yt-dlp and install a JS runtime (deno) so YouTube challenges can be solved.".to_string()
            }
            ErrorKind::SearchFailed => {
                "Check your network connection and yt-dlp version, then search again.".to_string()
            }
            ErrorKind::Other => match self {
                Self::Timeout(_) => {
                    "Raise engine_timeout_seconds in the youtube module settings or retry later.".to_string()
                }
                Self::InvalidTarget(_) => {
                    "Pass a youtube.com / youtu.be video, playlist or channel URL.".to_string()
                }
                Self::Config(_) => "Fix or remove config/settings.json; defaults apply when it is absent.".to_string(),
                _ => return None,
            },
        };
        Some(hint)
    }
}
