// Failure diagnostics - classifies yt-dlp error output
//
// Maps engine stderr onto the adapter's failure reasons:
// - challenge solving (signature / n-challenge / EJS)
// - authentication (age gate, private, members, bot check)
// - throttling, unavailable targets, missing formats, missing FFmpeg

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// A 429 status, not any id or byte count containing the digits
    static ref HTTP_429_RE: Regex = Regex::new(r"http error 429\b|\b429 too many requests").unwrap();
}

/// Why the engine refused or failed a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// FFmpeg/ffprobe missing for a post-processing step
    TranscoderMissing,

    /// Signature or n-challenge could not be solved
    ChallengeUnsolved,

    /// Age gate, private video, members-only or "not a bot" check
    AuthRequired,

    /// HTTP 429 or explicit throttling
    RateLimited,

    /// Removed, region-locked, DRM or otherwise inaccessible
    TargetUnavailable,

    /// The requested format selector matched nothing
    FormatUnavailable,

    /// Socket timeouts and unreachable hosts
    NetworkTimeout,

    /// Engine failed for a reason not recognised here
    Unknown,
}

impl FailureReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::TranscoderMissing => "FFmpeg not found",
            Self::ChallengeUnsolved => "YouTube challenge could not be solved",
            Self::AuthRequired => "Authentication required",
            Self::RateLimited => "Rate limited by YouTube",
            Self::TargetUnavailable => "Content unavailable",
            Self::FormatUnavailable => "Requested format not available",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Unknown engine failure",
        }
    }
}

/// Classification result with the most useful line of the engine output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDiagnostics {
    pub reason: FailureReason,
    /// First `ERROR:` line (or other telling line) of the output
    pub context: Option<String>,
}

/// Lines yt-dlp prefixes with `ERROR:`
fn error_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.to_lowercase().starts_with("error:"))
        .collect()
}

/// Analyze engine output and return the failure reason.
/// Only `ERROR:` lines are classified when there are any.
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    if error.trim().is_empty() {
        return None;
    }

    let errors = error_lines(error);
    let lower = if errors.is_empty() {
        error.to_lowercase()
    } else {
        errors.join("\n").to_lowercase()
    };

    // Checked most specific first

    if lower.contains("ffmpeg not found")
        || lower.contains("ffprobe and ffmpeg not found")
        || lower.contains("ffmpeg is not installed")
    {
        return Some(FailureReason::TranscoderMissing);
    }

    if lower.contains("requested format is not available")
        || lower.contains("no video formats found")
        || lower.contains("format not available")
    {
        return Some(FailureReason::FormatUnavailable);
    }

    if lower.contains("sign in to confirm your age")
        || lower.contains("age-restricted")
        || lower.contains("inappropriate for some users")
        || lower.contains("sign in to confirm you")
        || lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("members-only")
        || lower.contains("members only")
        || lower.contains("join this channel")
        || lower.contains("use --cookies")
        || lower.contains("login required")
    {
        return Some(FailureReason::AuthRequired);
    }

    if HTTP_429_RE.is_match(&lower)
        || lower.contains("too many requests")
        || lower.contains("rate-limited")
        || lower.contains("rate limit")
    {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("video unavailable")
        || lower.contains("video is unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
        || lower.contains("available in your country")
        || lower.contains("blocked it in your country")
        || lower.contains("does not exist")
        || lower.contains("this channel does not")
        || lower.contains("drm protected")
        || lower.contains("http error 404")
    {
        return Some(FailureReason::TargetUnavailable);
    }

    if lower.contains("n challenge")
        || lower.contains("nsig extraction failed")
        || lower.contains("signature extraction failed")
        || lower.contains("signature solving failed")
        || lower.contains("challenge solving failed")
        || lower.contains("unable to extract nsig")
    {
        return Some(FailureReason::ChallengeUnsolved);
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
        || lower.contains("temporary failure in name resolution")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    Some(FailureReason::Unknown)
}

/// Full diagnostic analysis of engine output
pub fn analyze_error(error: &str) -> FailureDiagnostics {
    let reason = diagnose_error(error).unwrap_or(FailureReason::Unknown);

    let context = error_lines(error)
        .first()
        .copied()
        .or_else(|| error.lines().map(str::trim).find(|line| !line.is_empty()))
        .map(|s| s.to_string());

    FailureDiagnostics { reason, context }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_gate_detection() {
        let error = "ERROR: [youtube] abc: Sign in to confirm your age. This video may be inappropriate for some users.";
        assert_eq!(diagnose_error(error), Some(FailureReason::AuthRequired));
    }

    #[test]
    fn test_bot_check_needs_auth() {
        let error = "ERROR: [youtube] abc: Sign in to confirm you're not a bot. Use --cookies-from-browser or --cookies";
        assert_eq!(diagnose_error(error), Some(FailureReason::AuthRequired));
    }

    #[test]
    fn test_rate_limit_detection() {
        let error = "ERROR: unable to download video data: HTTP Error 429: Too Many Requests";
        assert_eq!(diagnose_error(error), Some(FailureReason::RateLimited));
    }

    #[test]
    fn test_challenge_detection() {
        let error = "WARNING: [youtube] abc: n challenge solving failed: Some formats may be missing.";
        assert_eq!(diagnose_error(error), Some(FailureReason::ChallengeUnsolved));
    }

    #[test]
    fn test_unavailable_detection() {
        let error = "ERROR: [youtube] abc: Video unavailable. This video has been removed by the uploader";
        assert_eq!(diagnose_error(error), Some(FailureReason::TargetUnavailable));
    }

    #[test]
    fn test_geo_detection() {
        let error = "ERROR: The uploader has not made this video available in your country";
        assert_eq!(diagnose_error(error), Some(FailureReason::TargetUnavailable));
    }

    #[test]
    fn test_format_detection() {
        let error = "ERROR: [youtube] abc: Requested format is not available. Use --list-formats for a list of available formats";
        assert_eq!(diagnose_error(error), Some(FailureReason::FormatUnavailable));
    }

    #[test]
    fn test_ffmpeg_detection() {
        let error = "ERROR: Postprocessing: ffprobe and ffmpeg not found. Please install or provide the path using --ffmpeg-location";
        assert_eq!(diagnose_error(error), Some(FailureReason::TranscoderMissing));
    }

    #[test]
    fn test_timeout_detection() {
        let error = "ERROR: Unable to download webpage: The read operation timed out";
        assert_eq!(diagnose_error(error), Some(FailureReason::NetworkTimeout));
    }

    #[test]
    fn test_empty_output_has_no_reason() {
        assert_eq!(diagnose_error("   \n"), None);
        assert_eq!(diagnose_error("something odd"), Some(FailureReason::Unknown));
    }

    #[test]
    fn test_analyze_picks_error_line() {
        let output = "WARNING: [youtube] falling back\nERROR: [youtube] abc: Private video\n";
        let diag = analyze_error(output);
        assert_eq!(diag.reason, FailureReason::AuthRequired);
        assert_eq!(diag.context.as_deref(), Some("ERROR: [youtube] abc: Private video"));
    }

    const NO_JS_RUNTIME: &str = "WARNING: [youtube] No supported JavaScript runtime could be found. \
        YouTube extraction without a JS runtime has been deprecated, and some formats may be missing.";

    #[test]
    fn test_runtime_warning_does_not_mask_error_line() {
        let cases = [
            ("ERROR: [youtube] abcdefghijk: Private video. Sign in if you've been granted access to this video", FailureReason::AuthRequired),
            ("ERROR: [youtube] abcdefghijk: Video unavailable. This video is no longer available", FailureReason::TargetUnavailable),
            ("ERROR: unable to download video data: HTTP Error 429: Too Many Requests", FailureReason::RateLimited),
            ("ERROR: [youtube] abcdefghijk: The uploader has not made this video available in your country", FailureReason::TargetUnavailable),
            ("ERROR: [youtube] abcdefghijk: Requested format is not available. Use --list-formats for a list of available formats", FailureReason::FormatUnavailable),
            ("ERROR: [youtube] abcdefghijk: Sign in to confirm you're not a bot", FailureReason::AuthRequired),
        ];

        for (error_line, expected) in cases {
            let output = format!("{}\n{}\n", NO_JS_RUNTIME, error_line);
            assert_eq!(diagnose_error(&output), Some(expected), "{error_line}");
        }
    }

    #[test]
    fn test_challenge_warning_alone_is_challenge() {
        let output = format!(
            "{}\nWARNING: [youtube] abcdefghijk: nsig extraction failed: Some formats may be missing",
            NO_JS_RUNTIME
        );
        assert_eq!(diagnose_error(&output), Some(FailureReason::ChallengeUnsolved));
    }

    #[test]
    fn test_429_inside_video_id_is_not_rate_limit() {
        let error = "ERROR: [youtube] ab429cdEfgh: Video unavailable. This video has been removed by the uploader";
        assert_eq!(diagnose_error(error), Some(FailureReason::TargetUnavailable));

        let error = "ERROR: [youtube] ab429cdEfgh: Downloaded 4290 bytes, connection reset";
        assert_eq!(diagnose_error(error), Some(FailureReason::Unknown));
    }

    #[test]
    fn test_warning_lines_ignored_when_error_present() {
        let output = "WARNING: [youtube] abc: HTTP Error 429 on player request, retrying\n\
                      ERROR: [youtube] abc: Video unavailable";
        assert_eq!(diagnose_error(output), Some(FailureReason::TargetUnavailable));
    }
}
