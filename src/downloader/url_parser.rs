// YouTube URL recognition

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{MediaKind, MediaTarget};

lazy_static! {
    static ref VIDEO_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/)([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/embed/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/v/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/shorts/([A-Za-z0-9_-]{11})").unwrap(),
    ];
    static ref PLAYLIST_RE: Regex = Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").unwrap();
    static ref CHANNEL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"youtube\.com/channel/([A-Za-z0-9_-]+)").unwrap(),
        // legacy custom and user URLs keep their path prefix in the id
        Regex::new(r"youtube\.com/((?:c|user)/[A-Za-z0-9_-]+)").unwrap(),
        Regex::new(r"youtube\.com/@([A-Za-z0-9_.-]+)").unwrap(),
    ];
}

/// Recognise a video, playlist or channel URL.
/// A watch URL that also carries `list=` stays a video.
pub fn parse_youtube_url(url: &str) -> Option<MediaTarget> {
    let url = url.trim();

    let capture = |patterns: &[Regex]| {
        patterns
            .iter()
            .find_map(|re| re.captures(url))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    if let Some(id) = capture(&VIDEO_PATTERNS) {
        return Some(MediaTarget::track(id));
    }

    if let Some(id) = PLAYLIST_RE.captures(url).and_then(|c| c.get(1)) {
        return Some(MediaTarget::playlist(id.as_str()));
    }

    capture(&CHANNEL_PATTERNS).map(|id| MediaTarget {
        kind: MediaKind::Artist,
        id,
    })
}
