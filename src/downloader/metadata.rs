// Metadata helpers - title cleanup, artist parsing, thumbnails
//
// YouTube titles carry uploader-added noise ("(Official Video)", "[HD]",
// hashtags) that is stripped before the title is used as a track name.

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{Thumbnail, TrackInfo};

/// Placeholder yt-dlp reports when an uploader is missing
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Used when the upload date is missing or unparseable
pub const DEFAULT_RELEASE_YEAR: i32 = 2024;

pub const DESCRIPTION_LIMIT: usize = 500;

const TOPIC_SUFFIX: &str = " - Topic";

/// Promo tags removed from titles, case-insensitive. Longer variants first.
const PROMO_TAGS: &[&str] = &[
    // Video
    r"Official Music Video",
    r"Official Lyric Video",
    r"Official Video HD",
    r"Official HD Video",
    r"Official 4K Video",
    r"Official Live Video",
    r"Official Video",
    r"Animated Lyric Video",
    r"Lyric Video",
    r"Lyrics Video",
    r"Music Video",
    r"Video Oficial",
    r"Videoclip Oficial",
    r"Visualizer Video",
    r"Visualizer",
    r"Visualiser",
    r"Pseudo Video",
    r"Official Trailer",
    r"Premiere",
    r"M/V",
    r"Official",
    r"Video",
    // Audio
    r"Official Audio",
    r"Audio Only",
    r"Audio Stream",
    r"Audio Oficial",
    r"Audio Officiel",
    r"Audio",
    r"Cover Art",
    // Quality
    r"Full HD Remastered",
    r"4K Remaster",
    r"HQ Remaster",
    r"Remastered \d+",
    r"Best Quality",
    r"Ultra High Quality",
    r"HQ \+ Lyrics",
    r"HD",
    r"HQ",
    r"60fps",
    r"720P",
    r"1080P",
    r"in 4K",
    r"Stereo",
    // Content
    r"w/ Lyrics",
    r"with lyrics",
    r"Lyrics",
    r"Explicit",
    r"UNCENSORED",
    r"OUT NOW!?",
    r"New Single",
    r"FREE DOWNLOAD",
    r"Official Version",
    r"Full Length",
    r"Original",
    r"Dirty",
    r"Videoclip",
];

lazy_static! {
    static ref HASHTAG_RE: Regex = Regex::new(r"\s*#\w+.*$").unwrap();
    static ref PROMO_TAG_RE: Regex = Regex::new(&format!(
        r"(?i)\s*[(\[|{{./•+-]\s*(?:{})\s*(?:[)\]|}}./•+-]|\s*$)",
        PROMO_TAGS.join("|")
    ))
    .unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref TITLE_ARTIST_RE: Regex =
        Regex::new(r"^(?P<artist>.+?)\s+[-:–]\s+(?P<title>.+)$").unwrap();
    static ref AVATAR_SIZE_RE: Regex = Regex::new(r"=s[1-9]\d+").unwrap();
    static ref BANNER_SIZE_RE: Regex = Regex::new(r"=s0(?:-|$|\?|/)").unwrap();
}

/// Strip promo tags and hashtags from a video title
pub fn clean_title(title: &str) -> String {
    let title = title.replace('–', "-");
    let title = HASHTAG_RE.replace(&title, "");
    let title = PROMO_TAG_RE.replace_all(&title, "");
    WHITESPACE_RE.replace_all(&title, " ").trim().to_string()
}

/// `"Artist - Topic"` auto-generated channels become `"Artist"`
pub fn strip_topic_suffix(uploader: &str) -> &str {
    uploader.strip_suffix(TOPIC_SUFFIX).unwrap_or(uploader)
}

/// Split "Artist - Title" when the artist part relates to the uploader.
/// Returns `(artist, title)`; otherwise the uploader and the title unchanged.
pub fn parse_title_artist(title: &str, uploader: &str) -> (String, String) {
    if let Some(caps) = TITLE_ARTIST_RE.captures(title) {
        let artist = caps["artist"].trim();
        let rest = caps["title"].trim();

        let artist_lower = artist.to_lowercase();
        let uploader_lower = uploader.to_lowercase();
        if artist_lower.contains(&uploader_lower) || uploader_lower.contains(&artist_lower) {
            return (artist.to_string(), rest.to_string());
        }
    }

    (uploader.to_string(), title.to_string())
}

/// First four characters of a `YYYYMMDD` date
pub fn year_from_upload_date(upload_date: Option<&str>) -> Option<String> {
    upload_date
        .filter(|d| d.len() >= 4 && d.is_char_boundary(4))
        .map(|d| d[..4].to_string())
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
}

/// Release year and, for full dates, `YYYY-MM-DD`
pub fn parse_upload_date(upload_date: Option<&str>) -> (i32, Option<String>) {
    let Some(date) = upload_date.filter(|d| d.is_ascii()) else {
        return (DEFAULT_RELEASE_YEAR, None);
    };

    let Some(year) = date.get(..4).and_then(|y| y.parse::<i32>().ok()) else {
        return (DEFAULT_RELEASE_YEAR, None);
    };

    let full = (date.len() == 8).then(|| format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..8]));
    (year, full)
}

/// Description capped to `DESCRIPTION_LIMIT` characters
pub fn truncate_description(description: &str) -> String {
    description.chars().take(DESCRIPTION_LIMIT).collect()
}

/// Largest thumbnail by area; the first one wins ties
pub fn best_thumbnail(thumbnails: &[Thumbnail]) -> Option<&str> {
    thumbnails
        .iter()
        .filter(|t| t.url.is_some())
        .reduce(|best, t| if t.area() > best.area() { t } else { best })
        .and_then(|t| t.url.as_deref())
}

/// Largest thumbnail whose sides differ by at most `tolerance` pixels
pub fn square_thumbnail(thumbnails: &[Thumbnail], tolerance: u64) -> Option<&str> {
    thumbnails
        .iter()
        .filter(|t| t.url.is_some())
        .filter(|t| match (t.width, t.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => w.abs_diff(h) <= tolerance,
            _ => false,
        })
        .reduce(|best, t| if t.area() > best.area() { t } else { best })
        .and_then(|t| t.url.as_deref())
}

/// Sized channel avatar (`=s48`, `=s176`, ...). `=s0` is the full-size banner.
pub fn is_avatar_url(url: &str) -> bool {
    url.contains("yt3.googleusercontent.com")
        && !BANNER_SIZE_RE.is_match(url)
        && AVATAR_SIZE_RE.is_match(url)
}

/// Avatar among channel thumbnails, preferring small squares
pub fn channel_avatar_from_thumbnails(thumbnails: &[Thumbnail]) -> Option<&str> {
    let candidates: Vec<&Thumbnail> = thumbnails
        .iter()
        .filter(|t| t.url.as_deref().map_or(false, is_avatar_url))
        .collect();

    let small_square = candidates
        .iter()
        .filter(|t| {
            let w = t.width.unwrap_or(0);
            let h = t.height.unwrap_or(0);
            w <= 400 && h <= 400 && w.abs_diff(h) <= 24
        })
        .copied()
        .reduce(|best, t| if t.area() > best.area() { t } else { best });

    small_square
        .or_else(|| candidates.first().copied())
        .and_then(|t| t.url.as_deref())
}

/// Static thumbnail every public video has
pub fn video_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// `<artists> - <title>` for a described track; `None` when the lookup failed
pub fn track_file_stem(track: &TrackInfo) -> Option<String> {
    if track.error.is_some() {
        return None;
    }
    let stem = sanitize_file_stem(&format!("{} - {}", track.artists.join(", "), track.name));
    (!stem.is_empty()).then_some(stem)
}

/// File-system safe stem; `%` would be read as an output template field
pub fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}
