// Search - query construction and result mapping per search kind

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use super::metadata::{
    best_thumbnail, square_thumbnail, video_thumbnail_url, year_from_upload_date, UNKNOWN_ARTIST,
};
use super::models::{EngineInfo, MediaKind, MediaTarget, SearchResult};
use super::traits::InfoQuery;

const RESULTS_URL: &str = "https://www.youtube.com/results";

/// Results-page filter that restricts hits to playlists
const PLAYLIST_FILTER: &str = "EgIQAw%253D%253D";

/// Channel avatars are near-square; video thumbnails are 16:9 or 4:3
const AVATAR_SQUARE_TOLERANCE: u64 = 16;

/// What a search looks for. `Artist` searches channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Track,
    Playlist,
    Album,
    Artist,
}

impl SearchKind {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Self::Track => MediaKind::Track,
            Self::Playlist => MediaKind::Playlist,
            Self::Album => MediaKind::Album,
            Self::Artist => MediaKind::Artist,
        }
    }

    /// Flat engine query for `query`. Channel search over-fetches videos
    /// because several hits usually come from the same channel.
    pub fn engine_query(&self, query: &str, limit: usize) -> InfoQuery {
        let (url, fetched) = match self {
            Self::Track => (format!("ytsearch{}:{}", limit, query), limit),
            Self::Playlist | Self::Album => (playlist_results_url(query), limit),
            Self::Artist => (format!("ytsearch{}:{}", limit * 2, query), limit * 2),
        };
        InfoQuery::flat(url).with_items(format!("1-{}", fetched))
    }

    /// Map engine entries to results in relevance order
    pub fn map_entries(&self, info: &EngineInfo, limit: usize) -> Vec<SearchResult> {
        match self {
            Self::Track => info.listed().map(map_track).collect(),
            Self::Playlist => info.listed().filter_map(map_playlist).collect(),
            Self::Album => info.listed().map(map_album).collect(),
            Self::Artist => map_channels(info.listed(), limit),
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.media_kind(), f)
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "track" => Ok(Self::Track),
            "playlist" => Ok(Self::Playlist),
            "album" => Ok(Self::Album),
            "artist" => Ok(Self::Artist),
            other => Err(format!(
                "unknown search kind '{}' (expected track, playlist, artist or album)",
                other
            )),
        }
    }
}

/// `https://www.youtube.com/results?search_query=<q>&sp=<playlist filter>`
fn playlist_results_url(query: &str) -> String {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .append_pair("search_query", query)
        .finish();
    // The filter is already percent-encoded twice, as YouTube expects
    format!("{}?{}&sp={}", RESULTS_URL, encoded, PLAYLIST_FILTER)
}

fn entry_id(entry: &EngineInfo) -> String {
    entry.id.clone().unwrap_or_default()
}

fn duration_secs(entry: &EngineInfo) -> Option<u64> {
    entry.duration.filter(|d| *d >= 0.0).map(|d| d.round() as u64)
}

/// Uploader, then channel, then title
fn owner_name(entry: &EngineInfo) -> String {
    [&entry.uploader, &entry.channel, &entry.title]
        .into_iter()
        .flatten()
        .find(|name| !name.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string())
}

/// Thumbnail field, then the largest listed thumbnail, then the channel thumbnail
fn entry_image(entry: &EngineInfo) -> Option<String> {
    entry
        .thumbnail
        .clone()
        .or_else(|| best_thumbnail(&entry.thumbnails).map(str::to_string))
        .or_else(|| entry.channel_thumbnail.clone())
}

fn base_result(entry: &EngineInfo, kind: MediaKind) -> SearchResult {
    let target = MediaTarget {
        kind,
        id: entry_id(entry),
    };
    SearchResult {
        url: target.url(),
        id: target.id,
        kind,
        name: entry.title.clone().unwrap_or_else(|| "Unknown".to_string()),
        artists: vec![owner_name(entry)],
        duration: duration_secs(entry),
        year: year_from_upload_date(entry.upload_date.as_deref()),
        additional: None,
        image_url: entry_image(entry),
    }
}

fn map_track(entry: &EngineInfo) -> SearchResult {
    let mut result = base_result(entry, MediaKind::Track);
    if result.image_url.is_none() {
        result.image_url = Some(video_thumbnail_url(&result.id));
    }
    result
}

fn map_album(entry: &EngineInfo) -> SearchResult {
    base_result(entry, MediaKind::Album)
}

/// `None` for playlists that report zero entries
fn map_playlist(entry: &EngineInfo) -> Option<SearchResult> {
    let count = entry.entry_count();
    if count == Some(0) {
        return None;
    }

    let mut result = base_result(entry, MediaKind::Playlist);
    // Flat search rarely names playlist owners; leave the column blank
    result.artists.retain(|name| name.trim() != UNKNOWN_ARTIST);
    result.additional = count.map(|n| {
        vec![if n == 1 {
            "1 track".to_string()
        } else {
            format!("{} tracks", n)
        }]
    });
    Some(result)
}

/// One result per channel, first occurrence wins
fn map_channels<'a>(
    entries: impl Iterator<Item = &'a EngineInfo>,
    limit: usize,
) -> Vec<SearchResult> {
    let mut seen = HashSet::new();

    entries
        .filter_map(|entry| {
            let channel_id = entry.channel_id.as_deref().filter(|id| !id.is_empty())?;
            seen.insert(channel_id.to_string()).then_some((entry, channel_id))
        })
        .take(limit)
        .map(|(entry, channel_id)| {
            let target = MediaTarget::channel(channel_id);
            let channel_name = [&entry.channel, &entry.uploader]
                .into_iter()
                .flatten()
                .find(|name| !name.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

            SearchResult {
                url: target.url(),
                id: target.id,
                kind: MediaKind::Artist,
                // Channel name is shown as the artist only
                name: String::new(),
                artists: vec![channel_name],
                duration: None,
                year: None,
                additional: None,
                image_url: entry
                    .channel_thumbnail
                    .clone()
                    .or_else(|| {
                        square_thumbnail(&entry.thumbnails, AVATAR_SQUARE_TOLERANCE)
                            .map(str::to_string)
                    }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(json: &str) -> EngineInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_engine_queries() {
        let track = SearchKind::Track.engine_query("never gonna give you up", 10);
        assert_eq!(track.url, "ytsearch10:never gonna give you up");
        assert_eq!(track.playlist_items.as_deref(), Some("1-10"));
        assert!(track.flat);

        let artist = SearchKind::Artist.engine_query("rick astley", 5);
        assert_eq!(artist.url, "ytsearch10:rick astley");
        assert_eq!(artist.playlist_items.as_deref(), Some("1-10"));

        let album = SearchKind::Album.engine_query("80s hits & more", 10);
        assert_eq!(
            album.url,
            "https://www.youtube.com/results?search_query=80s+hits+%26+more&sp=EgIQAw%253D%253D"
        );
    }

    #[test]
    fn test_track_results() {
        let info = entries(
            r#"{"entries": [
                {"id": "dQw4w9WgXcQ", "title": "Never Gonna Give You Up",
                 "uploader": "Rick Astley", "duration": 212.4, "upload_date": "20091025"},
                {"id": "yPYZpwSpKmA", "title": "Together Forever", "channel": "Rick Astley",
                 "thumbnails": [{"url": "s", "width": 120, "height": 90},
                                {"url": "l", "width": 480, "height": 360}]}
            ]}"#,
        );

        let results = SearchKind::Track.map_entries(&info, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, MediaKind::Track);
        assert_eq!(results[0].artists, vec!["Rick Astley"]);
        assert_eq!(results[0].duration, Some(212));
        assert_eq!(results[0].year.as_deref(), Some("2009"));
        assert_eq!(
            results[0].image_url.as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
        assert_eq!(results[1].image_url.as_deref(), Some("l"));
        assert_eq!(results[1].url, "https://www.youtube.com/watch?v=yPYZpwSpKmA");
    }

    #[test]
    fn test_playlist_results() {
        let info = entries(
            r#"{"entries": [
                {"id": "PLempty", "title": "Empty", "playlist_count": 0},
                {"id": "PLone", "title": "Single", "playlist_count": 1, "uploader": "Unknown"},
                {"id": "PLmany", "title": "Hits", "n_entries": 42, "channel": "Rick Astley"},
                {"id": "PLunknown", "title": "No count"}
            ]}"#,
        );

        let results = SearchKind::Playlist.map_entries(&info, 10);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["PLone", "PLmany", "PLunknown"]);

        assert!(results[0].artists.is_empty());
        assert_eq!(results[0].additional, Some(vec!["1 track".to_string()]));
        assert_eq!(results[1].additional, Some(vec!["42 tracks".to_string()]));
        assert_eq!(results[1].artists, vec!["Rick Astley"]);
        assert_eq!(results[2].additional, None);
        assert_eq!(results[2].image_url, None);
    }

    #[test]
    fn test_artist_results_dedup_by_channel() {
        let info = entries(
            r#"{"entries": [
                {"id": "v1", "channel_id": "UCuAXFkgsw1L7xaCfnd5JJOw", "channel": "Rick Astley",
                 "thumbnails": [{"url": "video", "width": 336, "height": 188},
                                {"url": "avatar", "width": 88, "height": 88}]},
                {"id": "v2", "channel_id": "UCuAXFkgsw1L7xaCfnd5JJOw", "channel": "Rick Astley"},
                {"id": "v3"},
                {"id": "v4", "channel_id": "UC38IQsAvIsxxjztdMZQtwHA", "uploader": "RickAstleyVEVO"},
                {"id": "v5", "channel_id": "UCxxxxxxxxxxxxxxxxxxxxxx", "uploader": "Other"}
            ]}"#,
        );

        let results = SearchKind::Artist.map_entries(&info, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "UCuAXFkgsw1L7xaCfnd5JJOw");
        assert_eq!(results[0].kind, MediaKind::Artist);
        assert_eq!(results[0].name, "");
        assert_eq!(results[0].artists, vec!["Rick Astley"]);
        assert_eq!(results[0].image_url.as_deref(), Some("avatar"));
        assert_eq!(results[0].url, "https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw");
        assert_eq!(results[1].artists, vec!["RickAstleyVEVO"]);
        assert_eq!(results[1].image_url, None);
    }

    #[test]
    fn test_search_kind_parsing() {
        assert_eq!("Artist".parse::<SearchKind>(), Ok(SearchKind::Artist));
        assert!("channel".parse::<SearchKind>().is_err());
    }
}
