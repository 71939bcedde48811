// Orchestrator with codec fallback logic
//
// YouTubeAdapter turns host requests into engine calls: one strict fetch
// per codec in the quality chain, gated by the pacer, with cookies staged
// per invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::ModuleConfig;

use super::cookies::CookieJar;
use super::errors::DownloadError;
use super::format_selector::FormatSelector;
use super::metadata::{
    best_thumbnail, channel_avatar_from_thumbnails, clean_title, is_avatar_url,
    parse_title_artist, parse_upload_date, strip_topic_suffix, track_file_stem,
    truncate_description, DEFAULT_RELEASE_YEAR, UNKNOWN_ARTIST,
};
use super::models::{
    ArtistInfo, Codec, DownloadOutcome, DownloadRequest, DownloadedTrack, EngineInfo, MediaKind,
    MediaTarget, PlaylistInfo, Quality, RequestState, SearchResult, TrackInfo,
};
use super::pacing::Pacer;
use super::search::SearchKind;
use super::traits::{FetchJob, InfoQuery, MediaEngine};

/// Channel listings stop after this many uploads
const ARTIST_TRACK_LIMIT: usize = 50;

const ALBUM_NAME: &str = "YouTube";
const ALBUM_ID: &str = "youtube";
const GENRE: &str = "YouTube";

/// YouTube serves Opus, AAC and MP3 output at 48 kHz
const SAMPLE_RATE_KHZ: f32 = 48.0;

pub struct YouTubeAdapter {
    engine: Arc<dyn MediaEngine>,
    config: Arc<ModuleConfig>,
    cookies: CookieJar,
    transcoder: Option<PathBuf>,
    pacer: Pacer,
}

impl YouTubeAdapter {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        config: ModuleConfig,
        transcoder: Option<PathBuf>,
    ) -> Self {
        let pacer = Pacer::new(config.pacing_policy());
        Self {
            engine,
            cookies: config.cookie_jar(),
            config: Arc::new(config),
            transcoder,
            pacer,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn transcoder(&self) -> Option<&Path> {
        self.transcoder.as_deref()
    }

    /// Download one track, walking the codec chain for its quality.
    /// Only `FormatUnavailable` moves on to the next codec; every other
    /// failure ends the request.
    #[instrument(skip(self, request), fields(media = %request.target, quality = %request.quality))]
    pub async fn resolve_and_download(&self, request: &DownloadRequest) -> DownloadOutcome {
        let plan = self.prepare(request)?;

        let _permit = self.pacer.acquire().await?;
        self.run_plan(request, &plan).await
    }

    /// Look the track up and download it under one pacer turn. Unless the
    /// request names the file, it is named `<artists> - <title>`.
    #[instrument(skip(self, request), fields(media = %request.target, quality = %request.quality))]
    pub async fn describe_and_download(&self, request: DownloadRequest) -> DownloadOutcome {
        let plan = self.prepare(&request)?;

        let _permit = self.pacer.acquire().await?;
        let request = if request.file_stem.is_some() {
            request
        } else {
            let track = self
                .get_track_info(&request.target.id, request.quality, None)
                .await;
            let stem = track_file_stem(&track);
            request.with_file_stem(stem)
        };
        self.run_plan(&request, &plan).await
    }

    /// Validate a request and work out its codec plan before it takes a
    /// pacer turn
    fn prepare(&self, request: &DownloadRequest) -> Result<Vec<Codec>, DownloadError> {
        log_state(&request.target, RequestState::Issued);

        if request.target.kind.is_collection() {
            log_state(&request.target, RequestState::Failed);
            return Err(DownloadError::InvalidTarget(format!(
                "{} is a collection; expand it into tracks first",
                request.target
            )));
        }

        let plan = FormatSelector::plan(request.quality, request.format_override);
        debug!("Codec plan: {:?}", plan);

        if let Some(err) = plan.first().and_then(|&codec| self.transcoder_missing(codec)) {
            log_state(&request.target, RequestState::Failed);
            warn!(kind = %err.kind(), "{}", err);
            return Err(err);
        }
        Ok(plan)
    }

    async fn run_plan(&self, request: &DownloadRequest, plan: &[Codec]) -> DownloadOutcome {
        log_state(&request.target, RequestState::InProgress);

        let result = self.fetch_with_fallback(request, plan).await;
        match &result {
            Ok(track) => {
                log_state(&request.target, RequestState::Succeeded);
                if track.fell_back() {
                    info!(
                        "{} not available, downloaded as {}",
                        plan[0], track.codec
                    );
                }
            }
            Err(e) => {
                log_state(&request.target, RequestState::Failed);
                warn!(kind = %e.kind(), "{}", e);
            }
        }
        result
    }

    fn transcoder_missing(&self, codec: Codec) -> Option<DownloadError> {
        (codec.requires_transcoder() && self.transcoder.is_none()).then(|| {
            DownloadError::TranscoderMissing(format!("{} output requires FFmpeg", codec))
        })
    }

    async fn fetch_with_fallback(
        &self,
        request: &DownloadRequest,
        plan: &[Codec],
    ) -> DownloadOutcome {
        let url = request.target.url();
        let mut attempted = Vec::with_capacity(plan.len());
        let mut last_error = None;

        for &codec in plan {
            if let Some(err) = self.transcoder_missing(codec) {
                return Err(err);
            }

            attempted.push(codec);
            // Fresh copy per invocation; the engine may rewrite it
            let staged = self.cookies.stage();
            let job = FetchJob {
                url: url.clone(),
                codec,
                destination: &request.destination,
                file_stem: request.file_stem(),
                cookies: staged.as_ref().map(|c| c.path()),
                transcoder: self.transcoder.as_deref(),
            };

            debug!("Trying {} with {}", codec, self.engine.name());
            match self.engine.fetch(&job).await {
                Ok(path) => {
                    let produced = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .and_then(Codec::from_extension)
                        .unwrap_or(codec);
                    info!(path = %path.display(), codec = %produced, "download complete");
                    return Ok(DownloadedTrack {
                        target: request.target.clone(),
                        path,
                        codec: produced,
                        attempted,
                    });
                }
                Err(DownloadError::FormatUnavailable(unavailable)) => {
                    debug!("{} stream unavailable, trying next codec", unavailable);
                    last_error = Some(DownloadError::FormatUnavailable(unavailable));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DownloadError::TargetUnavailable(format!("no audio stream for {}", request.target))
        }))
    }

    /// Search for tracks, playlists, albums (as playlists) or channels.
    /// No matches is an empty list, not an error.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, DownloadError> {
        let limit = limit.unwrap_or(self.config.search_limit).max(1);
        let info = self
            .extract(&kind.engine_query(query, limit))
            .await
            .map_err(DownloadError::into_search_failure)?;

        let mut results = kind.map_entries(&info, limit);
        results.truncate(limit);

        for result in results.iter_mut().filter(|r| r.image_url.is_none()) {
            result.image_url = match result.kind {
                MediaKind::Artist => self.get_channel_thumbnail(&result.id).await,
                MediaKind::Playlist | MediaKind::Album => self.playlist_cover(&result.id).await,
                MediaKind::Track => None,
            };
        }

        debug!("{} {} results", results.len(), kind);
        Ok(results)
    }

    /// Describe a video. Engine failures are reported in `TrackInfo::error`.
    /// `channel_name` stands in for a missing uploader.
    #[instrument(skip(self))]
    pub async fn get_track_info(
        &self,
        id: &str,
        quality: Quality,
        channel_name: Option<&str>,
    ) -> TrackInfo {
        let query = InfoQuery::full(MediaTarget::track(id).url());
        match self.extract(&query).await {
            Ok(info) => track_info_from(id, quality, &info, channel_name),
            Err(e) => {
                warn!("Failed to get video information for {}: {}", id, e);
                unavailable_track_info(id, quality, e.to_string())
            }
        }
    }

    /// Playlist listing. A `UC…` channel id is tried as its `UU…` uploads playlist first.
    #[instrument(skip(self))]
    pub async fn get_playlist_info(&self, id: &str) -> Result<PlaylistInfo, DownloadError> {
        let uploads = match id.strip_prefix("UC") {
            Some(rest) => match self.playlist_listing(&format!("UU{}", rest)).await {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!("Uploads playlist for {} unavailable: {}", id, e);
                    None
                }
            },
            None => None,
        };

        let info = match uploads {
            Some(info) => info,
            None => self.playlist_listing(id).await?,
        };

        Ok(playlist_info_from(id, &info))
    }

    /// YouTube has no albums; album ids are playlist ids
    pub async fn get_album_info(&self, id: &str) -> Result<PlaylistInfo, DownloadError> {
        self.get_playlist_info(id).await
    }

    /// Channel name, avatar and its most recent uploads
    #[instrument(skip(self))]
    pub async fn get_artist_info(&self, id: &str) -> Result<ArtistInfo, DownloadError> {
        let url = format!("{}/videos", MediaTarget::channel(id).url());
        let query = InfoQuery::flat(url).with_items(format!("1-{}", ARTIST_TRACK_LIMIT));
        let info = self.extract(&query).await?;

        let name = [&info.channel, &info.uploader, &info.title]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Ok(ArtistInfo {
            id: id.to_string(),
            name,
            cover_url: channel_avatar(&info),
            tracks: info.listed().filter_map(|e| e.id.clone()).collect(),
        })
    }

    /// Channel avatar, never the full-size banner
    pub async fn get_channel_thumbnail(&self, channel_id: &str) -> Option<String> {
        // Item 0 returns channel metadata only, where the thumbnail is the avatar
        let query = InfoQuery::flat(MediaTarget::channel(channel_id).url()).with_items("0");
        match self.extract(&query).await {
            Ok(info) => channel_avatar(&info).or_else(|| {
                info.thumbnail
                    .clone()
                    .filter(|url| is_avatar_url(url))
            }),
            Err(e) => {
                debug!("Channel thumbnail for {} unavailable: {}", channel_id, e);
                None
            }
        }
    }

    /// Per-track requests for a target, in listing order
    #[instrument(skip(self, destination))]
    pub async fn expand(
        &self,
        target: &MediaTarget,
        quality: Quality,
        destination: &Path,
    ) -> Result<Vec<DownloadRequest>, DownloadError> {
        let track_ids = match target.kind {
            MediaKind::Track => vec![target.id.clone()],
            MediaKind::Playlist => self.get_playlist_info(&target.id).await?.tracks,
            MediaKind::Album => self.get_album_info(&target.id).await?.tracks,
            MediaKind::Artist => self.get_artist_info(&target.id).await?.tracks,
        };

        debug!("{} expands to {} tracks", target, track_ids.len());
        Ok(track_ids
            .into_iter()
            .map(|id| DownloadRequest::new(MediaTarget::track(id), quality, destination))
            .collect())
    }

    /// Direct URL of a low-bitrate audio stream for preview playback
    #[instrument(skip(self))]
    pub async fn get_preview_stream_url(&self, id: &str) -> Option<String> {
        let query = InfoQuery::full(MediaTarget::track(id).url());
        match self.extract(&query).await {
            Ok(info) => FormatSelector::select_preview_format(&info.formats)
                .and_then(|format| format.url.clone()),
            Err(e) => {
                debug!("Error getting preview URL for {}: {}", id, e);
                None
            }
        }
    }

    async fn extract(&self, query: &InfoQuery) -> Result<EngineInfo, DownloadError> {
        let staged = self.cookies.stage();
        self.engine
            .extract(query, staged.as_ref().map(|c| c.path()))
            .await
    }

    async fn playlist_listing(&self, id: &str) -> Result<EngineInfo, DownloadError> {
        self.extract(&InfoQuery::flat(MediaTarget::playlist(id).url()))
            .await
    }

    async fn playlist_cover(&self, id: &str) -> Option<String> {
        match self.playlist_listing(id).await {
            Ok(info) => Some(playlist_cover_from(&info)).filter(|url| !url.is_empty()),
            Err(e) => {
                debug!("Playlist cover for {} unavailable: {}", id, e);
                None
            }
        }
    }
}

fn log_state(target: &MediaTarget, state: RequestState) {
    debug!(media = %target, state = %state, "request state");
}

fn track_info_from(
    id: &str,
    quality: Quality,
    info: &EngineInfo,
    channel_name: Option<&str>,
) -> TrackInfo {
    let title = clean_title(info.title.as_deref().unwrap_or("Unknown"));

    let uploader = info
        .uploader
        .as_deref()
        .or(info.channel.as_deref())
        .filter(|u| !u.is_empty())
        .map(strip_topic_suffix)
        .unwrap_or(UNKNOWN_ARTIST);
    let uploader = match channel_name {
        Some(channel) if uploader == UNKNOWN_ARTIST || uploader.is_empty() => channel,
        _ => uploader,
    };

    let (artist, name) = parse_title_artist(&title, uploader);
    let (release_year, release_date) = parse_upload_date(info.upload_date.as_deref());
    let cover_url = best_thumbnail(&info.thumbnails)
        .map(str::to_string)
        .or_else(|| info.thumbnail.clone())
        .unwrap_or_default();

    TrackInfo {
        id: id.to_string(),
        name,
        album: ALBUM_NAME.to_string(),
        album_id: ALBUM_ID.to_string(),
        artists: vec![artist],
        artist_id: info.channel_id.clone().unwrap_or_default(),
        codec: FormatSelector::primary_codec(quality),
        cover_url,
        release_year,
        release_date,
        duration: info.duration.filter(|d| *d >= 0.0).map(|d| d.round() as u64),
        description: info
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(truncate_description),
        genres: vec![GENRE.to_string()],
        sample_rate: SAMPLE_RATE_KHZ,
        preview_url: Some(MediaTarget::track(id).url()),
        error: None,
    }
}

fn unavailable_track_info(id: &str, quality: Quality, error: String) -> TrackInfo {
    TrackInfo {
        id: id.to_string(),
        name: "Unknown".to_string(),
        album: ALBUM_NAME.to_string(),
        album_id: String::new(),
        artists: vec![UNKNOWN_ARTIST.to_string()],
        artist_id: String::new(),
        codec: FormatSelector::primary_codec(quality),
        cover_url: String::new(),
        release_year: DEFAULT_RELEASE_YEAR,
        release_date: None,
        duration: None,
        description: None,
        genres: Vec::new(),
        sample_rate: SAMPLE_RATE_KHZ,
        preview_url: Some(MediaTarget::track(id).url()),
        error: Some(error),
    }
}

fn playlist_info_from(id: &str, info: &EngineInfo) -> PlaylistInfo {
    PlaylistInfo {
        id: id.to_string(),
        name: info
            .title
            .clone()
            .unwrap_or_else(|| "Unknown Playlist".to_string()),
        creator: info
            .uploader
            .clone()
            .or_else(|| info.channel.clone())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        creator_id: info.channel_id.clone().unwrap_or_default(),
        tracks: info.listed().filter_map(|e| e.id.clone()).collect(),
        release_year: DEFAULT_RELEASE_YEAR,
        cover_url: playlist_cover_from(info),
        description: info.description.clone().unwrap_or_default(),
    }
}

/// Playlist thumbnail, else the first entry's
fn playlist_cover_from(info: &EngineInfo) -> String {
    info.thumbnail
        .clone()
        .or_else(|| best_thumbnail(&info.thumbnails).map(str::to_string))
        .or_else(|| {
            info.listed().next().and_then(|first| {
                first
                    .thumbnail
                    .clone()
                    .or_else(|| best_thumbnail(&first.thumbnails).map(str::to_string))
            })
        })
        .unwrap_or_default()
}

fn channel_avatar(info: &EngineInfo) -> Option<String> {
    info.channel_thumbnail
        .clone()
        .filter(|url| is_avatar_url(url))
        .or_else(|| channel_avatar_from_thumbnails(&info.thumbnails).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::downloader::models::Thumbnail;

    /// Scripted engine: per-codec fetch results and a queue of extract results
    #[derive(Default)]
    struct ScriptedEngine {
        unavailable: Vec<Codec>,
        extracts: Mutex<VecDeque<Result<EngineInfo, DownloadError>>>,
        fetched: Mutex<Vec<Codec>>,
        queries: Mutex<Vec<InfoQuery>>,
    }

    #[async_trait]
    impl MediaEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self, job: &FetchJob<'_>) -> Result<PathBuf, DownloadError> {
            self.fetched.lock().unwrap().push(job.codec);
            if self.unavailable.contains(&job.codec) {
                return Err(DownloadError::FormatUnavailable(job.codec));
            }
            Ok(job
                .destination
                .join(format!("{}.{}", job.file_stem, job.codec.extension())))
        }

        async fn extract(
            &self,
            query: &InfoQuery,
            _cookies: Option<&Path>,
        ) -> Result<EngineInfo, DownloadError> {
            self.queries.lock().unwrap().push(query.clone());
            self.extracts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(EngineInfo::default()))
        }
    }

    fn adapter(engine: Arc<ScriptedEngine>, transcoder: bool) -> YouTubeAdapter {
        let config = ModuleConfig {
            download_pause_seconds: 0,
            cookies_path: PathBuf::from("/nonexistent/youtube-cookies.txt"),
            ..ModuleConfig::default()
        };
        YouTubeAdapter::new(
            engine,
            config,
            transcoder.then(|| PathBuf::from("/usr/bin/ffmpeg")),
        )
    }

    fn request(quality: Quality) -> DownloadRequest {
        DownloadRequest::new(MediaTarget::track("dQw4w9WgXcQ"), quality, "/tmp/out")
    }

    #[tokio::test]
    async fn test_primary_codec_per_quality() {
        for quality in Quality::ALL {
            let engine = Arc::new(ScriptedEngine::default());
            let track = adapter(engine.clone(), true)
                .resolve_and_download(&request(quality))
                .await
                .unwrap();
            assert_eq!(track.codec, FormatSelector::primary_codec(quality));
            assert_eq!(*engine.fetched.lock().unwrap(), vec![track.codec]);
        }
    }

    #[tokio::test]
    async fn test_falls_back_in_table_order() {
        let engine = Arc::new(ScriptedEngine {
            unavailable: vec![Codec::Opus],
            ..Default::default()
        });
        let track = adapter(engine.clone(), true)
            .resolve_and_download(&request(Quality::HiFi))
            .await
            .unwrap();
        assert_eq!(track.codec, Codec::Aac);
        assert_eq!(track.attempted, vec![Codec::Opus, Codec::Aac]);
        assert!(track.fell_back());
        assert_eq!(track.path, PathBuf::from("/tmp/out/dQw4w9WgXcQ.m4a"));
    }

    #[tokio::test]
    async fn test_override_has_no_fallback() {
        let engine = Arc::new(ScriptedEngine {
            unavailable: vec![Codec::Opus],
            ..Default::default()
        });
        let err = adapter(engine.clone(), true)
            .resolve_and_download(&request(Quality::HiFi).with_format_override(Some(Codec::Opus)))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::FormatUnavailable(Codec::Opus)));
        assert_eq!(*engine.fetched.lock().unwrap(), vec![Codec::Opus]);
    }

    #[tokio::test]
    async fn test_mp3_without_transcoder() {
        let engine = Arc::new(ScriptedEngine::default());
        let err = adapter(engine.clone(), false)
            .resolve_and_download(&request(Quality::Low))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::TranscoderMissing(_)));
        assert!(engine.fetched.lock().unwrap().is_empty());

        // Opus needs no transcoding
        let track = adapter(engine, false)
            .resolve_and_download(&request(Quality::HiFi))
            .await
            .unwrap();
        assert_eq!(track.codec, Codec::Opus);
    }

    #[tokio::test]
    async fn test_collection_request_is_rejected() {
        let engine = Arc::new(ScriptedEngine::default());
        let req = DownloadRequest::new(MediaTarget::playlist("PL1"), Quality::HiFi, "/tmp");
        let err = adapter(engine, true).resolve_and_download(&req).await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_track_info_metadata() {
        let info: EngineInfo = serde_json::from_str(
            r#"{
                "id": "abc",
                "title": "Anne-Marie – Alarm (Official Video) #popmusic",
                "uploader": "Anne-Marie - Topic",
                "channel_id": "UCabc",
                "upload_date": "20160520",
                "duration": 204.6,
                "thumbnails": [{"url": "small", "width": 120, "height": 90},
                               {"url": "big", "width": 1280, "height": 720}]
            }"#,
        )
        .unwrap();
        let engine = Arc::new(ScriptedEngine::default());
        engine.extracts.lock().unwrap().push_back(Ok(info));

        let track = adapter(engine, true)
            .get_track_info("abc", Quality::High, None)
            .await;
        assert_eq!(track.name, "Alarm");
        assert_eq!(track.artists, vec!["Anne-Marie"]);
        assert_eq!(track.release_year, 2016);
        assert_eq!(track.release_date.as_deref(), Some("2016-05-20"));
        assert_eq!(track.cover_url, "big");
        assert_eq!(track.codec, Codec::Aac);
        assert_eq!(track.duration, Some(205));
        assert_eq!(track.genres, vec!["YouTube"]);
        assert!(track.error.is_none());
    }

    #[tokio::test]
    async fn test_track_info_failure_is_reported_not_raised() {
        let engine = Arc::new(ScriptedEngine::default());
        engine
            .extracts
            .lock()
            .unwrap()
            .push_back(Err(DownloadError::TargetUnavailable("Video unavailable".into())));

        let track = adapter(engine, true)
            .get_track_info("gone", Quality::HiFi, None)
            .await;
        assert!(track.error.is_some());
        assert_eq!(track.release_year, DEFAULT_RELEASE_YEAR);
        assert_eq!(
            track.preview_url.as_deref(),
            Some("https://www.youtube.com/watch?v=gone")
        );
    }

    #[tokio::test]
    async fn test_channel_id_playlist_prefers_uploads() {
        let uploads: EngineInfo = serde_json::from_str(
            r#"{"id": "UUxyz", "title": "Uploads from X",
                "entries": [{"id": "v1", "thumbnail": "first"}, {"id": "v2"}]}"#,
        )
        .unwrap();
        let engine = Arc::new(ScriptedEngine::default());
        engine.extracts.lock().unwrap().push_back(Ok(uploads));

        let playlist = adapter(engine.clone(), true)
            .get_playlist_info("UCxyz")
            .await
            .unwrap();
        assert_eq!(playlist.tracks, vec!["v1", "v2"]);
        assert_eq!(playlist.cover_url, "first");
        assert_eq!(
            engine.queries.lock().unwrap()[0].url,
            "https://www.youtube.com/playlist?list=UUxyz"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcoder_check_skips_the_pause() {
        let engine = Arc::new(ScriptedEngine::default());
        let config = ModuleConfig {
            download_pause_seconds: 5,
            cookies_path: PathBuf::from("/nonexistent/youtube-cookies.txt"),
            ..ModuleConfig::default()
        };
        let adapter = YouTubeAdapter::new(engine.clone(), config, None);

        adapter
            .resolve_and_download(&request(Quality::HiFi))
            .await
            .unwrap();

        let before = tokio::time::Instant::now();
        let err = adapter
            .resolve_and_download(&request(Quality::Low))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::TranscoderMissing(_)));
        assert_eq!(tokio::time::Instant::now(), before);

        // The next real download still waits out the pause after the first
        adapter
            .resolve_and_download(&request(Quality::HiFi))
            .await
            .unwrap();
        assert_eq!(tokio::time::Instant::now() - before, std::time::Duration::from_secs(5));
        assert_eq!(*engine.fetched.lock().unwrap(), vec![Codec::Opus, Codec::Opus]);
    }

    #[tokio::test]
    async fn test_describe_and_download_names_file() {
        let info: EngineInfo = serde_json::from_str(
            r#"{"id": "dQw4w9WgXcQ",
                "title": "Rick Astley - Never Gonna Give You Up (Official Video)",
                "uploader": "Rick Astley"}"#,
        )
        .unwrap();
        let engine = Arc::new(ScriptedEngine::default());
        engine.extracts.lock().unwrap().push_back(Ok(info));

        let track = adapter(engine.clone(), true)
            .describe_and_download(request(Quality::HiFi))
            .await
            .unwrap();
        assert_eq!(
            track.path,
            PathBuf::from("/tmp/out/Rick Astley - Never Gonna Give You Up.opus")
        );
    }

    #[tokio::test]
    async fn test_describe_and_download_keeps_id_when_lookup_fails() {
        let engine = Arc::new(ScriptedEngine::default());
        engine
            .extracts
            .lock()
            .unwrap()
            .push_back(Err(DownloadError::TargetUnavailable("gone".into())));

        let track = adapter(engine.clone(), true)
            .describe_and_download(request(Quality::HiFi))
            .await
            .unwrap();
        assert_eq!(track.path, PathBuf::from("/tmp/out/dQw4w9WgXcQ.opus"));

        // Explicit names skip the lookup
        let named = request(Quality::HiFi).with_file_stem(Some("mine".to_string()));
        let track = adapter(engine.clone(), true)
            .describe_and_download(named)
            .await
            .unwrap();
        assert_eq!(track.path, PathBuf::from("/tmp/out/mine.opus"));
        assert_eq!(engine.queries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_channel_avatar_ignores_banner() {
        let info = EngineInfo {
            channel_thumbnail: Some("https://yt3.googleusercontent.com/x=s0".to_string()),
            thumbnails: vec![Thumbnail {
                url: Some("https://yt3.googleusercontent.com/x=s160-c-k".to_string()),
                width: Some(160),
                height: Some(160),
            }],
            ..Default::default()
        };
        assert_eq!(
            channel_avatar(&info).as_deref(),
            Some("https://yt3.googleusercontent.com/x=s160-c-k")
        );
    }
}
