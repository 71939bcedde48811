// Command line surface standing in for the host framework

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::{DownloadMode, Settings, DEFAULT_SETTINGS_PATH};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{Codec, DownloadRequest, MediaKind, Quality, SearchResult};
use crate::downloader::search::SearchKind;
use crate::downloader::tools::{ToolManager, Toolchain};
use crate::downloader::url_parser::parse_youtube_url;
use crate::downloader::{YouTubeAdapter, YtDlpEngine};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download YouTube audio through yt-dlp and FFmpeg")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Path to settings.json",
        default_value = DEFAULT_SETTINGS_PATH
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub download: DownloadArgs,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    #[arg(short, long, help = "hifi, lossless, high, medium, low or minimum")]
    pub quality: Option<Quality>,

    #[arg(long, help = "Download exactly this codec (opus, aac, mp3, vorbis)")]
    pub format: Option<Codec>,

    #[arg(short, long, help = "Output directory")]
    pub output: Option<PathBuf>,

    #[arg(help = "Video, playlist or channel URLs")]
    pub urls: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Search a module")]
    Search {
        #[arg(value_parser = ["youtube"], help = "Module to search")]
        module: String,

        #[arg(help = "track, playlist, artist or album")]
        kind: SearchKind,

        query: String,

        #[arg(long, help = "Maximum number of results")]
        limit: Option<usize>,
    },

    #[command(about = "Print track, playlist or channel metadata as JSON")]
    Info { url: String },

    #[command(about = "Print a low-bitrate audio stream URL")]
    Preview { url: String },

    #[command(about = "Show yt-dlp, FFmpeg and deno status")]
    Tools,
}

struct Session {
    settings: Settings,
    adapter: Arc<YouTubeAdapter>,
}

impl Session {
    fn open(config_path: &Path) -> anyhow::Result<Self> {
        let settings = Settings::load(config_path)
            .with_context(|| format!("Could not load {}", config_path.display()))?;
        let toolchain = tool_manager(&settings).toolchain();
        debug!("Toolchain: {:?}", toolchain);

        let adapter = build_adapter(&settings, &toolchain);
        Ok(Self {
            settings,
            adapter: Arc::new(adapter),
        })
    }

    fn cookies_path(&self) -> &Path {
        self.adapter.cookies().path()
    }
}

fn tool_manager(settings: &Settings) -> ToolManager {
    ToolManager::new(
        settings.youtube.ytdlp_path.clone(),
        settings.ffmpeg_path.clone(),
    )
}

fn build_adapter(settings: &Settings, toolchain: &Toolchain) -> YouTubeAdapter {
    let engine = YtDlpEngine::new(toolchain, settings.youtube.engine_timeout_seconds);
    YouTubeAdapter::new(
        Arc::new(engine),
        settings.youtube.clone(),
        toolchain.ffmpeg.clone(),
    )
}

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Tools) => {
            let settings = Settings::load(&cli.config)?;
            print_tools(&tool_manager(&settings));
            Ok(())
        }
        Some(Commands::Search {
            module,
            kind,
            query,
            limit,
        }) => {
            debug!("Searching {} for {} \"{}\"", module, kind, query);
            search(&Session::open(&cli.config)?, kind, &query, limit).await
        }
        Some(Commands::Info { url }) => show_info(&Session::open(&cli.config)?, &url).await,
        Some(Commands::Preview { url }) => preview(&Session::open(&cli.config)?, &url).await,
        None if cli.download.urls.is_empty() => {
            bail!("Nothing to do: pass one or more YouTube URLs, or a subcommand (see --help)")
        }
        None => download(&Session::open(&cli.config)?, cli.download).await,
    }
}

async fn download(session: &Session, args: DownloadArgs) -> anyhow::Result<()> {
    let quality = args.quality.unwrap_or(session.settings.quality);
    let destination = args
        .output
        .unwrap_or_else(|| session.settings.download_path.clone());

    let mut failed = 0usize;
    let mut requests = Vec::new();
    for url in &args.urls {
        let Some(target) = parse_youtube_url(url) else {
            report_error(&DownloadError::InvalidTarget(url.clone()), session.cookies_path());
            failed += 1;
            continue;
        };

        match session.adapter.expand(&target, quality, &destination).await {
            Ok(expanded) => requests.extend(
                expanded
                    .into_iter()
                    .map(|request| request.with_format_override(args.format)),
            ),
            Err(e) => {
                report_error(&e, session.cookies_path());
                failed += 1;
            }
        }
    }

    let total = requests.len();
    info!("Downloading {} track(s) at {} quality", total, quality);

    failed += match session.settings.youtube.download_mode {
        DownloadMode::Sequential => {
            let mut failures = 0;
            for request in requests {
                if !download_one(&session.adapter, request).await {
                    failures += 1;
                }
            }
            failures
        }
        DownloadMode::Concurrent => {
            let mut tasks = JoinSet::new();
            for request in requests {
                let adapter = session.adapter.clone();
                tasks.spawn(async move { download_one(&adapter, request).await });
            }

            let mut failures = 0;
            while let Some(joined) = tasks.join_next().await {
                if !joined.unwrap_or(false) {
                    failures += 1;
                }
            }
            failures
        }
    };

    if failed > 0 {
        bail!("{} download(s) failed", failed);
    }
    Ok(())
}

/// Download one track, printing the outcome. Returns success.
async fn download_one(adapter: &YouTubeAdapter, request: DownloadRequest) -> bool {
    let id = request.target.id.clone();
    match adapter.describe_and_download(request).await {
        Ok(done) => {
            println!("✓ {} -> {} ({})", id, done.path.display(), done.codec);
            true
        }
        Err(e) => {
            report_error(&e, adapter.cookies().path());
            false
        }
    }
}

async fn search(
    session: &Session,
    kind: SearchKind,
    query: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let results = match session.adapter.search(query, kind, limit).await {
        Ok(results) => results,
        Err(e) => {
            report_error(&e, session.cookies_path());
            bail!("search failed");
        }
    };

    if results.is_empty() {
        println!("No results for \"{}\"", query);
    }
    for (index, result) in results.iter().enumerate() {
        println!("{:>3}. {}", index + 1, describe_result(result));
    }
    Ok(())
}

fn describe_result(result: &SearchResult) -> String {
    let mut line = match result.kind {
        MediaKind::Artist => result.artists.join(", "),
        _ if result.artists.is_empty() => result.name.clone(),
        _ => format!("{} - {}", result.artists.join(", "), result.name),
    };

    let mut details = Vec::new();
    if let Some(year) = &result.year {
        details.push(year.clone());
    }
    if let Some(secs) = result.duration {
        details.push(format!("{}:{:02}", secs / 60, secs % 60));
    }
    if let Some(extra) = &result.additional {
        details.extend(extra.iter().cloned());
    }
    if !details.is_empty() {
        line.push_str(&format!(" [{}]", details.join(", ")));
    }

    format!("{}  {}", line, result.url)
}

async fn show_info(session: &Session, url: &str) -> anyhow::Result<()> {
    let target = parse_youtube_url(url).ok_or_else(|| DownloadError::InvalidTarget(url.to_string()))?;
    let adapter = &session.adapter;

    let json = match target.kind {
        MediaKind::Track => {
            let track = adapter
                .get_track_info(&target.id, session.settings.quality, None)
                .await;
            serde_json::to_string_pretty(&track)?
        }
        MediaKind::Playlist | MediaKind::Album => {
            serde_json::to_string_pretty(&adapter.get_playlist_info(&target.id).await?)?
        }
        MediaKind::Artist => {
            serde_json::to_string_pretty(&adapter.get_artist_info(&target.id).await?)?
        }
    };
    println!("{}", json);
    Ok(())
}

async fn preview(session: &Session, url: &str) -> anyhow::Result<()> {
    let target = parse_youtube_url(url)
        .filter(|t| t.kind == MediaKind::Track)
        .ok_or_else(|| DownloadError::InvalidTarget(url.to_string()))?;

    match session.adapter.get_preview_stream_url(&target.id).await {
        Some(stream) => {
            println!("{}", stream);
            Ok(())
        }
        None => bail!("No preview stream available for {}", target.id),
    }
}

fn print_tools(manager: &ToolManager) {
    for tool in manager.get_all_tools() {
        let status = if tool.is_available { "✓" } else { "✗" };
        let location = tool
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not found".to_string());
        println!(
            "{} {:<7} {:<40} {}",
            status,
            tool.name,
            location,
            tool.version.as_deref().unwrap_or("")
        );
    }
}

fn report_error(error: &DownloadError, cookies_path: &Path) {
    eprintln!("✗ [{}] {}", error.kind(), error);
    if let Some(hint) = error.remediation(cookies_path) {
        eprintln!("  {}", hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_download_invocation() {
        let cli = Cli::parse_from([
            "orpheus-youtube",
            "-q",
            "high",
            "--format",
            "mp3",
            "https://youtu.be/dQw4w9WgXcQ",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.download.quality, Some(Quality::High));
        assert_eq!(cli.download.format, Some(Codec::Mp3));
        assert_eq!(cli.download.urls, vec!["https://youtu.be/dQw4w9WgXcQ"]);
    }

    #[test]
    fn test_parses_search_invocation() {
        let cli = Cli::parse_from([
            "orpheus-youtube",
            "search",
            "youtube",
            "artist",
            "rick astley",
            "--limit",
            "3",
        ]);
        match cli.command {
            Some(Commands::Search {
                kind, query, limit, ..
            }) => {
                assert_eq!(kind, SearchKind::Artist);
                assert_eq!(query, "rick astley");
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_module() {
        assert!(Cli::try_parse_from(["orpheus-youtube", "search", "tidal", "track", "x"]).is_err());
    }
}
