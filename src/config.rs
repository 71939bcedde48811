// Settings loading
//
// Reads the host's config/settings.json. Only `global.general`,
// `global.advanced.ffmpeg_path` and `modules.youtube` are consumed;
// everything else in the file belongs to other modules and is ignored.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::downloader::cookies::CookieJar;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::Quality;
use crate::downloader::pacing::PacingPolicy;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
pub const DEFAULT_COOKIES_PATH: &str = "./config/youtube-cookies.txt";
pub const DEFAULT_DOWNLOAD_PATH: &str = "./downloads/";

const DEFAULT_PAUSE_SECONDS: u64 = 5;
const DEFAULT_MAX_CONCURRENT: usize = 4;
const DEFAULT_ENGINE_TIMEOUT: u64 = 900;
const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    #[default]
    Sequential,
    Concurrent,
}

/// YouTube module settings, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    pub download_pause_seconds: u64,
    /// Already resolved against the settings directory
    pub cookies_path: PathBuf,
    pub download_mode: DownloadMode,
    pub max_concurrent_downloads: usize,
    pub engine_timeout_seconds: u64,
    pub search_limit: usize,
    pub ytdlp_path: Option<PathBuf>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            download_pause_seconds: DEFAULT_PAUSE_SECONDS,
            cookies_path: PathBuf::from(DEFAULT_COOKIES_PATH),
            download_mode: DownloadMode::Sequential,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT,
            engine_timeout_seconds: DEFAULT_ENGINE_TIMEOUT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            ytdlp_path: None,
        }
    }
}

impl ModuleConfig {
    pub fn pacing_policy(&self) -> PacingPolicy {
        match self.download_mode {
            DownloadMode::Sequential => PacingPolicy::Sequential {
                pause: Duration::from_secs(self.download_pause_seconds),
            },
            DownloadMode::Concurrent => PacingPolicy::Concurrent {
                limit: self.max_concurrent_downloads,
            },
        }
    }

    pub fn cookie_jar(&self) -> CookieJar {
        CookieJar::new(&self.cookies_path)
    }
}

/// Everything the adapter and CLI read from settings.json
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub download_path: PathBuf,
    pub quality: Quality,
    pub ffmpeg_path: Option<PathBuf>,
    pub youtube: ModuleConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_path: PathBuf::from(DEFAULT_DOWNLOAD_PATH),
            quality: Quality::default(),
            ffmpeg_path: None,
            youtube: ModuleConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, DownloadError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(DownloadError::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let settings_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let settings = Self::from_json(&contents, settings_dir).map_err(|e| match e {
            DownloadError::Config(msg) => {
                DownloadError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Parse settings text. Relative cookie paths resolve against `settings_dir`.
    pub fn from_json(json: &str, settings_dir: &Path) -> Result<Self, DownloadError> {
        let file: SettingsFile = serde_json::from_str(json)
            .map_err(|e| DownloadError::Config(format!("invalid settings JSON: {}", e)))?;

        let general = file.global.general;
        let quality = match general.download_quality.as_deref() {
            None => Quality::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using {}", e, Quality::default());
                Quality::default()
            }),
        };

        let youtube = file.modules.youtube;
        let module = ModuleConfig {
            download_pause_seconds: youtube.download_pause_seconds,
            cookies_path: resolve_cookies_path(
                youtube.cookies_path.as_deref().unwrap_or(""),
                settings_dir,
            ),
            download_mode: youtube.download_mode,
            max_concurrent_downloads: youtube
                .max_concurrent_downloads
                .unwrap_or(DEFAULT_MAX_CONCURRENT)
                .max(1),
            engine_timeout_seconds: youtube
                .engine_timeout_seconds
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_ENGINE_TIMEOUT),
            search_limit: youtube
                .search_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_SEARCH_LIMIT),
            ytdlp_path: non_empty_path(youtube.ytdlp_path),
        };

        Ok(Self {
            download_path: non_empty_path(general.download_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_PATH)),
            quality,
            ffmpeg_path: non_empty_path(file.global.advanced.ffmpeg_path),
            youtube: module,
        })
    }
}

/// Empty means the default; `./` and `.\` are relative to the working
/// directory; other relative paths are relative to the settings directory.
pub fn resolve_cookies_path(raw: &str, settings_dir: &Path) -> PathBuf {
    let raw = raw.trim();
    let raw = if raw.is_empty() { DEFAULT_COOKIES_PATH } else { raw };
    let path = Path::new(raw);

    if path.is_absolute() || raw.starts_with("./") || raw.starts_with(".\\") {
        path.to_path_buf()
    } else {
        settings_dir.join(path)
    }
}

fn non_empty_path(raw: Option<String>) -> Option<PathBuf> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    global: GlobalSection,
    #[serde(default)]
    modules: ModulesSection,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalSection {
    #[serde(default)]
    general: GeneralSection,
    #[serde(default)]
    advanced: AdvancedSection,
}

#[derive(Debug, Default, Deserialize)]
struct GeneralSection {
    #[serde(default)]
    download_path: Option<String>,
    #[serde(default)]
    download_quality: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AdvancedSection {
    #[serde(default)]
    ffmpeg_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ModulesSection {
    #[serde(default)]
    youtube: YoutubeSection,
}

#[derive(Debug, Deserialize)]
struct YoutubeSection {
    #[serde(default = "default_pause", deserialize_with = "lenient_seconds")]
    download_pause_seconds: u64,
    #[serde(default)]
    cookies_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_mode")]
    download_mode: DownloadMode,
    #[serde(default)]
    max_concurrent_downloads: Option<usize>,
    #[serde(default)]
    engine_timeout_seconds: Option<u64>,
    #[serde(default)]
    search_limit: Option<usize>,
    #[serde(default)]
    ytdlp_path: Option<String>,
}

impl Default for YoutubeSection {
    fn default() -> Self {
        Self {
            download_pause_seconds: DEFAULT_PAUSE_SECONDS,
            cookies_path: None,
            download_mode: DownloadMode::default(),
            max_concurrent_downloads: None,
            engine_timeout_seconds: None,
            search_limit: None,
            ytdlp_path: None,
        }
    }
}

fn default_pause() -> u64 {
    DEFAULT_PAUSE_SECONDS
}

/// Integer, float or numeric string; anything else is the default
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let seconds = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => Some(DEFAULT_PAUSE_SECONDS),
        _ => None,
    };

    Ok(seconds.unwrap_or_else(|| {
        warn!(
            "Invalid download_pause_seconds {}, using {}",
            value, DEFAULT_PAUSE_SECONDS
        );
        DEFAULT_PAUSE_SECONDS
    }))
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<DownloadMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mode = match &value {
        Value::Null => Some(DownloadMode::Sequential),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "sequential" => Some(DownloadMode::Sequential),
            "concurrent" => Some(DownloadMode::Concurrent),
            _ => None,
        },
        _ => None,
    };

    Ok(mode.unwrap_or_else(|| {
        warn!("Unknown download_mode {}, using sequential", value);
        DownloadMode::Sequential
    }))
}
