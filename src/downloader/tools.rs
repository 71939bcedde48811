use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ToolType {
    /// Download engine
    YtDlp,
    /// Transcoder
    Ffmpeg,
    /// JS runtime used by yt-dlp for challenge solving
    Deno,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
            ToolType::Deno => "deno",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
            ToolType::YtDlp | ToolType::Deno => "--version",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

/// Resolved external programs for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    pub ytdlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub js_runtime: Option<PathBuf>,
}

pub struct ToolManager {
    ytdlp_override: Option<PathBuf>,
    ffmpeg_override: Option<PathBuf>,
}

impl ToolManager {
    pub fn new(ytdlp_override: Option<PathBuf>, ffmpeg_override: Option<PathBuf>) -> Self {
        Self {
            ytdlp_override,
            ffmpeg_override,
        }
    }

    /// Configured location first, then PATH
    pub fn locate(&self, tool_type: ToolType) -> Option<PathBuf> {
        let configured = match tool_type {
            ToolType::YtDlp => self.ytdlp_override.as_deref(),
            ToolType::Ffmpeg => self.ffmpeg_override.as_deref(),
            ToolType::Deno => None,
        };

        if let Some(path) = configured {
            if path.is_file() {
                return Some(path.to_path_buf());
            }
            // Bare command names such as "yt-dlp-nightly"
            if let Ok(found) = which::which(path) {
                return Some(found);
            }
            debug!("Configured {} at {} not found", tool_type.as_str(), path.display());
        }

        which::which(tool_type.as_str())
            .ok()
            .or_else(|| home_install(tool_type))
    }

    /// Resolve every tool, warning about a missing transcoder
    pub fn toolchain(&self) -> Toolchain {
        let toolchain = Toolchain {
            ytdlp: self.locate(ToolType::YtDlp),
            ffmpeg: self.locate(ToolType::Ffmpeg),
            js_runtime: self.locate(ToolType::Deno),
        };

        if toolchain.ffmpeg.is_none() {
            warn!("ffmpeg not found. {}", ffmpeg_install_hint());
        }
        if toolchain.js_runtime.is_none() {
            debug!("deno not found in PATH, yt-dlp picks its own JS runtime");
        }

        toolchain
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type);
        let version = path.as_deref().and_then(|p| get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
            self.get_tool_info(ToolType::Deno),
        ]
    }
}

/// Per-user install locations that are often missing from PATH
fn home_install(tool_type: ToolType) -> Option<PathBuf> {
    let relative = match tool_type {
        ToolType::Deno => ".deno/bin/deno",
        ToolType::YtDlp => ".local/bin/yt-dlp",
        ToolType::Ffmpeg => return None,
    };
    dirs::home_dir()
        .map(|home| home.join(relative))
        .filter(|path| path.is_file())
}

fn get_version(path: &Path, tool_type: ToolType) -> Option<String> {
    match Command::new(path).arg(tool_type.version_arg()).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string()),
        _ => None,
    }
}

/// Platform-specific FFmpeg install instructions
pub fn ffmpeg_install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg"
    } else {
        "Please install ffmpeg for audio extraction."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("my-ffmpeg");
        std::fs::write(&fake, "").unwrap();

        let manager = ToolManager::new(None, Some(fake.clone()));
        assert_eq!(manager.locate(ToolType::Ffmpeg), Some(fake));
    }

    #[test]
    fn test_missing_tool_reports_unavailable() {
        let manager = ToolManager::new(
            Some(PathBuf::from("/nonexistent/yt-dlp-for-tests")),
            None,
        );
        let info = manager.get_tool_info(ToolType::YtDlp);
        if which::which("yt-dlp").is_err() && home_install(ToolType::YtDlp).is_none() {
            assert!(!info.is_available);
            assert!(info.version.is_none());
        }
        assert_eq!(info.name, "yt-dlp");
    }
}
