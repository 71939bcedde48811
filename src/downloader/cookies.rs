// Cookie jar staging
//
// yt-dlp rewrites the cookie file it is given. The configured jar is
// shared read-only state, so each invocation gets a throwaway copy.

use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

/// Configured cookie jar location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A jar is usable only when it is a regular file
    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    /// Copy the jar for one engine run. `None` when no jar is configured
    /// or it cannot be read; requests then run unauthenticated.
    pub fn stage(&self) -> Option<StagedCookies> {
        if !self.is_available() {
            return None;
        }

        let staged = Builder::new()
            .prefix("yt_cookies_")
            .suffix(".txt")
            .tempfile()
            .and_then(|file| std::fs::copy(&self.path, file.path()).map(|_| file));

        match staged {
            Ok(file) => {
                debug!(from = %self.path.display(), to = %file.path().display(), "staged cookies");
                Some(StagedCookies { file })
            }
            Err(e) => {
                warn!("Could not stage cookies from {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Temporary cookie copy, removed on drop
#[derive(Debug)]
pub struct StagedCookies {
    file: NamedTempFile,
}

impl StagedCookies {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
