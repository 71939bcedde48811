use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::FormatSelector;
use crate::downloader::models::{Codec, EngineInfo};
use crate::downloader::tools::Toolchain;
use crate::downloader::traits::{FetchJob, InfoQuery, MediaEngine};
use crate::downloader::utils::{log_engine_output, run_output_with_timeout};

/// Extensions yt-dlp may leave behind, most specific first
const OUTPUT_EXTENSIONS: [&str; 5] = ["opus", "mp3", "m4a", "webm", "ogg"];

/// MediaEngine backed by the yt-dlp binary
pub struct YtDlpEngine {
    ytdlp: Option<PathBuf>,
    js_runtime: Option<PathBuf>,
    timeout_secs: u64,
}

impl YtDlpEngine {
    pub fn new(toolchain: &Toolchain, timeout_secs: u64) -> Self {
        Self {
            ytdlp: toolchain.ytdlp.clone(),
            js_runtime: toolchain.js_runtime.clone(),
            timeout_secs,
        }
    }

    fn program(&self) -> Result<&Path, DownloadError> {
        self.ytdlp.as_deref().ok_or_else(|| {
            DownloadError::EngineUnavailable("yt-dlp binary not found in PATH".to_string())
        })
    }

    /// Arguments shared by every invocation
    fn base_args(&self, cookies: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            // Disable colors for easier parsing
            "--color".into(),
            "no_color".into(),
            // Challenge solver scripts are fetched on demand
            "--remote-components".into(),
            "ejs:github".into(),
        ];

        if let Some(deno) = &self.js_runtime {
            args.push("--js-runtimes".into());
            args.push(format!("deno:{}", deno.display()).into());
        }

        if let Some(path) = cookies {
            args.push("--cookies".into());
            args.push(path.into());
        }

        args
    }

    fn build_fetch_args(&self, job: &FetchJob<'_>) -> Result<Vec<OsString>, DownloadError> {
        let format = FormatSelector::format_spec(job.codec, job.transcoder.is_some()).ok_or_else(
            || DownloadError::TranscoderMissing(format!("{} output requires FFmpeg", job.codec)),
        )?;

        let mut args = self.base_args(job.cookies);
        args.extend(["--no-playlist", "--no-progress", "-f", format].map(OsString::from));

        if let Some(ffmpeg) = job.transcoder {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
            args.push("-x".into());
            args.push("--audio-format".into());
            args.push(job.codec.audio_format_arg().into());
            if job.codec == Codec::Mp3 {
                args.push("--audio-quality".into());
                args.push("192K".into());
            }
            args.push("--embed-metadata".into());
        }

        args.push("-o".into());
        args.push(job.output_template().into());
        // Final path after post-processing, one per line on stdout
        args.extend(["--print", "after_move:filepath", "--no-simulate", "--"].map(OsString::from));
        args.push(job.url.clone().into());

        Ok(args)
    }

    fn build_extract_args(&self, query: &InfoQuery, cookies: Option<&Path>) -> Vec<OsString> {
        let mut args = self.base_args(cookies);
        let listing = if query.flat { "--flat-playlist" } else { "--no-playlist" };
        args.push("--dump-single-json".into());
        args.push(listing.into());
        if let Some(items) = &query.playlist_items {
            args.push("--playlist-items".into());
            args.push(items.into());
        }
        args.push("--".into());
        args.push(query.url.clone().into());
        args
    }

    fn parse_info(stdout: &[u8]) -> Result<EngineInfo, DownloadError> {
        let json_str = String::from_utf8_lossy(stdout);
        serde_json::from_str(json_str.trim())
            .map_err(|e| DownloadError::Parse(format!("Invalid yt-dlp JSON: {}", e)))
    }

    /// Path printed by `after_move:filepath`, else a scan of known extensions
    fn locate_output(stdout: &[u8], job: &FetchJob<'_>) -> Option<PathBuf> {
        let printed = String::from_utf8_lossy(stdout)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.is_file());

        printed.or_else(|| {
            OUTPUT_EXTENSIONS
                .iter()
                .map(|ext| job.destination.join(format!("{}.{}", job.file_stem, ext)))
                .find(|path| path.is_file())
        })
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    #[instrument(skip(self, job), fields(url = %job.url, codec = %job.codec))]
    async fn fetch(&self, job: &FetchJob<'_>) -> Result<PathBuf, DownloadError> {
        let program = self.program()?;
        let args = self.build_fetch_args(job)?;
        tokio::fs::create_dir_all(job.destination).await?;

        let output = run_output_with_timeout(program, args, self.timeout_secs).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        log_engine_output(&stderr);

        if !output.status.success() {
            return Err(DownloadError::from_engine_output(
                &stderr,
                output.status.code(),
                Some(job.codec),
            ));
        }

        let path = Self::locate_output(&output.stdout, job).ok_or_else(|| {
            DownloadError::Parse(format!(
                "yt-dlp finished but no audio file named {} was found in {}",
                job.file_stem,
                job.destination.display()
            ))
        })?;
        debug!(path = %path.display(), "download finished");
        Ok(path)
    }

    #[instrument(skip(self, query, cookies), fields(url = %query.url, flat = query.flat))]
    async fn extract(
        &self,
        query: &InfoQuery,
        cookies: Option<&Path>,
    ) -> Result<EngineInfo, DownloadError> {
        let program = self.program()?;
        let args = self.build_extract_args(query, cookies);

        let output = run_output_with_timeout(program, args, self.timeout_secs).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        log_engine_output(&stderr);

        if !output.status.success() {
            return Err(DownloadError::from_engine_output(
                &stderr,
                output.status.code(),
                None,
            ));
        }

        Self::parse_info(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(js_runtime: Option<&str>) -> YtDlpEngine {
        YtDlpEngine {
            ytdlp: Some(PathBuf::from("/usr/bin/yt-dlp")),
            js_runtime: js_runtime.map(PathBuf::from),
            timeout_secs: 30,
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_fetch_args_with_transcoder() {
        let dest = PathBuf::from("/tmp/out");
        let ffmpeg = PathBuf::from("/usr/bin/ffmpeg");
        let cookies = PathBuf::from("/tmp/yt_cookies_x.txt");
        let job = FetchJob {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            codec: Codec::Mp3,
            destination: &dest,
            file_stem: "dQw4w9WgXcQ",
            cookies: Some(&cookies),
            transcoder: Some(&ffmpeg),
        };

        let args = strings(&engine(Some("/usr/bin/deno")).build_fetch_args(&job).unwrap());
        assert!(has_pair(&args, "-f", "bestaudio/best"));
        assert!(has_pair(&args, "--audio-format", "mp3"));
        assert!(has_pair(&args, "--audio-quality", "192K"));
        assert!(has_pair(&args, "--cookies", "/tmp/yt_cookies_x.txt"));
        assert!(has_pair(&args, "--js-runtimes", "deno:/usr/bin/deno"));
        assert!(has_pair(&args, "--remote-components", "ejs:github"));
        assert!(has_pair(&args, "-o", "/tmp/out/dQw4w9WgXcQ.%(ext)s"));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_fetch_args_without_transcoder() {
        let dest = PathBuf::from("/tmp/out");
        let job = FetchJob {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            codec: Codec::Opus,
            destination: &dest,
            file_stem: "x",
            cookies: None,
            transcoder: None,
        };

        let args = strings(&engine(None).build_fetch_args(&job).unwrap());
        assert!(has_pair(&args, "-f", "bestaudio[acodec=opus]"));
        assert!(!args.iter().any(|a| a == "-x" || a == "--cookies" || a == "--js-runtimes"));

        let mp3 = FetchJob { codec: Codec::Mp3, ..job };
        let err = engine(None).build_fetch_args(&mp3).unwrap_err();
        assert!(matches!(err, DownloadError::TranscoderMissing(_)));
    }

    #[test]
    fn test_extract_args() {
        let query = InfoQuery::flat("ytsearch10:never gonna give you up").with_items("1-10");
        let args = strings(&engine(None).build_extract_args(&query, None));
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(has_pair(&args, "--playlist-items", "1-10"));
        assert!(has_pair(&args, "--", "ytsearch10:never gonna give you up"));
    }

    #[test]
    fn test_locate_output_scans_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.webm"), b"x").unwrap();
        let job = FetchJob {
            url: String::new(),
            codec: Codec::Opus,
            destination: dir.path(),
            file_stem: "abc",
            cookies: None,
            transcoder: None,
        };

        let found = YtDlpEngine::locate_output(b"\n", &job).unwrap();
        assert_eq!(found, dir.path().join("abc.webm"));

        let printed = format!("{}\n", dir.path().join("abc.webm").display());
        assert_eq!(
            YtDlpEngine::locate_output(printed.as_bytes(), &job),
            Some(dir.path().join("abc.webm"))
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_unavailable() {
        let engine = YtDlpEngine::new(&Toolchain::default(), 30);
        let err = engine
            .extract(&InfoQuery::full("https://youtu.be/dQw4w9WgXcQ"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::EngineUnavailable(_)));
    }
}
