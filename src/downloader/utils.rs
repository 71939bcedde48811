// Helper functions for engine invocation

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::errors::DownloadError;

/// Run command with timeout, capturing stdout and stderr
pub async fn run_output_with_timeout(
    program: &Path,
    args: Vec<OsString>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    debug!(program = %program.display(), ?args, "spawning");

    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DownloadError::EngineUnavailable(format!("{}: {}", program.display(), e))
            } else {
                DownloadError::Io(e)
            }
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Parse(format!("Failed to capture stdout from {}", program.display())))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Parse(format!("Failed to capture stderr from {}", program.display())))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::Parse(format!("stdout task failed: {}", e)))??;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::Parse(format!("stderr task failed: {}", e)))??;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(timeout_secs))
        }
    }
}

lazy_static! {
    static ref SHOWN_WARNINGS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
    static ref JS_RUNTIME_LOGGED: Mutex<bool> = Mutex::new(false);
    static ref WARNING_PREFIX_RE: Regex = Regex::new(r"^\[.*?\]\s+.*?:?\s+(.*)$").unwrap();
}

/// Warnings that carry no actionable information for the user
const SUPPRESSED_WARNINGS: [&str; 2] = [
    "No supported JavaScript runtime",
    "web client https formats have been skipped",
];

/// Forward engine stderr into tracing, de-duplicated per process
pub fn log_engine_output(stderr: &str) {
    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        note_js_runtime(line);

        if let Some(msg) = line.strip_prefix("WARNING:") {
            let msg = msg.trim();
            if SUPPRESSED_WARNINGS.iter().any(|s| msg.contains(s)) {
                continue;
            }
            if first_occurrence(msg) {
                warn!(target: "yt-dlp", "{}", msg);
            }
        } else if let Some(msg) = line.strip_prefix("ERROR:") {
            debug!(target: "yt-dlp", "{}", msg.trim());
        } else {
            debug!(target: "yt-dlp", "{}", line);
        }
    }
}

/// True the first time an equivalent warning is seen.
/// Extractor prefixes like `[youtube] abc123:` are ignored when comparing.
fn first_occurrence(msg: &str) -> bool {
    let key = if msg.contains("cookies are no longer valid") {
        "cookies are no longer valid".to_string()
    } else {
        WARNING_PREFIX_RE
            .captures(msg)
            .and_then(|c| c.get(1))
            .map_or(msg, |m| m.as_str())
            .to_string()
    };

    match SHOWN_WARNINGS.lock() {
        Ok(mut shown) => shown.insert(key),
        Err(_) => true,
    }
}

/// Log which JS runtime the engine picked, once per process
fn note_js_runtime(line: &str) {
    let lower = line.to_lowercase();
    let detected = if lower.contains("no supported javascript runtime") {
        Some("builtin/fallback".to_string())
    } else if lower.contains("using js runtime")
        || ((lower.contains("deno") || lower.contains("node")) && lower.contains("js"))
    {
        Some(line.to_string())
    } else {
        None
    };

    if let Some(runtime) = detected {
        if let Ok(mut logged) = JS_RUNTIME_LOGGED.lock() {
            if !*logged {
                *logged = true;
                info!("JS runtime: {}", runtime);
            }
        }
    }
}
