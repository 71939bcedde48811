// Downloader module - YouTube adapter over an external media engine

pub mod backends;
pub mod cookies;
pub mod diagnostics;
pub mod errors;
pub mod format_selector;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod pacing;
pub mod search;
pub mod tools;
pub mod traits;
pub mod url_parser;
pub mod utils;

pub use backends::YtDlpEngine;
pub use errors::{DownloadError, ErrorKind};
pub use models::{
    Codec, DownloadOutcome, DownloadRequest, DownloadedTrack, MediaKind, MediaTarget, Quality,
    SearchResult,
};
pub use orchestrator::YouTubeAdapter;
pub use search::SearchKind;
pub use traits::{FetchJob, InfoQuery, MediaEngine};
pub use url_parser::parse_youtube_url;
