pub mod cli;
pub mod config;
pub mod downloader;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{ModuleConfig, Settings};
pub use downloader::{DownloadError, YouTubeAdapter};

/// Parse the command line, set up logging and run the requested command
pub async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG overrides; info otherwise
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    cli::execute(cli).await
}
