#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orpheus_youtube_lib::run().await
}
