#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lyric_sync_lib::run().await
}
