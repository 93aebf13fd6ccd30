use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    message_archive_search::run().await
}
