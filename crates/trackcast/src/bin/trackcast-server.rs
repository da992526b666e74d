#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trackcast::server::run().await
}
