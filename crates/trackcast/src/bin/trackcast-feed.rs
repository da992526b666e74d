#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trackcast::feed::run().await
}
