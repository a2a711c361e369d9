#[tokio::main]
async fn main() -> anyhow::Result<()> {
    maxrag_server::start().await
}
