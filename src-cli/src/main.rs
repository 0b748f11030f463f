#[tokio::main]
async fn main() -> anyhow::Result<()> {
    varia_cli::run().await
}
