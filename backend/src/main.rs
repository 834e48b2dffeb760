#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tidyup::start_server().await
}
