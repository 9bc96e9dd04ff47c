#[tokio::main]
async fn main() -> std::io::Result<()> {
    matching_server::run_with_config().await
}
