use podcast_rss_bridge::{shutdown_signal, AppConfig, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = Server::bind(&config).await?;
    tracing::info!("Listening on {}", server.local_addr()?);
    server.serve_until(shutdown_signal()).await?;
    tracing::info!("Server stopped");

    Ok(())
}
