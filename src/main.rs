use anyhow::Result;
use cellgate::config::Config;
use cellgate::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("cellgate={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting cellgate");
    tracing::info!(
        "configuration: bind_addr={}, backend={}",
        config.bind_addr,
        if config.redis_url.is_empty() {
            "memory"
        } else {
            "redis"
        }
    );

    let server = Server::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}
