use crate::config::Config;
use crate::error::Result;
use crate::handlers::{health_check, index, metrics_snapshot, throttle_status, AppState};
use crate::metrics::MetricsCollector;
use crate::middleware::RateLimitLayer;
use crate::store::{CounterStore, MemoryStore, RedisStore};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct Server {
    app: Router,
    config: Config,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self> {
        let app = create_app(&config).await?;
        Ok(Self { app, config })
    }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| crate::error::Error::Config(format!("failed to bind: {}", e)))?;

        tracing::info!("cellgate listening on {}", self.config.bind_addr);
        tracing::info!(
            "rate limit: {} requests per {}s",
            self.config.rate_limit,
            self.config.rate_period_secs
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::error::Error::Config(format!("server error: {}", e)))?;

        Ok(())
    }
}

/// Build the demo application: a rate-limited route plus the status,
/// health, and metrics endpoints.
pub async fn create_app(config: &Config) -> Result<Router> {
    let (store, backend): (Arc<dyn CounterStore>, &'static str) = if config.redis_url.is_empty() {
        (Arc::new(MemoryStore::new()), "memory")
    } else {
        (
            Arc::new(RedisStore::connect(&config.redis_url).await?),
            "redis",
        )
    };

    let quota = config.quota()?;
    let metrics = MetricsCollector::new();
    let limiter = RateLimitLayer::new(quota, store.clone()).with_metrics(metrics.clone());

    let state = AppState {
        quota,
        store,
        metrics,
        backend,
    };

    let app = Router::new()
        // Rate-limited application surface
        .route("/", get(index))
        .layer(limiter)
        // Introspection endpoints, outside the limiter. Wildcard because
        // derived keys such as "get-/" contain slashes.
        .route("/throttle/*key", get(throttle_status))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_snapshot))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, shutting down");
        },
    }
}
