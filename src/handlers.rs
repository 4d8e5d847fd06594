use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::counter::Counter;
use crate::error::Result;
use crate::key_generator;
use crate::metrics::{KeyMetrics, MetricsCollector};
use crate::quota::Quota;
use crate::store::CounterStore;

/// Shared state for the demo service. Everything here is immutable or
/// internally synchronized, so the state is a plain cheap clone.
#[derive(Clone)]
pub struct AppState {
    pub quota: Quota,
    pub store: Arc<dyn CounterStore>,
    pub metrics: MetricsCollector,
    /// Which store backend the service was started with.
    pub backend: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ThrottleStatus {
    pub key: String,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: u64,
    /// Writes absorbed by the key's current window, when the backend
    /// tracks a usage counter.
    pub usage: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub version: &'static str,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub aggregate: KeyMetrics,
    pub keys: HashMap<String, KeyMetrics>,
}

/// Demo route sitting behind the rate-limit layer.
pub async fn index() -> &'static str {
    "OK"
}

/// Advisory status for a key: current capacity without consuming any.
pub async fn throttle_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ThrottleStatus>> {
    let key = key_generator::sanitize(&key);
    let counter = Counter::new(state.quota, state.store.clone()).with_key(key.clone());

    let decision = counter.peek().await?;
    let usage = state.store.usage(&key).await?;

    Ok(Json(ThrottleStatus {
        key,
        limit: decision.limit,
        remaining: decision.remaining,
        reset_after: decision.reset_after,
        usage,
    }))
}

/// Liveness plus store reachability.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_reachable = state.store.has("health/probe").await.is_ok();

    Json(HealthResponse {
        status: if store_reachable { "healthy" } else { "degraded" },
        backend: state.backend,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    })
}

/// Admit/reject counts, per key and in aggregate.
pub async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        aggregate: state.metrics.aggregate().await,
        keys: state.metrics.snapshot().await,
    })
}
