//! HTTP-facing rate limiting, as a tower layer.
//!
//! Everything else in the crate is transport-agnostic; this module is the
//! only place that touches requests and responses. Per request it derives
//! the bucket key, consumes one unit through a [`Counter`], and either
//! short-circuits with a 429 or forwards downstream, always attaching the
//! `X-Rate-Limit-*` headers.

use crate::clock::{Clock, SystemClock};
use crate::counter::Counter;
use crate::error::Error;
use crate::key_generator::KeyStrategy;
use crate::metrics::MetricsCollector;
use crate::quota::Quota;
use crate::response::{apply_rate_limit_headers, too_many_requests};
use crate::store::CounterStore;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Rate-limit layer for an axum router (or any tower stack over axum's
/// request/response types).
///
/// Configuration is copy-on-write: every `with_*` call consumes the
/// receiver and returns a new instance, so a configured layer is immutable
/// and safe to clone and share across routes and requests.
#[derive(Clone)]
pub struct RateLimitLayer {
    quota: Quota,
    store: Arc<dyn CounterStore>,
    key: KeyStrategy,
    auto_consume: bool,
    clock: Arc<dyn Clock>,
    metrics: Option<MetricsCollector>,
}

impl RateLimitLayer {
    pub fn new(quota: Quota, store: Arc<dyn CounterStore>) -> Self {
        Self {
            quota,
            store,
            key: KeyStrategy::default(),
            auto_consume: true,
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    /// Count every request against one fixed bucket.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = KeyStrategy::Static(key.into());
        self
    }

    /// Derive the bucket from the request, e.g. an API key header.
    pub fn with_key_fn<F>(mut self, derive: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key = KeyStrategy::Custom(Arc::new(derive));
        self
    }

    /// Whether the layer spends quota itself (the default). When disabled
    /// the layer only attaches advisory headers from a non-mutating probe
    /// and stores a ready-keyed [`Counter`] in the request extensions for
    /// the handler to consume manually.
    pub fn with_auto_consume(mut self, auto_consume: bool) -> Self {
        self.auto_consume = auto_consume;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record admit/reject outcomes into `metrics`.
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            config: self.clone(),
        }
    }
}

/// The middleware service produced by [`RateLimitLayer`].
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    config: RateLimitLayer,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let key = config.key.derive(&request);
            let counter = Counter::new(config.quota, config.store.clone())
                .with_clock(config.clock.clone())
                .with_key(key.clone());

            if !config.auto_consume {
                let decision = match counter.peek().await {
                    Ok(decision) => decision,
                    Err(err) => return Ok(evaluation_failed(&key, err)),
                };
                request.extensions_mut().insert(counter);
                let mut response = inner.call(request).await?;
                apply_rate_limit_headers(&mut response, &decision);
                return Ok(response);
            }

            match counter.consume().await {
                Ok(decision) if decision.allowed => {
                    if let Some(metrics) = &config.metrics {
                        metrics.record(&key, true).await;
                    }
                    let mut response = inner.call(request).await?;
                    apply_rate_limit_headers(&mut response, &decision);
                    Ok(response)
                }
                Ok(decision) => {
                    if let Some(metrics) = &config.metrics {
                        metrics.record(&key, false).await;
                    }
                    debug!(
                        target: "cellgate::middleware",
                        key = %key,
                        reset_after = decision.reset_after,
                        "request throttled"
                    );
                    Ok(too_many_requests(&decision))
                }
                Err(err) => Ok(evaluation_failed(&key, err)),
            }
        })
    }
}

/// A failed store round-trip surfaces as an error response, never as a
/// silent admit or reject.
fn evaluation_failed(key: &str, err: Error) -> Response {
    warn!(
        target: "cellgate::middleware",
        key = %key,
        error = %err,
        "rate limit evaluation failed"
    );
    err.into_response()
}
