//! Stateful handle that spends quota for one rate-limit key.

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::gcra::{self, RateLimitDecision};
use crate::quota::Quota;
use crate::store::{AtomicCounterStore, CounterStore};
use std::sync::Arc;
use tracing::debug;

/// Attempts before a compare-and-swap consume gives up under contention.
const CAS_ATTEMPTS: usize = 3;

/// Binds a [`Quota`] and a [`CounterStore`] to one rate-limit key.
///
/// The counter itself holds no state across calls; every evaluation reads
/// the stored theoretical arrival time, runs the GCRA computation, and
/// writes the new value back on admit. Clones are cheap and share the
/// underlying store.
#[derive(Clone)]
pub struct Counter {
    quota: Quota,
    store: Arc<dyn CounterStore>,
    atomic: Option<Arc<dyn AtomicCounterStore>>,
    key: Option<String>,
    clock: Arc<dyn Clock>,
}

impl Counter {
    pub fn new(quota: Quota, store: Arc<dyn CounterStore>) -> Self {
        Self {
            quota,
            store,
            atomic: None,
            key: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Construct over a store that supports compare-and-swap, enabling
    /// [`consume_exact`](Self::consume_exact).
    pub fn exact<S>(quota: Quota, store: Arc<S>) -> Self
    where
        S: AtomicCounterStore + 'static,
    {
        Self {
            quota,
            store: store.clone(),
            atomic: Some(store),
            key: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    fn bound_key(&self) -> Result<&str> {
        self.key.as_deref().ok_or(Error::MissingKey)
    }

    /// Consume one unit of quota.
    ///
    /// Admitting persists the new theoretical arrival time with a TTL of one
    /// period; rejecting leaves the store untouched, so a rejected call
    /// spends no capacity. The read-modify-write here is not atomic: under
    /// contention on one key, concurrent calls can admit slightly more than
    /// the configured limit. Use [`consume_exact`](Self::consume_exact) when
    /// that matters.
    pub async fn consume(&self) -> Result<RateLimitDecision> {
        let key = self.bound_key()?;
        let stored = self.store.get(key).await?;
        let eval = gcra::evaluate(self.quota, self.clock.now(), stored);
        if let Some(tat) = eval.new_tat {
            self.store.set(key, tat, self.quota.period()).await?;
        }
        debug!(
            target: "cellgate::counter",
            key = %key,
            allowed = eval.decision.allowed,
            remaining = eval.decision.remaining,
            "consumed"
        );
        Ok(eval.decision)
    }

    /// Consume one unit with an exact admit count, using compare-and-swap.
    ///
    /// Retries a bounded number of times when another writer races the
    /// update, then reports contention instead of guessing. Only available
    /// on counters built with [`exact`](Self::exact).
    pub async fn consume_exact(&self) -> Result<RateLimitDecision> {
        let atomic = self
            .atomic
            .as_ref()
            .ok_or_else(|| Error::Store("store does not support compare-and-swap".to_string()))?;
        let key = self.bound_key()?;

        for _ in 0..CAS_ATTEMPTS {
            let stored = atomic.get(key).await?;
            let eval = gcra::evaluate(self.quota, self.clock.now(), stored);
            match eval.new_tat {
                None => return Ok(eval.decision),
                Some(tat) => {
                    if atomic
                        .set_if_match(key, stored, tat, self.quota.period())
                        .await?
                    {
                        return Ok(eval.decision);
                    }
                }
            }
        }

        Err(Error::StoreContention(key.to_string()))
    }

    /// Report current capacity without consuming any.
    pub async fn peek(&self) -> Result<RateLimitDecision> {
        let key = self.bound_key()?;
        let stored = self.store.get(key).await?;
        Ok(gcra::peek(self.quota, self.clock.now(), stored))
    }
}
