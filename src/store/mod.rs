//! Counter state storage.
//!
//! A [`CounterStore`] is a key/value map with per-key expiry holding one
//! theoretical arrival time per rate-limit key. It is the only shared
//! mutable resource in the crate: counters and the engine keep no state of
//! their own between calls.
//!
//! The plain `get`/`set` contract is deliberately NOT atomic: two concurrent
//! evaluations of the same key can both read a stale value and both admit,
//! so the effective admitted rate can exceed the configured limit under
//! contention. Deployments that need exact limits use an
//! [`AtomicCounterStore`] through [`Counter::consume_exact`].
//!
//! [`Counter::consume_exact`]: crate::counter::Counter::consume_exact

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Stored theoretical arrival time for `key`, or `None` once the key is
    /// unset or expired. Expiry is authoritative: an expired key behaves
    /// exactly like one that was never written.
    async fn get(&self, key: &str) -> Result<Option<f64>>;

    /// Store `value` under `key`, re-arming its expiry to `ttl` from now.
    async fn set(&self, key: &str, value: f64, ttl: Duration) -> Result<()>;

    /// Whether a live (non-expired) value exists for `key`.
    async fn has(&self, key: &str) -> Result<bool>;

    /// Plain integer usage counter for `key`: how many writes its current
    /// entry has absorbed. Backends that do not track one report `None`.
    async fn usage(&self, _key: &str) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Stores that can update a key atomically with compare-and-swap.
#[async_trait]
pub trait AtomicCounterStore: CounterStore {
    /// Write `value` only if the live value for `key` still equals
    /// `expected` (`None` meaning "key must be absent"). Returns `false`
    /// when the comparison fails and nothing was written.
    async fn set_if_match(
        &self,
        key: &str,
        expected: Option<f64>,
        value: f64,
        ttl: Duration,
    ) -> Result<bool>;
}
