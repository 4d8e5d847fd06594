//! Redis-backed counter store.

use crate::error::{Error, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::time::Duration;

use super::{AtomicCounterStore, CounterStore};

/// Compare-and-swap as a Lua script so read and write execute atomically on
/// the server. An empty expectation string means "key must be absent".
const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '' then
  if current then return 0 end
elseif current ~= ARGV[1] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
return 1
"#;

/// Counter store on a shared Redis instance.
///
/// One string key per counter, expiry via `PX`, values stored in the exact
/// `f64` display format so compare-and-swap can match on string equality.
/// Keys are namespaced with a prefix so a shared cache cannot collide with
/// other tenants.
pub struct RedisStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisStore {
    /// Connect to `url` and verify the connection with a ping.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::Store(format!("invalid redis url: {}", e)))?;
        let mut conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| Error::Store(format!("failed to connect to redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis ping failed: {}", e)))?;

        Ok(Self {
            conn,
            prefix: "cellgate".to_string(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        (ttl.as_millis() as u64).max(1)
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<f64>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await?;

        raw.map(|s| {
            s.parse::<f64>()
                .map_err(|_| Error::Store(format!("malformed counter value for key '{}'", key)))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: f64, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.full_key(key))
            .arg(value.to_string())
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl AtomicCounterStore for RedisStore {
    async fn set_if_match(
        &self,
        key: &str,
        expected: Option<f64>,
        value: f64,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        let swapped: i64 = redis::cmd("EVAL")
            .arg(CAS_SCRIPT)
            .arg(1)
            .arg(self.full_key(key))
            .arg(expected.map(|v| v.to_string()).unwrap_or_default())
            .arg(value.to_string())
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }
}
