use crate::error::{Error, Result};
use crate::quota::Quota;
use envconfig::Envconfig;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Redis connection URL; empty selects the in-memory store
    #[envconfig(from = "REDIS_URL", default = "")]
    pub redis_url: String,

    /// Admitted requests per period, per rate-limit key
    #[envconfig(from = "RATE_LIMIT", default = "100")]
    pub rate_limit: u32,

    /// Rate-limit period in seconds
    #[envconfig(from = "RATE_PERIOD_SECS", default = "60")]
    pub rate_period_secs: u64,

    /// Default log level for the service target
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Config::init_from_env().map_err(|e| Error::Config(e.to_string()))
    }

    /// The quota the service enforces, validated.
    pub fn quota(&self) -> Result<Quota> {
        Quota::new(self.rate_limit, Duration::from_secs(self.rate_period_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            redis_url: String::new(),
            rate_limit: 5,
            rate_period_secs: 60,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn quota_reflects_the_configured_policy() {
        let quota = base_config().quota().unwrap();
        assert_eq!(quota.limit(), 5);
        assert_eq!(quota.period(), Duration::from_secs(60));
    }

    #[test]
    fn invalid_policy_is_rejected_at_startup() {
        let mut config = base_config();
        config.rate_limit = 0;
        assert!(config.quota().is_err());
    }
}
