use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable rate policy: at most `limit` admitted events per `period`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    limit: u32,
    #[serde(with = "humantime_serde")]
    period: Duration,
}

impl Quota {
    /// Create a quota. Both parameters must be positive; violating that is a
    /// contract error reported immediately, never corrected at evaluation
    /// time.
    pub fn new(limit: u32, period: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidQuota(
                "limit must be greater than 0".to_string(),
            ));
        }
        if period.as_secs() == 0 {
            return Err(Error::InvalidQuota(
                "period must be at least one second".to_string(),
            ));
        }
        Ok(Self { limit, period })
    }

    pub fn per_second(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(1))
    }

    pub fn per_minute(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ideal spacing between admitted events, in seconds.
    pub fn emission_interval(&self) -> f64 {
        self.period.as_secs_f64() / f64::from(self.limit)
    }

    /// Credit a key can accumulate while idle, in seconds. Equal to the full
    /// period, so an idle key can always burst up to `limit`.
    pub fn burst_tolerance(&self) -> f64 {
        self.period.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_limit() {
        assert!(matches!(
            Quota::new(0, Duration::from_secs(60)),
            Err(Error::InvalidQuota(_))
        ));
    }

    #[test]
    fn rejects_zero_period() {
        assert!(matches!(
            Quota::new(10, Duration::from_secs(0)),
            Err(Error::InvalidQuota(_))
        ));
        assert!(matches!(
            Quota::new(10, Duration::from_millis(500)),
            Err(Error::InvalidQuota(_))
        ));
    }

    #[test]
    fn emission_interval_divides_period_by_limit() {
        let quota = Quota::new(4, Duration::from_secs(60)).unwrap();
        assert_eq!(quota.emission_interval(), 15.0);
        assert_eq!(quota.burst_tolerance(), 60.0);
    }

    #[test]
    fn convenience_constructors() {
        let quota = Quota::per_second(10).unwrap();
        assert_eq!(quota.limit(), 10);
        assert_eq!(quota.period(), Duration::from_secs(1));

        let quota = Quota::per_minute(60).unwrap();
        assert_eq!(quota.emission_interval(), 1.0);
    }

    #[test]
    fn period_serializes_as_humantime() {
        let quota = Quota::new(5, Duration::from_secs(90)).unwrap();
        let json = serde_json::to_string(&quota).unwrap();
        assert!(json.contains("1m 30s"));

        let parsed: Quota = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, quota);
    }
}
