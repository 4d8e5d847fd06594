use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Admit/reject counts for one rate-limit key.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct KeyMetrics {
    pub total: u64,
    pub allowed: u64,
    pub throttled: u64,
}

/// In-process counters for rate-limit outcomes, keyed by bucket.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    per_key: Arc<RwLock<HashMap<String, KeyMetrics>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, key: &str, allowed: bool) {
        let mut per_key = self.per_key.write().await;
        let metrics = per_key.entry(key.to_string()).or_default();

        metrics.total += 1;
        if allowed {
            metrics.allowed += 1;
        } else {
            metrics.throttled += 1;
        }
    }

    pub async fn for_key(&self, key: &str) -> Option<KeyMetrics> {
        self.per_key.read().await.get(key).copied()
    }

    pub async fn snapshot(&self) -> HashMap<String, KeyMetrics> {
        self.per_key.read().await.clone()
    }

    /// Totals across every key.
    pub async fn aggregate(&self) -> KeyMetrics {
        let per_key = self.per_key.read().await;
        let mut total = KeyMetrics::default();
        for metrics in per_key.values() {
            total.total += metrics.total;
            total.allowed += metrics.allowed;
            total.throttled += metrics.throttled;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_per_key_outcomes() {
        let collector = MetricsCollector::new();

        collector.record("a", true).await;
        collector.record("a", true).await;
        collector.record("a", false).await;

        let metrics = collector.for_key("a").await.unwrap();
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.allowed, 2);
        assert_eq!(metrics.throttled, 1);

        assert!(collector.for_key("b").await.is_none());
    }

    #[tokio::test]
    async fn aggregate_sums_all_keys() {
        let collector = MetricsCollector::new();

        collector.record("a", true).await;
        collector.record("b", false).await;
        collector.record("c", true).await;

        let total = collector.aggregate().await;
        assert_eq!(total.total, 3);
        assert_eq!(total.allowed, 2);
        assert_eq!(total.throttled, 1);
        assert_eq!(collector.snapshot().await.len(), 3);
    }
}
