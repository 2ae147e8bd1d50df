use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of publishing telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishStats {
    pub published: u64,
    pub failed: u64,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
}

/// Lock-free publish counters shared by all distribution paths
#[derive(Debug, Default)]
pub struct PublishMetrics {
    published: AtomicU64,
    failed: AtomicU64,
    total_latency_us: AtomicU64,
}

impl PublishMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublishStats {
        let published = self.published.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let total_latency_us = self.total_latency_us.load(Ordering::Relaxed);

        let avg_latency_ms = if published > 0 {
            total_latency_us as f64 / published as f64 / 1000.0
        } else {
            0.0
        };
        let attempts = published + failed;
        let success_rate = if attempts > 0 {
            published as f64 / attempts as f64
        } else {
            1.0
        };

        PublishStats {
            published,
            failed,
            avg_latency_ms,
            success_rate,
        }
    }
}
