//! Per-run dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for a single dispatch run
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Successful sends
    sent_count: AtomicU64,
    /// Items skipped for missing link or media
    missing_count: AtomicU64,
    /// Items skipped after a provider failure
    failed_count: AtomicU64,
    /// Rate-limit signals received
    rate_limited_count: AtomicU64,
    /// Media handles re-resolved
    refresh_count: AtomicU64,
    /// Progress writes that failed
    persist_failures: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn inc_sent(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn missing_count(&self) -> u64 {
        self.missing_count.load(Ordering::Relaxed)
    }

    pub fn inc_missing(&self) {
        self.missing_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate_limited_count(&self) -> u64 {
        self.rate_limited_count.load(Ordering::Relaxed)
    }

    pub fn inc_rate_limited(&self) {
        self.rate_limited_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn inc_refresh(&self) {
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    pub fn inc_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Skipped items of any kind
    pub fn skipped_count(&self) -> u64 {
        self.missing_count() + self.failed_count()
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            sent: self.sent_count(),
            skipped_missing: self.missing_count(),
            skipped_failed: self.failed_count(),
            rate_limited: self.rate_limited_count(),
            refreshed: self.refresh_count(),
            persist_failures: self.persist_failures(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchMetricsSnapshot {
    pub sent: u64,
    pub skipped_missing: u64,
    pub skipped_failed: u64,
    pub rate_limited: u64,
    pub refreshed: u64,
    pub persist_failures: u64,
}

impl DispatchMetricsSnapshot {
    /// Skipped items of any kind
    pub fn skipped(&self) -> u64 {
        self.skipped_missing + self.skipped_failed
    }
}
