//! # Server Metrics
//!
//! Lightweight counters for connections, requests, and errors. No latency
//! histogram: every operation here is an in-memory map lookup, so timing
//! buckets would mostly measure scheduler noise rather than anything a
//! caller can act on.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of server counters at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub requests_total: u64,
    pub captures_total: u64,
    pub releases_total: u64,
    pub errors_total: u64,
    pub leases_expired_total: u64,
}

/// Thread-safe counters. `Ordering::Relaxed` throughout: counters are
/// independent and readers only need eventual consistency, not a
/// cross-field snapshot guarantee.
#[derive(Debug, Default)]
pub struct Metrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    requests_total: AtomicU64,
    captures_total: AtomicU64,
    releases_total: AtomicU64,
    errors_total: AtomicU64,
    leases_expired_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn record_connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_capture(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.captures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.releases_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_leases_expired(&self, count: u64) {
        self.leases_expired_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            captures_total: self.captures_total.load(Ordering::Relaxed),
            releases_total: self.releases_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            leases_expired_total: self.leases_expired_total.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_connection_opened();
        metrics.record_connection_opened();
        metrics.record_connection_closed();
        metrics.record_capture();
        metrics.record_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.connections_total, 2);
        assert_eq!(snap.connections_active, 1);
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.captures_total, 1);
        assert_eq!(snap.errors_total, 1);
    }
}
