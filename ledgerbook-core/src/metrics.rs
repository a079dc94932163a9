//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_commits_total` - Committed ambient transactions
//! - `ledger_aborts_total` - Transactions aborted by an invariant violation
//! - `ledger_entries_written_total` - Entry rows written by committed transactions
//! - `ledger_commit_duration_seconds` - Histogram of commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed ambient transactions
    pub commits_total: IntCounter,

    /// Transactions aborted at commit by an invariant violation
    pub aborts_total: IntCounter,

    /// Entry rows written by committed transactions
    pub entries_written_total: IntCounter,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let commits_total = IntCounter::with_opts(Opts::new(
            "ledger_commits_total",
            "Committed ambient transactions",
        ))?;
        registry.register(Box::new(commits_total.clone()))?;

        let aborts_total = IntCounter::with_opts(Opts::new(
            "ledger_aborts_total",
            "Transactions aborted by an invariant violation",
        ))?;
        registry.register(Box::new(aborts_total.clone()))?;

        let entries_written_total = IntCounter::with_opts(Opts::new(
            "ledger_entries_written_total",
            "Entry rows written by committed transactions",
        ))?;
        registry.register(Box::new(entries_written_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_commit_duration_seconds",
                "Histogram of commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            commits_total,
            aborts_total,
            entries_written_total,
            commit_duration,
            registry,
        })
    }

    /// Record a successful commit
    pub fn record_commit(&self, duration_seconds: f64) {
        self.commits_total.inc();
        self.commit_duration.observe(duration_seconds);
    }

    /// Record an aborted commit
    pub fn record_abort(&self) {
        self.aborts_total.inc();
    }

    /// Record entry rows written
    pub fn record_entries_written(&self, count: u64) {
        self.entries_written_total.inc_by(count);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.commits_total.get(), 0);
        assert_eq!(metrics.aborts_total.get(), 0);
    }

    #[test]
    fn test_record_commit_and_abort() {
        let metrics = Metrics::new().unwrap();
        metrics.record_commit(0.002);
        metrics.record_commit(0.004);
        metrics.record_abort();
        assert_eq!(metrics.commits_total.get(), 2);
        assert_eq!(metrics.aborts_total.get(), 1);
    }

    #[test]
    fn test_record_entries_written() {
        let metrics = Metrics::new().unwrap();
        metrics.record_entries_written(4);
        metrics.record_entries_written(2);
        assert_eq!(metrics.entries_written_total.get(), 6);
    }
}
