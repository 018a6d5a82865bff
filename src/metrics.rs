//! Metrics collection module

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Instant;

/// Client metrics registry
pub struct Metrics {
    registry: Registry,

    // Executor
    pub tx_submitted: IntCounter,
    pub tx_success: IntCounter,
    pub tx_failed: IntCounterVec,
    pub tx_retries: IntCounter,
    pub tx_in_flight: IntGauge,
    pub submit_latency: Histogram,

    // Cache
    pub cache_reads: IntCounter,
    pub cache_read_failures: IntCounterVec,
    pub cache_stale_discarded: IntCounter,

    // Delegation
    pub delegation_local_rejections: IntCounter,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tx_submitted = IntCounter::with_opts(Opts::new(
            "emark_tx_submitted_total",
            "Transactions handed to the wallet backend",
        ))?;

        let tx_success = IntCounter::with_opts(Opts::new(
            "emark_tx_success_total",
            "Transactions the wallet reported as submitted",
        ))?;

        let tx_failed = IntCounterVec::new(
            Opts::new("emark_tx_failed_total", "Failed transactions by error type"),
            &["error_type"],
        )?;

        let tx_retries = IntCounter::with_opts(Opts::new(
            "emark_tx_retries_total",
            "Automatic transaction retries",
        ))?;

        let tx_in_flight = IntGauge::with_opts(Opts::new(
            "emark_tx_in_flight",
            "Executor calls currently in progress",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "emark_submit_latency_seconds",
                "Time from submission to wallet response",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let cache_reads = IntCounter::with_opts(Opts::new(
            "emark_cache_reads_total",
            "Remote reads issued by the state cache",
        ))?;

        let cache_read_failures = IntCounterVec::new(
            Opts::new("emark_cache_read_failures_total", "Failed cache reads by section"),
            &["section"],
        )?;

        let cache_stale_discarded = IntCounter::with_opts(Opts::new(
            "emark_cache_stale_discarded_total",
            "Superseded cache results dropped on arrival",
        ))?;

        let delegation_local_rejections = IntCounter::with_opts(Opts::new(
            "emark_delegation_local_rejections_total",
            "Delegation requests rejected before submission",
        ))?;

        registry.register(Box::new(tx_submitted.clone()))?;
        registry.register(Box::new(tx_success.clone()))?;
        registry.register(Box::new(tx_failed.clone()))?;
        registry.register(Box::new(tx_retries.clone()))?;
        registry.register(Box::new(tx_in_flight.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(cache_reads.clone()))?;
        registry.register(Box::new(cache_read_failures.clone()))?;
        registry.register(Box::new(cache_stale_discarded.clone()))?;
        registry.register(Box::new(delegation_local_rejections.clone()))?;

        Ok(Self {
            registry,
            tx_submitted,
            tx_success,
            tx_failed,
            tx_retries,
            tx_in_flight,
            submit_latency,
            cache_reads,
            cache_read_failures,
            cache_stale_discarded,
            delegation_local_rejections,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_failure(&self, error_type: &str) {
        self.tx_failed.with_label_values(&[error_type]).inc();
    }

    pub fn record_read_failure(&self, section: &str) {
        self.cache_read_failures.with_label_values(&[section]).inc();
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
