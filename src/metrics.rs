//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Pipeline metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub submissions_total: IntCounter,
    pub submission_failures: IntCounterVec,
    pub confirmations: IntCounterVec,
    pub poll_attempts: IntCounter,
    pub poll_query_errors: IntCounter,

    // Subscription lifecycle
    pub subscriptions_opened: IntCounter,
    pub subscriptions_released: IntCounter,
    pub subscription_timeouts: IntCounter,
    pub active_subscriptions: IntGauge,

    // Histograms
    pub rpc_latency: Histogram,
    pub confirmation_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "solconfirm_submissions_total",
            "Transactions handed to the node",
        ))?;

        let submission_failures = IntCounterVec::new(
            Opts::new(
                "solconfirm_submission_failures_total",
                "Submissions refused, by error category",
            ),
            &["category"],
        )?;

        let confirmations = IntCounterVec::new(
            Opts::new(
                "solconfirm_confirmations_total",
                "Finished confirmation waits, by outcome",
            ),
            &["outcome"],
        )?;

        let poll_attempts = IntCounter::with_opts(Opts::new(
            "solconfirm_poll_attempts_total",
            "Signature status queries issued by the poller",
        ))?;

        let poll_query_errors = IntCounter::with_opts(Opts::new(
            "solconfirm_poll_query_errors_total",
            "Signature status queries that failed",
        ))?;

        let subscriptions_opened = IntCounter::with_opts(Opts::new(
            "solconfirm_subscriptions_opened_total",
            "Subscriptions opened",
        ))?;

        let subscriptions_released = IntCounter::with_opts(Opts::new(
            "solconfirm_subscriptions_released_total",
            "Subscriptions released (explicitly or on drop)",
        ))?;

        let subscription_timeouts = IntCounter::with_opts(Opts::new(
            "solconfirm_subscription_timeouts_total",
            "Subscription waits that hit their deadline",
        ))?;

        let active_subscriptions = IntGauge::with_opts(Opts::new(
            "solconfirm_active_subscriptions",
            "Subscriptions currently held",
        ))?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("solconfirm_rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "solconfirm_confirmation_latency_seconds",
                "Time from submission to the end of the confirmation wait",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submission_failures.clone()))?;
        registry.register(Box::new(confirmations.clone()))?;
        registry.register(Box::new(poll_attempts.clone()))?;
        registry.register(Box::new(poll_query_errors.clone()))?;
        registry.register(Box::new(subscriptions_opened.clone()))?;
        registry.register(Box::new(subscriptions_released.clone()))?;
        registry.register(Box::new(subscription_timeouts.clone()))?;
        registry.register(Box::new(active_subscriptions.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submission_failures,
            confirmations,
            poll_attempts,
            poll_query_errors,
            subscriptions_opened,
            subscriptions_released,
            subscription_timeouts,
            active_subscriptions,
            rpc_latency,
            confirmation_latency,
        })
    }

    /// Prometheus text exposition of every registered metric
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_submission_failure(&self, category: &str) {
        self.submission_failures
            .with_label_values(&[category])
            .inc();
    }

    pub fn record_confirmation(&self, outcome: &str, elapsed_secs: f64) {
        self.confirmations.with_label_values(&[outcome]).inc();
        self.confirmation_latency.observe(elapsed_secs);
    }

    pub fn subscription_opened(&self) {
        self.subscriptions_opened.inc();
        self.active_subscriptions.inc();
    }

    pub fn subscription_released(&self) {
        self.subscriptions_released.inc();
        self.active_subscriptions.dec();
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
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
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
