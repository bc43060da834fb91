//! Observability infrastructure for the alert service
//!
//! Provides:
//! - Prometheus metrics (alert job runs and outcomes, subscriptions, dataset size)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for alert job duration (in seconds)
const JOB_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<TrackerMetricsInner> = OnceLock::new();

struct TrackerMetricsInner {
    job_runs: IntCounterVec,
    job_duration_seconds: Histogram,
    subscriptions_checked: IntCounter,
    alerts_triggered: IntCounter,
    alerts_skipped: IntCounter,
    records_malformed: IntCounter,
    delivery_failures: IntCounter,
    subscriptions_created: IntCounter,
    side_effect_failures: IntCounterVec,
    dataset_offers: IntGauge,
}

impl TrackerMetricsInner {
    fn new() -> Self {
        Self {
            job_runs: register_int_counter_vec!(
                "gpu_tracker_alert_job_runs_total",
                "Alert job invocations by outcome",
                &["outcome"]
            )
            .expect("Failed to register alert_job_runs_total"),

            job_duration_seconds: register_histogram!(
                "gpu_tracker_alert_job_duration_seconds",
                "Wall-clock time of one alert job run",
                JOB_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register alert_job_duration_seconds"),

            subscriptions_checked: register_int_counter!(
                "gpu_tracker_alert_subscriptions_checked_total",
                "Subscriptions evaluated by the alert job"
            )
            .expect("Failed to register subscriptions_checked_total"),

            alerts_triggered: register_int_counter!(
                "gpu_tracker_alerts_triggered_total",
                "Alerts whose notification was delivered"
            )
            .expect("Failed to register alerts_triggered_total"),

            alerts_skipped: register_int_counter!(
                "gpu_tracker_alerts_skipped_total",
                "Subscriptions suppressed by the cooldown window"
            )
            .expect("Failed to register alerts_skipped_total"),

            records_malformed: register_int_counter!(
                "gpu_tracker_alert_records_malformed_total",
                "Stored subscriptions that could not be read or parsed"
            )
            .expect("Failed to register alert_records_malformed_total"),

            delivery_failures: register_int_counter!(
                "gpu_tracker_alert_delivery_failures_total",
                "Alert notifications that failed to send"
            )
            .expect("Failed to register alert_delivery_failures_total"),

            subscriptions_created: register_int_counter!(
                "gpu_tracker_subscriptions_created_total",
                "Accepted subscription requests"
            )
            .expect("Failed to register subscriptions_created_total"),

            side_effect_failures: register_int_counter_vec!(
                "gpu_tracker_subscribe_side_effect_failures_total",
                "Failed best-effort side effects of a subscription request",
                &["effect"]
            )
            .expect("Failed to register subscribe_side_effect_failures_total"),

            dataset_offers: register_int_gauge!(
                "gpu_tracker_dataset_offers",
                "Number of offers in the last loaded dataset"
            )
            .expect("Failed to register dataset_offers"),
        }
    }
}

/// Tracker metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct TrackerMetrics {
    _private: (),
}

impl Default for TrackerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(TrackerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &TrackerMetricsInner {
        GLOBAL_METRICS.get_or_init(TrackerMetricsInner::new)
    }

    /// Record one finished job run
    pub fn observe_job(&self, ok: bool, duration_secs: f64) {
        let outcome = if ok { "ok" } else { "failed" };
        self.inner().job_runs.with_label_values(&[outcome]).inc();
        self.inner().job_duration_seconds.observe(duration_secs);
    }

    pub fn add_job_counts(&self, checked: u64, triggered: u64, skipped: u64, malformed: u64) {
        let inner = self.inner();
        inner.subscriptions_checked.inc_by(checked);
        inner.alerts_triggered.inc_by(triggered);
        inner.alerts_skipped.inc_by(skipped);
        inner.records_malformed.inc_by(malformed);
    }

    pub fn inc_delivery_failures(&self) {
        self.inner().delivery_failures.inc();
    }

    pub fn inc_subscriptions_created(&self) {
        self.inner().subscriptions_created.inc();
    }

    /// `effect` is `store` or `confirmation`
    pub fn inc_side_effect_failures(&self, effect: &str) {
        self.inner()
            .side_effect_failures
            .with_label_values(&[effect])
            .inc();
    }

    pub fn set_dataset_offers(&self, count: usize) {
        self.inner().dataset_offers.set(count as i64);
    }
}

/// Encode every registered metric in the Prometheus text format
pub fn render_metrics() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}

/// Structured logger for tracker events
///
/// Every event carries a stable `event` field so log pipelines can key on it.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            port = port,
            "Alert service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Alert service shutting down"
        );
    }

    pub fn log_dataset_loaded(&self, offers: usize, last_updated: &str) {
        info!(
            event = "dataset_loaded",
            service = %self.service,
            offers = offers,
            last_updated = %last_updated,
            "Loaded offer dataset"
        );
    }

    pub fn log_subscription_created(&self, key: &str, alert_type: &str, model: &str) {
        info!(
            event = "subscription_created",
            service = %self.service,
            key = %key,
            alert_type = %alert_type,
            model = %model,
            "Subscription accepted"
        );
    }

    pub fn log_side_effect_failed(&self, effect: &str, error: &str) {
        warn!(
            event = "side_effect_failed",
            service = %self.service,
            effect = %effect,
            error = %error,
            "Subscription side effect failed"
        );
    }

    pub fn log_side_effect_skipped(&self, effect: &str) {
        info!(
            event = "side_effect_skipped",
            service = %self.service,
            effect = %effect,
            "Subscription side effect skipped, dependency not configured"
        );
    }

    pub fn log_alert_triggered(&self, key: &str, offer_id: &str, price: f64) {
        info!(
            event = "alert_triggered",
            service = %self.service,
            key = %key,
            offer_id = %offer_id,
            price_per_hour = price,
            "Alert triggered"
        );
    }

    pub fn log_alert_suppressed(&self, key: &str, reason: &str) {
        info!(
            event = "alert_suppressed",
            service = %self.service,
            key = %key,
            reason = %reason,
            "Alert suppressed"
        );
    }

    pub fn log_delivery_failed(&self, key: &str, error: &str) {
        warn!(
            event = "alert_delivery_failed",
            service = %self.service,
            key = %key,
            error = %error,
            "Alert notification failed, will re-evaluate next run"
        );
    }

    pub fn log_record_malformed(&self, key: &str, error: &str) {
        warn!(
            event = "alert_record_malformed",
            service = %self.service,
            key = %key,
            error = %error,
            "Skipping unreadable subscription"
        );
    }

    pub fn log_job_completed(
        &self,
        checked: usize,
        triggered: usize,
        skipped: usize,
        failed: usize,
        duration_secs: f64,
    ) {
        info!(
            event = "alert_job_completed",
            service = %self.service,
            checked = checked,
            triggered = triggered,
            skipped = skipped,
            failed = failed,
            duration_secs = duration_secs,
            "Alert job completed"
        );
    }

    pub fn log_job_failed(&self, error: &str) {
        warn!(
            event = "alert_job_failed",
            service = %self.service,
            error = %error,
            "Alert job aborted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_metrics_render() {
        let metrics = TrackerMetrics::new();
        metrics.observe_job(true, 0.3);
        metrics.add_job_counts(4, 1, 2, 1);
        metrics.inc_delivery_failures();
        metrics.inc_subscriptions_created();
        metrics.inc_side_effect_failures("store");
        metrics.set_dataset_offers(120);

        let text = String::from_utf8(render_metrics().unwrap()).unwrap();
        assert!(text.contains("gpu_tracker_alert_job_runs_total"));
        assert!(text.contains("gpu_tracker_dataset_offers 120"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("alert-api");
        assert_eq!(logger.service, "alert-api");
    }
}
