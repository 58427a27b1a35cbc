// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Downstream reads (throughput, latency, outcome per dependency)
// - Event publishing (handed off, failed by reason)
// - Dependency liveness as seen by the last probe
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Metrics registry shared by the readers, the publisher and the prober
pub struct Metrics {
    registry: Registry,

    // Downstream Read Metrics
    pub downstream_requests: IntCounterVec,
    pub downstream_duration: HistogramVec,

    // Publish Metrics
    pub events_published: IntCounterVec,
    pub events_failed: IntCounterVec,

    // Health Metrics
    pub dependency_up: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let downstream_requests = IntCounterVec::new(
            Opts::new("downstream_requests_total", "Total downstream read calls"),
            &["dependency", "outcome"],
        )?;
        registry.register(Box::new(downstream_requests.clone()))?;

        let downstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "downstream_request_duration_seconds",
                "Downstream read call duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["dependency"],
        )?;
        registry.register(Box::new(downstream_duration.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Total events delivered to the backbone"),
            &["channel", "event_type"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let events_failed = IntCounterVec::new(
            Opts::new("events_failed_total", "Total events that were never delivered"),
            &["channel", "reason"],
        )?;
        registry.register(Box::new(events_failed.clone()))?;

        let dependency_up = IntGaugeVec::new(
            Opts::new("dependency_up", "Dependency liveness from the last probe (1=up, 0=down)"),
            &["dependency"],
        )?;
        registry.register(Box::new(dependency_up.clone()))?;

        Ok(Self {
            registry,
            downstream_requests,
            downstream_duration,
            events_published,
            events_failed,
            dependency_up,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record one downstream read
    pub fn record_downstream(&self, dependency: &str, outcome: &str, duration_secs: f64) {
        self.downstream_requests
            .with_label_values(&[dependency, outcome])
            .inc();
        self.downstream_duration
            .with_label_values(&[dependency])
            .observe(duration_secs);
    }

    /// Helper to record a delivered event
    pub fn record_event_published(&self, channel: &str, event_type: &str) {
        self.events_published
            .with_label_values(&[channel, event_type])
            .inc();
    }

    /// Helper to record an event that did not reach the backbone
    pub fn record_event_failed(&self, channel: &str, reason: &str) {
        self.events_failed.with_label_values(&[channel, reason]).inc();
    }

    pub fn set_dependency_up(&self, dependency: &str, up: bool) {
        self.dependency_up
            .with_label_values(&[dependency])
            .set(i64::from(up));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_downstream("product", "success", 0.01);
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_downstream() {
        let metrics = Metrics::new().unwrap();
        metrics.record_downstream("product", "success", 0.05);
        metrics.record_downstream("review", "suppressed", 0.05);
        metrics.record_downstream("review", "suppressed", 0.02);

        let gathered = metrics.registry.gather();
        let requests = gathered
            .iter()
            .find(|m| m.name() == "downstream_requests_total")
            .unwrap();
        assert_eq!(requests.metric.len(), 2); // Two different label pairs
    }

    #[test]
    fn test_record_event_failed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_event_failed("products-out-0", "backbone");
        metrics.record_event_failed("products-out-0", "backbone");

        let gathered = metrics.registry.gather();
        let failed = gathered
            .iter()
            .find(|m| m.name() == "events_failed_total")
            .unwrap();
        assert_eq!(failed.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_dependency_up_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_dependency_up("product", true);
        metrics.set_dependency_up("product", false);

        let gathered = metrics.registry.gather();
        let up = gathered.iter().find(|m| m.name() == "dependency_up").unwrap();
        assert_eq!(up.metric[0].gauge.value, Some(0.0));
    }
}
