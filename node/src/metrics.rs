//! # Prometheus Metrics
//!
//! Exposes operational metrics for the exchange node. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics
//! port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of successful wrap operations.
    pub wraps_total: IntCounter,
    /// Total number of successful retirement operations.
    pub retirements_total: IntCounter,
    /// Total number of rejected requests (validation or balance failures).
    pub rejections_total: IntCounter,
    /// Total VRD tokens issued by wraps.
    pub tokens_wrapped_total: Counter,
    /// Total VRD tokens burned by retirements.
    pub tokens_retired_total: Counter,
    /// Total tons of CO2e offset purchased.
    pub carbon_tons_total: Counter,
    /// Histogram of ledger operation latency in seconds.
    pub operation_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("verdant".into()), None)
            .expect("failed to create prometheus registry");

        let wraps_total = IntCounter::new(
            "wraps_total",
            "Total number of successful credit wrap operations",
        )
        .expect("metric creation");
        registry
            .register(Box::new(wraps_total.clone()))
            .expect("metric registration");

        let retirements_total = IntCounter::new(
            "retirements_total",
            "Total number of successful token retirement operations",
        )
        .expect("metric creation");
        registry
            .register(Box::new(retirements_total.clone()))
            .expect("metric registration");

        let rejections_total = IntCounter::new(
            "rejections_total",
            "Total number of rejected wrap or retirement requests",
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejections_total.clone()))
            .expect("metric registration");

        let tokens_wrapped_total =
            Counter::new("tokens_wrapped_total", "Total VRD tokens issued by wraps")
                .expect("metric creation");
        registry
            .register(Box::new(tokens_wrapped_total.clone()))
            .expect("metric registration");

        let tokens_retired_total = Counter::new(
            "tokens_retired_total",
            "Total VRD tokens burned by retirements",
        )
        .expect("metric creation");
        registry
            .register(Box::new(tokens_retired_total.clone()))
            .expect("metric registration");

        let carbon_tons_total = Counter::new(
            "carbon_tons_total",
            "Total tons of CO2e offset purchased through retirements",
        )
        .expect("metric creation");
        registry
            .register(Box::new(carbon_tons_total.clone()))
            .expect("metric registration");

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "End-to-end ledger operation latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            wraps_total,
            retirements_total,
            rejections_total,
            tokens_wrapped_total,
            tokens_retired_total,
            carbon_tons_total,
            operation_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = NodeMetrics::new();
        metrics.wraps_total.inc();
        metrics.tokens_wrapped_total.inc_by(100.0);
        metrics.carbon_tons_total.inc_by(0.05);

        let body = metrics.encode().unwrap();
        assert!(body.contains("verdant_wraps_total 1"));
        assert!(body.contains("verdant_tokens_wrapped_total 100"));
        assert!(body.contains("verdant_carbon_tons_total"));
    }
}
