//! Prometheus metrics
//!
//! Pull-path counters are bumped by the handlers. Delivery figures live in
//! the controller's atomics and are copied into gauges at scrape time.

use eventsim_core::StatsSnapshot;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, TextEncoder};
use tracing::warn;

use crate::error::ApiError;

fn register<C>(collector: C) -> C
where
    C: prometheus::core::Collector + Clone + 'static,
{
    if let Err(e) = prometheus::register(Box::new(collector.clone())) {
        warn!(error = %e, "Metric registration failed");
    }
    collector
}

fn counter(name: &str, help: &str) -> IntCounter {
    register(IntCounter::new(name, help).expect("static metric definition"))
}

fn gauge(name: &str, help: &str) -> IntGauge {
    register(IntGauge::new(name, help).expect("static metric definition"))
}

pub static EVENTS_SERVED: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "eventsim_events_served_total",
        "Events synthesized for pull requests",
    )
});

pub static SIMULATED_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "eventsim_simulated_errors_total",
        "Pull requests answered with a simulated 503",
    )
});

pub static SIMULATED_STALLS: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "eventsim_simulated_stalls_total",
        "Pull requests delayed by simulated latency",
    )
});

pub static WEBHOOK_BATCHES: Lazy<IntGauge> = Lazy::new(|| {
    gauge(
        "eventsim_webhook_batches_sent",
        "Batches accepted by the webhook",
    )
});

pub static WEBHOOK_EVENTS: Lazy<IntGauge> = Lazy::new(|| {
    gauge(
        "eventsim_webhook_events_sent",
        "Events accepted by the webhook",
    )
});

pub static WEBHOOK_FAILURES: Lazy<IntGauge> = Lazy::new(|| {
    gauge(
        "eventsim_webhook_failures",
        "Batches rejected by the webhook or lost in transport",
    )
});

pub static GENERATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    gauge(
        "eventsim_generator_running",
        "1 while the delivery loop is switched on",
    )
});

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Copy controller state into the delivery gauges
pub fn observe_delivery(stats: &StatsSnapshot, running: bool) {
    WEBHOOK_BATCHES.set(clamp(stats.batches_sent));
    WEBHOOK_EVENTS.set(clamp(stats.events_sent));
    WEBHOOK_FAILURES.set(clamp(stats.failures + stats.serialize_errors));
    GENERATOR_RUNNING.set(i64::from(running));
}

/// Text exposition of the default registry
pub fn render() -> Result<String, ApiError> {
    Lazy::force(&EVENTS_SERVED);
    Lazy::force(&SIMULATED_ERRORS);
    Lazy::force(&SIMULATED_STALLS);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_delivery_gauges() {
        let stats = StatsSnapshot {
            batches_sent: 3,
            events_sent: 17,
            failures: 1,
            serialize_errors: 1,
            active_tasks: 1,
        };
        observe_delivery(&stats, true);

        let text = render().unwrap();
        assert!(text.contains("eventsim_webhook_events_sent 17"));
        assert!(text.contains("eventsim_webhook_failures 2"));
        assert!(text.contains("eventsim_generator_running 1"));
        assert!(text.contains("eventsim_events_served_total"));
    }
}
