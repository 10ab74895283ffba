//! Relay counters and their Prometheus exposition.
//!
//! The relay loop only sees the [`MetricsSink`] trait; the admin surface
//! renders the concrete [`RelayMetrics`] registry.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Counter sink the relay loop reports outcomes to.
pub trait MetricsSink: Send + Sync {
    fn increment_received(&self, count: u64);
    fn increment_forwarded(&self);
    fn increment_error(&self);
}

/// Monotonic relay counters registered in a private registry.
#[derive(Clone)]
pub struct RelayMetrics {
    registry: Registry,
    received: IntCounter,
    forwarded: IntCounter,
    forward_errors: IntCounter,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let received = IntCounter::new(
            "events_received_total",
            "The total number of events received",
        )?;
        let forwarded = IntCounter::new(
            "events_forwarded_total",
            "The total number of events forwarded successfully",
        )?;
        let forward_errors = IntCounter::new(
            "events_forward_error_total",
            "The total number of events that ended in error on forward",
        )?;

        registry.register(Box::new(received.clone()))?;
        registry.register(Box::new(forwarded.clone()))?;
        registry.register(Box::new(forward_errors.clone()))?;

        Ok(Self {
            registry,
            received,
            forwarded,
            forward_errors,
        })
    }

    /// Encode all counters in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn received(&self) -> u64 {
        self.received.get()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.get()
    }

    pub fn forward_errors(&self) -> u64 {
        self.forward_errors.get()
    }
}

impl MetricsSink for RelayMetrics {
    fn increment_received(&self, count: u64) {
        self.received.inc_by(count);
    }

    fn increment_forwarded(&self) {
        self.forwarded.inc();
    }

    fn increment_error(&self) {
        self.forward_errors.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = RelayMetrics::new().unwrap();
        assert_eq!(metrics.received(), 0);
        assert_eq!(metrics.forwarded(), 0);
        assert_eq!(metrics.forward_errors(), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = RelayMetrics::new().unwrap();
        let handle = metrics.clone();

        handle.increment_received(5);
        handle.increment_forwarded();
        handle.increment_error();
        handle.increment_error();

        assert_eq!(metrics.received(), 5);
        assert_eq!(metrics.forwarded(), 1);
        assert_eq!(metrics.forward_errors(), 2);
    }

    #[test]
    fn test_render_exposes_all_counters() {
        let metrics = RelayMetrics::new().unwrap();
        metrics.increment_received(3);
        metrics.increment_forwarded();

        let text = metrics.render().unwrap();
        assert!(text.contains("# TYPE events_received_total counter"));
        assert!(text.contains("events_received_total 3"));
        assert!(text.contains("events_forwarded_total 1"));
        assert!(text.contains("events_forward_error_total 0"));
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = RelayMetrics::new().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.increment_forwarded();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.forwarded(), 1000);
    }
}
