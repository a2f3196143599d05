//! ## parkgate-telemetry::metrics
//! **Prometheus exporter for gate activity**
//!
//! Counts pipeline outcomes, token traffic between gates and the waiting
//! time observed for each processed vehicle.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub vehicles: IntCounterVec,
    pub waiting_time: Histogram,
    pub tokens_borrowed: IntCounter,
    pub tokens_lent: IntCounter,
    pub borrow_failures: IntCounter,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let vehicles = IntCounterVec::new(
            Opts::new("parkgate_vehicles_total", "Vehicles leaving the pipeline, by outcome"),
            &["outcome"],
        )?;
        let waiting_time = Histogram::with_opts(
            HistogramOpts::new(
                "parkgate_waiting_time",
                "Virtual time between arrival and the admission decision",
            )
            .buckets(vec![10.0, 100.0, 1_000.0, 10_000.0, 60_000.0, 600_000.0]),
        )?;
        let tokens_borrowed = IntCounter::new(
            "parkgate_tokens_borrowed_total",
            "Tokens obtained from peer gates",
        )?;
        let tokens_lent = IntCounter::new(
            "parkgate_tokens_lent_total",
            "Tokens handed to peer gates",
        )?;
        let borrow_failures = IntCounter::new(
            "parkgate_borrow_failures_total",
            "Borrow attempts that failed at the transport level",
        )?;

        registry.register(Box::new(vehicles.clone()))?;
        registry.register(Box::new(waiting_time.clone()))?;
        registry.register(Box::new(tokens_borrowed.clone()))?;
        registry.register(Box::new(tokens_lent.clone()))?;
        registry.register(Box::new(borrow_failures.clone()))?;

        Ok(Self {
            registry,
            vehicles,
            waiting_time,
            tokens_borrowed,
            tokens_lent,
            borrow_failures,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    #[inline]
    pub fn record_outcome(&self, outcome: &str) {
        self.vehicles.with_label_values(&[outcome]).inc();
    }

    #[inline]
    pub fn observe_waiting_time(&self, waited: u64) {
        self.waiting_time.observe(waited as f64);
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.vehicles.with_label_values(&[outcome]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_counted_per_label() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_outcome("forwarded");
        metrics.record_outcome("forwarded");
        metrics.record_outcome("departed");

        assert_eq!(metrics.outcome_count("forwarded"), 2);
        assert_eq!(metrics.outcome_count("departed"), 1);
        assert_eq!(metrics.outcome_count("dropped"), 0);
    }

    #[test]
    fn exposition_contains_registered_families() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.tokens_lent.inc();
        metrics.observe_waiting_time(42);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("parkgate_tokens_lent_total 1"));
        assert!(text.contains("parkgate_waiting_time_count 1"));
    }
}
