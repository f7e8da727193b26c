//! Service metrics
//!
//! Prometheus counters for verification outcomes and gate decisions,
//! exposed on `/metrics`.

use crate::gate::GateOutcome;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

/// Verification and gating counters.
pub struct GateMetrics {
    registry: Registry,
    /// Verification results by error code (or "ok")
    pub verifications: CounterVec,
    /// Terminal gate states per request
    pub gate_outcomes: CounterVec,
}

impl GateMetrics {
    /// Creates and registers the metric families.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let verifications = CounterVec::new(
            Opts::new("verifications_total", "Token verification results").namespace("oidc_gate"),
            &["result"],
        )?;
        registry.register(Box::new(verifications.clone()))?;

        let gate_outcomes = CounterVec::new(
            Opts::new("gate_outcomes_total", "Terminal gate states per request")
                .namespace("oidc_gate"),
            &["outcome"],
        )?;
        registry.register(Box::new(gate_outcomes.clone()))?;

        Ok(Self {
            registry,
            verifications,
            gate_outcomes,
        })
    }

    /// Records a verification result; `result` is "ok" or an error code.
    pub fn record_verification(&self, result: &str) {
        self.verifications.with_label_values(&[result]).inc();
    }

    /// Records a terminal gate state.
    pub fn record_gate(&self, outcome: GateOutcome) {
        self.gate_outcomes
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Renders the registry in Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
