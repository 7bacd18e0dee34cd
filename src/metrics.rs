//! Prometheus metrics for the Handoff core, mirroring the teacher's
//! `Metrics` struct: an `Arc`-cheap-clone registry-backed collector set,
//! registered once at construction, updated via atomic operations on the
//! request hot path.
//!
//! Per SPEC_FULL.md §2: counters for verdicts by error category, a
//! histogram of verifier round-trip latency, a gauge for the active
//! transport channel generation, and StoreQuery command counters.

use std::time::Instant;

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder, TEXT_FORMAT};

use crate::types::{ErrorCategory, Verdict};

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    /// Verdicts by `{category}` (`none`, `transport`, `auth`, `internal`).
    pub verdicts_total: IntCounterVec,
    /// Round-trip latency of the outbound Verifier call.
    pub verifier_duration_seconds: Histogram,
    /// Monotonically increasing generation of the currently active
    /// transport channel — bumped every time the RCO swaps it, so a scrape
    /// can tell whether a rebuild has happened since the last one.
    pub transport_channel_generation: Gauge,
    /// StoreQuery commands by `{command, outcome}` (`ok`, `error`).
    pub storequery_commands_total: IntCounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let verdicts_total = IntCounterVec::new(
            Opts::new("handoff_verdicts_total", "Authentication verdicts by error category"),
            &["category"],
        )
        .unwrap();
        registry.register(Box::new(verdicts_total.clone())).unwrap();

        let verifier_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "handoff_verifier_duration_seconds",
                "Round-trip latency of the outbound call to the Authenticator",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )
        .unwrap();
        registry.register(Box::new(verifier_duration_seconds.clone())).unwrap();

        let transport_channel_generation = Gauge::new(
            "handoff_transport_channel_generation",
            "Generation counter of the active transport channel, bumped on every RCO rebuild",
        )
        .unwrap();
        registry.register(Box::new(transport_channel_generation.clone())).unwrap();

        let storequery_commands_total = IntCounterVec::new(
            Opts::new("handoff_storequery_commands_total", "StoreQuery commands dispatched, by command and outcome"),
            &["command", "outcome"],
        )
        .unwrap();
        registry.register(Box::new(storequery_commands_total.clone())).unwrap();

        Metrics {
            registry,
            verdicts_total,
            verifier_duration_seconds,
            transport_channel_generation,
            storequery_commands_total,
        }
    }

    /// Record one completed authentication attempt's outcome.
    pub fn record_verdict(&self, verdict: &Verdict) {
        let category = match verdict {
            Verdict::Ok(_) => ErrorCategory::NoError,
            Verdict::Err(err) => err.category,
        };
        self.verdicts_total.with_label_values(&[category.as_label()]).inc();
    }

    pub fn start_verifier_timer(&self) -> Instant {
        Instant::now()
    }

    pub fn observe_verifier_duration(&self, started: Instant) {
        self.verifier_duration_seconds.observe(started.elapsed().as_secs_f64());
    }

    pub fn record_channel_rebuild(&self) {
        self.transport_channel_generation.inc();
    }

    pub fn record_storequery_command(&self, command: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.storequery_commands_total.with_label_values(&[command, outcome]).inc();
    }

    /// Render the registry in Prometheus text exposition format, for the
    /// demo binary's `GET /metrics` handler.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }

    pub fn content_type(&self) -> &'static str {
        TEXT_FORMAT
    }
}
