//! Prometheus metrics, held in an injected struct rather than the
//! process-wide default registry so tests can build a fresh set.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, TextEncoder};

pub struct Metrics {
    registry: prometheus::Registry,
    pub wol_sent: IntCounter,
    pub wol_failed: IntCounter,
    pub machine_not_found: IntCounter,
    pub machines_listed: IntCounter,
    pub machines_retrieved: IntCounter,
    pub request_duration: Histogram,
    pub configured_machines: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Metrics, prometheus::Error> {
        let registry = prometheus::Registry::new();

        let wol_sent = IntCounter::with_opts(Opts::new(
            "lanwake_wol_packets_sent_total",
            "Total number of WoL packets successfully sent",
        ))?;
        let wol_failed = IntCounter::with_opts(Opts::new(
            "lanwake_wol_packets_failed_total",
            "Total number of WoL packet send failures",
        ))?;
        let machine_not_found = IntCounter::with_opts(Opts::new(
            "lanwake_machine_not_found_total",
            "Total number of machine not found errors",
        ))?;
        let machines_listed = IntCounter::with_opts(Opts::new(
            "lanwake_machines_listed_total",
            "Total number of times the machine list was requested",
        ))?;
        let machines_retrieved = IntCounter::with_opts(Opts::new(
            "lanwake_machines_retrieved_total",
            "Total number of times a machine was retrieved by ID",
        ))?;
        let request_duration = Histogram::with_opts(HistogramOpts::new(
            "lanwake_request_duration_seconds",
            "Request latency in seconds",
        ))?;
        let configured_machines = IntGauge::with_opts(Opts::new(
            "lanwake_configured_machines_total",
            "Number of configured machines in the allowlist",
        ))?;

        registry.register(Box::new(wol_sent.clone()))?;
        registry.register(Box::new(wol_failed.clone()))?;
        registry.register(Box::new(machine_not_found.clone()))?;
        registry.register(Box::new(machines_listed.clone()))?;
        registry.register(Box::new(machines_retrieved.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(configured_machines.clone()))?;

        Ok(Metrics {
            registry,
            wol_sent,
            wol_failed,
            machine_not_found,
            machines_listed,
            machines_retrieved,
            request_duration,
            configured_machines,
        })
    }

    /// Text exposition of every registered metric, for the /metrics
    /// endpoint.
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
