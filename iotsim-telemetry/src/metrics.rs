//! ## iotsim-telemetry::metrics
//! **Prometheus counters for the reading pipeline**
//!
//! Rendered in the text exposition format; no exporter endpoint is served.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub readings_generated: IntCounter,
    pub readings_persisted: IntCounter,
    pub readings_consumed: IntCounter,
    pub sink_failures: IntCounter,
    pub active_devices: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let readings_generated =
            IntCounter::new("iotsim_readings_generated_total", "Readings generated")?;
        let readings_persisted = IntCounter::new(
            "iotsim_readings_persisted_total",
            "Readings appended to device logs",
        )?;
        let readings_consumed = IntCounter::new(
            "iotsim_readings_consumed_total",
            "Readings drained from the queue",
        )?;
        let sink_failures = IntCounter::new(
            "iotsim_sink_failures_total",
            "Device loops aborted by a storage failure",
        )?;
        let active_devices =
            IntGauge::new("iotsim_active_devices", "Device simulators currently running")?;

        registry.register(Box::new(readings_generated.clone()))?;
        registry.register(Box::new(readings_persisted.clone()))?;
        registry.register(Box::new(readings_consumed.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;
        registry.register(Box::new(active_devices.clone()))?;

        Ok(Self {
            registry,
            readings_generated,
            readings_persisted,
            readings_consumed,
            sink_failures,
            active_devices,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// One-line digest logged at shutdown.
    pub fn summary(&self) -> String {
        format!(
            "generated={} persisted={} consumed={} sink_failures={} active_devices={}",
            self.readings_generated.get(),
            self.readings_persisted.get(),
            self.readings_consumed.get(),
            self.sink_failures.get(),
            self.active_devices.get()
        )
    }
}
