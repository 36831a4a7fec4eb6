//! Orchestrator: starts the consumer and the device fleet, then shuts the
//! fleet down in creation order.
//!
//! Startup sequence:
//! 1. Validate configuration and create the output directory
//! 2. Create the shared queue
//! 3. Spawn the consumer
//! 4. Start `devices.count` simulators, ids `<id_prefix><index:03>`
//!
//! Shutdown requests a stop from every device in creation order, then joins
//! them one after the other. Each join waits for at most one tick, so the
//! whole shutdown is bounded by `count × tick`.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use iotsim_config::IotsimConfig;
use iotsim_core::{CsvSink, ReadingQueue};
use iotsim_simulator::{DeviceError, DeviceSimulator};
use iotsim_telemetry::MetricsRecorder;

use crate::consumer::{Consumer, LogObserver, ReadingObserver};
use crate::error::EngineError;

/// How one device's loop ended.
#[derive(Debug)]
pub struct DeviceOutcome {
    pub device_id: String,
    /// Rows written, or the error that ended the loop.
    pub result: Result<u64, DeviceError>,
}

#[derive(Debug)]
pub struct ShutdownReport {
    pub outcomes: Vec<DeviceOutcome>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    pub fn total_rows(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct Orchestrator {
    queue: ReadingQueue,
    devices: Vec<DeviceSimulator>,
    metrics: Arc<MetricsRecorder>,
}

impl Orchestrator {
    /// Starts the fleet with the logging observer.
    pub fn start(
        config: &IotsimConfig,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, EngineError> {
        Self::start_with_observer(config, LogObserver, metrics)
    }

    #[instrument(skip_all, fields(devices = config.devices.count))]
    pub fn start_with_observer<O: ReadingObserver>(
        config: &IotsimConfig,
        observer: O,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, EngineError> {
        let config = config.clone().validated()?;
        let storage = &config.storage;
        fs::create_dir_all(&storage.output_dir).map_err(|source| EngineError::OutputDir {
            path: storage.output_dir.clone(),
            source,
        })?;

        let queue = ReadingQueue::new();
        Consumer::spawn(&queue, observer, Arc::clone(&metrics))?;

        let mut orchestrator = Self {
            queue,
            devices: Vec::with_capacity(config.devices.count),
            metrics,
        };

        for index in 0..config.devices.count {
            let sink = CsvSink::for_device(&storage.output_dir, &storage.file_prefix, index);
            let mut device = DeviceSimulator::new(
                index,
                config.devices.device_id(index),
                sink,
                &orchestrator.queue,
                Arc::clone(&orchestrator.metrics),
            )
            .with_tick(config.devices.tick())
            .with_seed(config.devices.device_seed(index));

            if let Err(e) = device.start() {
                error!(device_id = device.device_id(), error = %e, "Device failed to start");
                orchestrator.shutdown();
                return Err(e.into());
            }
            orchestrator.devices.push(device);
        }

        info!(
            devices = orchestrator.devices.len(),
            tick_ms = config.devices.tick_ms,
            output_dir = %storage.output_dir.display(),
            "All devices started"
        );
        Ok(orchestrator)
    }

    /// Blocks on `wait_for_signal`, then shuts the fleet down.
    pub fn run_until<F: FnOnce()>(self, wait_for_signal: F) -> ShutdownReport {
        wait_for_signal();
        info!("Termination requested");
        self.shutdown()
    }

    /// Stops every device, then joins them in creation order.
    pub fn shutdown(mut self) -> ShutdownReport {
        let started = Instant::now();
        let mut devices = std::mem::take(&mut self.devices);
        info!(devices = devices.len(), "Stopping devices");

        for device in devices.iter_mut() {
            device.stop();
        }

        let outcomes = devices
            .iter_mut()
            .map(|device| {
                let result = device.join();
                match &result {
                    Ok(rows) => info!(device_id = device.device_id(), rows, "Device joined"),
                    Err(e) => warn!(device_id = device.device_id(), error = %e, "Device ended with error"),
                }
                DeviceOutcome {
                    device_id: device.device_id().to_string(),
                    result,
                }
            })
            .collect();

        let report = ShutdownReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        info!(
            total_rows = report.total_rows(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Shutdown complete"
        );
        report
    }

    pub fn devices(&self) -> &[DeviceSimulator] {
        &self.devices
    }

    /// Devices whose loop already ended without a stop request (storage failure or panic).
    pub fn finished_early(&self) -> impl Iterator<Item = &str> {
        self.devices
            .iter()
            .filter(|device| device.is_finished())
            .map(|device| device.device_id())
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        for device in self.devices.iter_mut() {
            device.stop();
        }
        for device in self.devices.iter_mut() {
            let _ = device.join();
        }
    }
}
