//! Live observation of the reading stream.
//!
//! The consumer drains the shared queue on a detached background thread and
//! never persists anything. It has no shutdown path of its own: it lives
//! as long as the process and does not hold up process exit.

use std::sync::Arc;
use std::thread;

use tracing::{info, trace};

use iotsim_core::{Reading, ReadingQueue};
use iotsim_telemetry::{EventLogger, MetricsRecorder};

use crate::error::EngineError;

/// Receives every reading drained from the queue, exactly once.
pub trait ReadingObserver: Send + 'static {
    fn observe(&mut self, reading: &Reading);
}

/// Default observer: logs the one-line summary of each reading.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ReadingObserver for LogObserver {
    fn observe(&mut self, reading: &Reading) {
        info!("{}", reading.summary());
    }
}

pub struct Consumer;

impl Consumer {
    /// Spawns the detached `consumer` thread.
    pub fn spawn<O: ReadingObserver>(
        queue: &ReadingQueue,
        mut observer: O,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<(), EngineError> {
        let queue = queue.share();

        thread::Builder::new()
            .name("consumer".into())
            .spawn(move || {
                let _span = EventLogger::consumer_span().entered();
                info!("Consumer started");
                loop {
                    let reading = queue.get();
                    metrics.readings_consumed.inc();
                    trace!(device_id = reading.device_id(), "Reading consumed");
                    observer.observe(&reading);
                }
            })
            .map_err(EngineError::ConsumerSpawn)?;

        Ok(())
    }
}
