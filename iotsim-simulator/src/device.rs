//! Device simulator: one OS thread per device.
//!
//! Each tick the loop generates a reading, appends it to the device's sink and
//! publishes it to the shared queue. Stopping is cooperative: the flag is read
//! once per iteration, so a stop request is honored within one tick and never
//! interrupts a write.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, error, info};

use iotsim_core::{CsvSink, Reading, ReadingQueue, ReadingSink};
use iotsim_telemetry::{EventLogger, MetricsRecorder};

use crate::error::DeviceError;

pub const DEFAULT_TICK: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Running,
    Stopped,
}

/// A simulated device owning one sink and a handle to the shared queue.
pub struct DeviceSimulator<S: ReadingSink + 'static = CsvSink> {
    device_id: Arc<str>,
    index: usize,
    tick: Duration,
    seed: Option<u64>,
    queue: ReadingQueue,
    metrics: Arc<MetricsRecorder>,
    sink: Option<S>,
    state: DeviceState,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<u64, DeviceError>>>,
}

impl<S: ReadingSink + 'static> DeviceSimulator<S> {
    pub fn new(
        index: usize,
        device_id: impl Into<Arc<str>>,
        sink: S,
        queue: &ReadingQueue,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            index,
            tick: DEFAULT_TICK,
            seed: None,
            queue: queue.share(),
            metrics,
            sink: Some(sink),
            state: DeviceState::Idle,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Makes the reading stream reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// True once the loop thread has exited, whether stopped or failed.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_finished())
    }

    /// `Idle -> Running`: spawns the generation loop on a thread named after the device.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        let sink = match (self.state, self.sink.take()) {
            (DeviceState::Idle, Some(sink)) => sink,
            (state, sink) => {
                self.sink = sink;
                return Err(DeviceError::InvalidState {
                    device_id: self.device_id.to_string(),
                    state,
                });
            }
        };

        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        let worker = DeviceLoop {
            device_id: Arc::clone(&self.device_id),
            index: self.index,
            tick: self.tick,
            rng,
            sink,
            queue: self.queue.share(),
            metrics: Arc::clone(&self.metrics),
            stop: Arc::clone(&self.stop),
        };

        let handle = thread::Builder::new()
            .name(self.device_id.to_string())
            .spawn(move || worker.run())
            .map_err(|source| {
                self.state = DeviceState::Stopped;
                DeviceError::Spawn {
                    device_id: self.device_id.to_string(),
                    source,
                }
            })?;

        info!(device_id = %self.device_id, index = self.index, "Device started");
        self.handle = Some(handle);
        self.state = DeviceState::Running;
        Ok(())
    }

    /// Requests the loop to stop. Takes effect at the top of the next iteration.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if self.state != DeviceState::Stopped {
            debug!(device_id = %self.device_id, "Stop requested");
            self.state = DeviceState::Stopped;
        }
    }

    /// Blocks until the loop thread has exited and returns the number of rows it wrote.
    ///
    /// Without a prior [`stop`](Self::stop) this only returns if the loop fails.
    pub fn join(&mut self) -> Result<u64, DeviceError> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| DeviceError::NotStarted(self.device_id.to_string()))?;

        let outcome = handle.join().map_err(|payload| DeviceError::Panicked {
            device_id: self.device_id.to_string(),
            message: panic_message(payload.as_ref()),
        });
        self.state = DeviceState::Stopped;
        outcome?
    }
}

/// A dropped simulator never leaves its loop running.
impl<S: ReadingSink + 'static> Drop for DeviceSimulator<S> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            let _ = self.join();
        }
    }
}

/// State moved into the device thread.
struct DeviceLoop<S> {
    device_id: Arc<str>,
    index: usize,
    tick: Duration,
    rng: SmallRng,
    sink: S,
    queue: ReadingQueue,
    metrics: Arc<MetricsRecorder>,
    stop: Arc<AtomicBool>,
}

impl<S: ReadingSink> DeviceLoop<S> {
    fn run(mut self) -> Result<u64, DeviceError> {
        let _span = EventLogger::device_span(&self.device_id, self.index).entered();
        let _active = ActiveGuard::new(&self.metrics);
        info!(tick_ms = self.tick.as_millis() as u64, "Device loop started");

        let mut rows = 0u64;
        let mut next_tick = Instant::now();

        while !self.stop.load(Ordering::Acquire) {
            let reading = Reading::generate(&self.device_id, &mut self.rng);
            self.metrics.readings_generated.inc();

            if let Err(source) = self.sink.write(&reading) {
                self.metrics.sink_failures.inc();
                error!(error = %source, rows, "Sink write failed, device loop aborted");
                return Err(DeviceError::Sink {
                    device_id: self.device_id.to_string(),
                    source,
                });
            }
            rows += 1;
            self.metrics.readings_persisted.inc();
            debug!("\n{reading}");

            self.queue.put(reading);

            next_tick += self.tick;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                debug!(
                    behind_ms = (now - next_tick).as_millis() as u64,
                    "Device loop fell behind its tick"
                );
                next_tick = now;
            }
        }

        info!(rows, "Device loop stopped");
        Ok(rows)
    }
}

/// Keeps `active_devices` accurate however the loop exits, panics included.
struct ActiveGuard<'a>(&'a MetricsRecorder);

impl<'a> ActiveGuard<'a> {
    fn new(metrics: &'a MetricsRecorder) -> Self {
        metrics.active_devices.inc();
        Self(metrics)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active_devices.dec();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotsim_core::reading::{TIMESTAMP_FORMAT, HEADER};
    use iotsim_core::SinkError;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;

    const TICK: Duration = Duration::from_millis(50);

    fn metrics() -> Arc<MetricsRecorder> {
        Arc::new(MetricsRecorder::new().unwrap())
    }

    fn csv_device(
        dir: &Path,
        index: usize,
        queue: &ReadingQueue,
        metrics: Arc<MetricsRecorder>,
    ) -> DeviceSimulator {
        DeviceSimulator::new(
            index,
            format!("DEVICE_{index:03}"),
            CsvSink::for_device(dir, "infos", index),
            queue,
            metrics,
        )
        .with_tick(TICK)
    }

    fn data_rows(path: &Path) -> Vec<Vec<String>> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|line| line.split(',').map(str::to_string).collect())
            .collect()
    }

    fn drain(queue: &ReadingQueue) -> Vec<Reading> {
        std::iter::from_fn(|| queue.try_get()).collect()
    }

    #[derive(Clone, Default)]
    struct MemorySink(Arc<Mutex<Vec<Reading>>>);

    impl ReadingSink for MemorySink {
        fn write(&mut self, reading: &Reading) -> Result<(), SinkError> {
            self.0.lock().push(reading.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl ReadingSink for FailingSink {
        fn write(&mut self, _reading: &Reading) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk unavailable")))
        }
    }

    struct PanickingSink;

    impl ReadingSink for PanickingSink {
        fn write(&mut self, _reading: &Reading) -> Result<(), SinkError> {
            panic!("sink exploded");
        }
    }

    #[test]
    fn lifecycle_moves_idle_running_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ReadingQueue::new();
        let mut device = csv_device(dir.path(), 0, &queue, metrics());

        assert_eq!(device.state(), DeviceState::Idle);
        device.start().unwrap();
        assert_eq!(device.state(), DeviceState::Running);
        device.stop();
        assert_eq!(device.state(), DeviceState::Stopped);
        device.join().unwrap();
        assert!(matches!(
            device.start(),
            Err(DeviceError::InvalidState {
                state: DeviceState::Stopped,
                ..
            })
        ));
    }

    #[test]
    fn starting_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ReadingQueue::new();
        let mut device = csv_device(dir.path(), 0, &queue, metrics());

        device.start().unwrap();
        assert!(matches!(
            device.start(),
            Err(DeviceError::InvalidState {
                state: DeviceState::Running,
                ..
            })
        ));
        device.stop();
        device.join().unwrap();
    }

    #[test]
    fn stopping_an_idle_device_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ReadingQueue::new();
        let mut device = csv_device(dir.path(), 0, &queue, metrics());

        device.stop();
        assert_eq!(device.state(), DeviceState::Stopped);
        assert!(device.start().is_err());
        assert!(matches!(device.join(), Err(DeviceError::NotStarted(_))));
        assert!(!dir.path().join("infos-0.csv").exists());
    }

    #[test]
    fn rows_track_elapsed_ticks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ReadingQueue::new();
        let mut device = csv_device(dir.path(), 0, &queue, metrics());

        device.start().unwrap();
        thread::sleep(TICK * 10);
        device.stop();
        let rows = device.join().unwrap();

        // floor(D / T) = 10, allowing one tick of slack either side plus scheduler lag.
        assert!((8..=11).contains(&rows), "rows = {rows}");

        let persisted = data_rows(&dir.path().join("infos-0.csv"));
        assert_eq!(persisted.len() as u64, rows);
        let stamps: Vec<_> = persisted
            .iter()
            .map(|row| chrono::NaiveDateTime::parse_from_str(&row[1], TIMESTAMP_FORMAT).unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert!(persisted.iter().all(|row| row.len() == HEADER.len()));
        assert!(persisted.iter().all(|row| row[0] == "DEVICE_000"));
    }

    #[test]
    fn queue_receives_exactly_what_was_persisted() {
        let queue = ReadingQueue::new();
        let sink = MemorySink::default();
        let persisted = Arc::clone(&sink.0);
        let mut device = DeviceSimulator::new(0, "DEVICE_000", sink, &queue, metrics())
            .with_tick(Duration::from_millis(10));

        device.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        device.stop();
        let rows = device.join().unwrap();

        let published = drain(&queue);
        assert_eq!(published.len() as u64, rows);
        assert_eq!(*persisted.lock(), published);
    }

    #[test]
    fn nothing_is_written_after_join() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ReadingQueue::new();
        let mut device = csv_device(dir.path(), 0, &queue, metrics());
        let path = dir.path().join("infos-0.csv");

        device.start().unwrap();
        thread::sleep(TICK * 2);
        device.stop();
        let rows = device.join().unwrap();
        let published = drain(&queue).len();
        let content = fs::read_to_string(&path).unwrap();

        thread::sleep(TICK * 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert!(queue.is_empty());
        assert_eq!(published as u64, rows);
    }

    #[test]
    fn dropping_a_running_device_stops_its_loop() {
        let queue = ReadingQueue::new();
        let metrics = metrics();
        let sink = MemorySink::default();
        let persisted = Arc::clone(&sink.0);
        let mut device = DeviceSimulator::new(0, "DEVICE_000", sink, &queue, metrics.clone())
            .with_tick(TICK);

        device.start().unwrap();
        queue.get_timeout(Duration::from_secs(5)).unwrap();
        drop(device);

        assert_eq!(metrics.active_devices.get(), 0);
        let written = persisted.lock().len();
        thread::sleep(TICK * 3);
        assert_eq!(persisted.lock().len(), written);
    }

    #[test]
    fn stop_is_honored_within_one_tick() {
        let queue = ReadingQueue::new();
        let tick = Duration::from_millis(300);
        let mut device =
            DeviceSimulator::new(0, "DEVICE_000", MemorySink::default(), &queue, metrics())
                .with_tick(tick);

        device.start().unwrap();
        queue.get_timeout(Duration::from_secs(5)).unwrap();
        let requested = Instant::now();
        device.stop();
        assert_eq!(device.join().unwrap(), 1);
        assert!(requested.elapsed() <= tick + Duration::from_millis(200));
    }

    #[test]
    fn restart_against_existing_file_continues_rows() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ReadingQueue::new();
        let path = dir.path().join("infos-0.csv");

        for _ in 0..2 {
            let mut device = csv_device(dir.path(), 0, &queue, metrics());
            device.start().unwrap();
            queue.get_timeout(Duration::from_secs(5)).unwrap();
            device.stop();
            assert_eq!(device.join().unwrap(), 1);
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().filter(|l| *l == HEADER.join(",")).count(),
            1
        );
        let rows = data_rows(&path);
        assert_eq!(rows.len(), 2);
        assert!(rows[0][1] <= rows[1][1]);
    }

    #[test]
    fn sink_failure_aborts_only_the_loop() {
        let queue = ReadingQueue::new();
        let metrics = metrics();
        let mut device = DeviceSimulator::new(3, "DEVICE_003", FailingSink, &queue, metrics.clone())
            .with_tick(TICK);

        device.start().unwrap();
        let err = device.join().unwrap_err();

        assert!(matches!(err, DeviceError::Sink { .. }));
        assert_eq!(err.device_id(), "DEVICE_003");
        assert_eq!(metrics.sink_failures.get(), 1);
        assert_eq!(metrics.readings_persisted.get(), 0);
        assert_eq!(metrics.active_devices.get(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn loop_panic_is_reported_at_join() {
        let queue = ReadingQueue::new();
        let metrics = metrics();
        let mut device =
            DeviceSimulator::new(1, "DEVICE_001", PanickingSink, &queue, metrics.clone());

        device.start().unwrap();
        match device.join() {
            Err(DeviceError::Panicked { message, .. }) => assert!(message.contains("exploded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(metrics.active_devices.get(), 0);
    }

    #[test]
    fn seeded_devices_are_reproducible() {
        let first_reading = |seed| {
            let queue = ReadingQueue::new();
            let mut device =
                DeviceSimulator::new(0, "DEVICE_000", MemorySink::default(), &queue, metrics())
                    .with_tick(TICK)
                    .with_seed(Some(seed));
            device.start().unwrap();
            let reading = queue.get_timeout(Duration::from_secs(5)).unwrap();
            device.stop();
            device.join().unwrap();
            reading
        };

        let a = first_reading(42);
        let b = first_reading(42);
        assert_eq!(a.temperature(), b.temperature());
        assert_eq!(a.pressure(), b.pressure());
        assert_eq!(a.status(), b.status());
    }
}
