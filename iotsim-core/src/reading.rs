//! Sensor readings produced by the device simulators.
//!
//! A [`Reading`] is generated once per tick and never mutated afterwards.
//! All numeric fields are drawn uniformly from their documented range and
//! rounded to two decimals at generation time.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{DateTime, Local};
use rand::Rng;

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 18.0..=30.0;
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 30.0..=80.0;
pub const BATTERY_RANGE: RangeInclusive<f64> = 20.0..=100.0;
pub const SIGNAL_RANGE: RangeInclusive<f64> = -90.0..=-30.0;
pub const PRESSURE_RANGE: RangeInclusive<f64> = 980.0..=1020.0;

/// Column order shared by the header row and every data row.
pub const HEADER: [&str; 8] = [
    "device_id",
    "timestamp",
    "temperature",
    "humidity",
    "battery_level",
    "signal_strength",
    "status",
    "pressure",
];

/// Timestamp layout used in persisted rows, e.g. `2024-05-01 12:30:45.123456`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Operational state reported by a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Active,
    Idle,
    Error,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 3] = [Self::Active, Self::Idle, Self::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Error => "error",
        }
    }

    /// Picks one of the three states with equal probability.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable simulated sensor sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    device_id: Arc<str>,
    timestamp: DateTime<Local>,
    temperature: f64,
    humidity: f64,
    battery_level: f64,
    signal_strength: f64,
    status: DeviceStatus,
    pressure: f64,
}

impl Reading {
    /// Generates a reading stamped with the current local time.
    pub fn generate<R: Rng + ?Sized>(device_id: &Arc<str>, rng: &mut R) -> Self {
        Self::generate_at(device_id, Local::now(), rng)
    }

    /// Generates a reading with an explicit timestamp.
    pub fn generate_at<R: Rng + ?Sized>(
        device_id: &Arc<str>,
        timestamp: DateTime<Local>,
        rng: &mut R,
    ) -> Self {
        Self {
            device_id: Arc::clone(device_id),
            timestamp,
            temperature: sample(rng, TEMPERATURE_RANGE),
            humidity: sample(rng, HUMIDITY_RANGE),
            battery_level: sample(rng, BATTERY_RANGE),
            signal_strength: sample(rng, SIGNAL_RANGE),
            status: DeviceStatus::random(rng),
            pressure: sample(rng, PRESSURE_RANGE),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn battery_level(&self) -> f64 {
        self.battery_level
    }

    pub fn signal_strength(&self) -> f64 {
        self.signal_strength
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Renders the reading as one CSV row in [`HEADER`] order.
    pub fn to_record(&self) -> [String; 8] {
        [
            self.device_id.to_string(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", self.temperature),
            format!("{:.2}", self.humidity),
            format!("{:.2}", self.battery_level),
            format!("{:.2}", self.signal_strength),
            self.status.as_str().to_string(),
            format!("{:.2}", self.pressure),
        ]
    }

    /// One-line projection used by live observers.
    pub fn summary(&self) -> String {
        format!(
            "Device {} - Temp: {:.2}°C, Humidity: {:.2}%, Battery: {:.2}%",
            self.device_id, self.temperature, self.humidity, self.battery_level
        )
    }
}

/// Multi-line device report.
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IoTDevice {}", self.device_id)?;
        writeln!(
            f,
            "  Timestamp: {}",
            self.timestamp.format(TIMESTAMP_FORMAT)
        )?;
        writeln!(f, "  Temperature: {:.2}°C", self.temperature)?;
        writeln!(f, "  Humidity: {:.2}%", self.humidity)?;
        writeln!(f, "  Battery: {:.2}%", self.battery_level)?;
        writeln!(f, "  Signal: {:.2} dBm", self.signal_strength)?;
        writeln!(f, "  Status: {}", self.status)?;
        write!(f, "  Pressure: {:.2} hPa", self.pressure)
    }
}

/// Uniform draw rounded to two decimals. Bounds are integral, so rounding
/// stays inside the range.
fn sample<R: Rng + ?Sized>(rng: &mut R, range: RangeInclusive<f64>) -> f64 {
    let value = rng.random_range(range);
    (value * 100.0).round() / 100.0
}
