//! ## iotsim-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! - `RUST_LOG` wins over the configured level
//! - Thread names are on by default; every simulator thread carries its device id
//! - Device threads run inside a `device` span so their events are attributable

use tracing::{info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init(level: &str, thread_names: bool) -> Result<(), InitError> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
            )
            .with_thread_names(thread_names)
            .try_init()
    }

    /// Span entered by a simulator thread for its whole lifetime.
    #[inline]
    pub fn device_span(device_id: &str, index: usize) -> Span {
        info_span!("device", device_id = device_id, index = index)
    }

    /// Span entered by the consumer thread.
    #[inline]
    pub fn consumer_span() -> Span {
        info_span!("consumer")
    }
}
