//! # iotsim-engine
//!
//! Wires the reading queue, the live consumer and the device fleet together
//! and shuts them down in order.

pub mod consumer;
pub mod error;
pub mod orchestrator;

pub use consumer::{Consumer, LogObserver, ReadingObserver};
pub use error::EngineError;
pub use orchestrator::{DeviceOutcome, Orchestrator, ShutdownReport};
