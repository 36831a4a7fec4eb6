//! # iotsim-core
//!
//! Foundation layer for the device telemetry pipeline.
//!
//! ### Key Submodules:
//! - `reading`: The immutable sensor sample and its generation ranges
//! - `queue`: Unbounded multi-producer channel between simulators and observers
//! - `sink`: Append-only per-device CSV log
//! - `error`: Storage error types
//!
//! ### Guarantees:
//! - A reading never changes after construction
//! - The queue never blocks producers and never drops items
//! - A sink writes its header exactly once over the life of its file

pub mod error;
pub mod queue;
pub mod reading;
pub mod sink;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::queue::*;
    pub use crate::reading::*;
    pub use crate::sink::*;
}

pub use error::SinkError;
pub use queue::ReadingQueue;
pub use reading::{DeviceStatus, Reading};
pub use sink::{CsvSink, ReadingSink};
