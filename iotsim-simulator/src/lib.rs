// iotsim-simulator/src/lib.rs

/*!
# iotsim Simulator

Device simulators that turn a fixed tick into a stream of sensor readings.

## Key Components:
- **DeviceSimulator:** `Idle -> Running -> Stopped` lifecycle around one OS thread.
- **Device loop:** generate, persist, publish, sleep; stops cooperatively via a flag.
- **DeviceError:** why a loop could not start or why it ended early.
*/

pub mod device;
pub mod error;

pub use device::{DeviceSimulator, DeviceState, DEFAULT_TICK};
pub use error::DeviceError;
