//! `eddystone-listener` library.
//!
//! The binary (`src/main.rs`) is responsible for logging setup and process
//! exit codes. Decoding and matching live in [`crate::frame`] and
//! [`crate::detector`]; [`crate::app`] wires them to a scanner so the whole
//! pipeline can be tested with an injected fake scanner.

pub mod app;
pub mod beacon_id;
pub mod detector;
pub mod frame;
pub mod logging;
pub mod output;
pub mod proximity;
pub mod registry;
pub mod scanner;
pub mod status;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use beacon_id::{Instance, Namespace};
pub use detector::{Detector, DetectorConfig, EngineAction, parse_duration};
pub use frame::{DecodedFrame, FrameKind, decode};
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use proximity::Proximity;
pub use registry::{BeaconTarget, Registry, RegistryError, parse_beacon};
pub use scanner::{Advertisement, Backend, ScanError};
pub use status::Status;
