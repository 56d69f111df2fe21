//! Output formatters for detection status.
//!
//! The binary writes one line per status change. Currently supports InfluxDB
//! line protocol.

pub mod influxdb;

use crate::status::Status;
use std::time::SystemTime;

/// Trait for formatting a status snapshot into an output line.
pub trait OutputFormatter: Send + Sync {
    /// Format a status snapshot taken at `timestamp`.
    fn format(&self, status: &Status, timestamp: SystemTime) -> String;
}
