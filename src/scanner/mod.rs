//! BLE scanner backends delivering Eddystone advertisements.
//!
//! Backends only filter and forward: each advertisement that carries
//! Eddystone service data (UUID `0xFEAA`) is sent through a channel as an
//! [`Advertisement`]. Decoding and matching happen downstream.

#[cfg(feature = "bluer")]
pub mod bluer;

#[cfg(feature = "hci")]
pub mod hci;

use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;

/// Eddystone service UUID as it appears on the air (little-endian).
#[cfg(any(feature = "bluer", feature = "hci"))]
pub const EDDYSTONE_UUID_BYTES: [u8; 2] = crate::frame::EDDYSTONE_SERVICE_UUID.to_le_bytes();

/// Bluetooth "Service Data - 16-bit UUID" AD type.
#[cfg(any(feature = "bluer", feature = "hci"))]
pub const SERVICE_DATA_16_TYPE: u8 = 0x16;

/// Channel buffer size for advertisements.
pub const ADVERTISEMENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// One Eddystone advertisement as received from the radio.
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    /// Service data for UUID `0xFEAA`, starting at the frame-type byte
    pub service_data: Vec<u8>,
    /// Signal strength in dBm; 0 when the radio reported no reading
    pub rssi: i16,
    /// When the advertisement was received
    pub received_at: Instant,
}

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Backend not available (not compiled in)
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(String),
}

/// Available scanner backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// BlueZ D-Bus backend (requires bluetoothd daemon)
    #[cfg(feature = "bluer")]
    Bluer,
    /// Raw HCI socket backend (direct kernel access, no daemon required)
    #[cfg(feature = "hci")]
    Hci,
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "bluer")]
        return Backend::Bluer;
        #[cfg(all(feature = "hci", not(feature = "bluer")))]
        return Backend::Hci;
        #[cfg(not(any(feature = "bluer", feature = "hci")))]
        compile_error!("At least one backend feature must be enabled");
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "bluer")]
            Backend::Bluer => write!(f, "bluer"),
            #[cfg(feature = "hci")]
            Backend::Hci => write!(f, "hci"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "bluer")]
            "bluer" | "bluez" => Ok(Backend::Bluer),
            #[cfg(feature = "hci")]
            "hci" | "raw" => Ok(Backend::Hci),
            _ => Err(ScanError::BackendNotAvailable(s.to_string())),
        }
    }
}

/// Start scanning for Eddystone beacons using the specified backend.
///
/// # Returns
/// A receiver of advertisements. The channel closes when the backend stops.
pub async fn start_scan(backend: Backend) -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    tracing::info!(%backend, "starting scan");
    match backend {
        #[cfg(feature = "bluer")]
        Backend::Bluer => bluer::start_scan().await,
        #[cfg(feature = "hci")]
        Backend::Hci => hci::start_scan().await,
    }
}
