//! BlueZ D-Bus backend for Eddystone scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.
//!
//! Discovery runs with duplicate data enabled so that every advertisement
//! updates the device's RSSI and service data; each update is forwarded.

use super::{ADVERTISEMENT_CHANNEL_BUFFER_SIZE, Advertisement, ScanError};
use bluer::{
    Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session, Uuid,
};
use futures::{StreamExt, pin_mut};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Eddystone service UUID expanded onto the Bluetooth base UUID.
pub const EDDYSTONE_UUID: Uuid = Uuid::from_u128(0x0000_feaa_0000_1000_8000_0080_5f9b_34fb);

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start scanning for Eddystone beacons using the BlueZ D-Bus backend.
///
/// The adapter is powered on and LE discovery is filtered to the Eddystone
/// service UUID. Discovery runs in a spawned task that owns all Bluetooth
/// state; setup errors are reported before this function returns.
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    adapter
        .set_discovery_filter(DiscoveryFilter {
            uuids: [EDDYSTONE_UUID].into_iter().collect(),
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        })
        .await?;

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(), ScanError>>();

    tokio::spawn(async move {
        // Keep the session alive for as long as discovery runs
        let _session = session;

        let events = match adapter.discover_devices_with_changes().await {
            Ok(events) => {
                let _ = ready_tx.send(Ok(()));
                events
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e.into()));
                return;
            }
        };
        pin_mut!(events);

        while let Some(event) = events.next().await {
            if let AdapterEvent::DeviceAdded(address) = event {
                if let Err(e) = process_device(&adapter, address, &tx).await {
                    debug!(%address, error = %e, "skipping device");
                }
                if tx.is_closed() {
                    break;
                }
            }
        }
        error!("BlueZ discovery stream ended");
    });

    ready_rx
        .await
        .map_err(|_| ScanError::Bluetooth("discovery task exited during setup".into()))??;

    Ok(rx)
}

/// Forward the Eddystone service data of a discovered or updated device.
async fn process_device(
    adapter: &Adapter,
    address: Address,
    tx: &mpsc::Sender<Advertisement>,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;

    let Some(service_data) = device.service_data().await? else {
        return Ok(());
    };
    let Some(payload) = service_data.get(&EDDYSTONE_UUID) else {
        return Ok(()); // Not an Eddystone advertisement
    };

    let rssi = device.rssi().await?.unwrap_or(0);
    let _ = tx
        .send(Advertisement {
            service_data: payload.clone(),
            rssi,
            received_at: Instant::now(),
        })
        .await;

    Ok(())
}
