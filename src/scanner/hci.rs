//! Raw HCI socket backend for Eddystone scanning.
//!
//! This backend uses raw Linux HCI sockets to scan for BLE advertisements
//! without requiring the BlueZ daemon. It requires CAP_NET_RAW and
//! CAP_NET_ADMIN capabilities or root privileges.

use super::{
    ADVERTISEMENT_CHANNEL_BUFFER_SIZE, Advertisement, EDDYSTONE_UUID_BYTES, SERVICE_DATA_16_TYPE,
    ScanError,
};
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Instant;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;
const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Passive scan, 10ms interval and window (0.625ms units), public address,
// accept all advertisers.
const LE_SCAN_PARAMETERS: [u8; 7] = [0x00, 0x10, 0x00, 0x10, 0x00, 0x00, 0x00];
// Enable, do not filter duplicates: every advertisement refreshes the RSSI.
const LE_SCAN_ENABLE: [u8; 2] = [0x01, 0x00];

/// RSSI byte a controller reports when no reading is available.
const RSSI_NOT_AVAILABLE: i8 = 127;

/// Max HCI event size: header (3) + 255 bytes of parameters.
const HCI_MAX_EVENT_SIZE: usize = 258;

#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    /// Filter that passes only LE meta events.
    fn le_meta_events() -> Self {
        let mut filter = Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        };
        filter.type_mask |= 1 << u32::from(HCI_EVENT_PKT);
        let bit = usize::from(EVT_LE_META_EVENT);
        filter.event_mask[bit / 32] |= 1 << (bit % 32);
        filter
    }
}

fn os_error(what: &str) -> ScanError {
    ScanError::Bluetooth(format!("{what}: {}", io::Error::last_os_error()))
}

/// A raw HCI socket bound to one controller.
struct HciSocket(OwnedFd);

impl HciSocket {
    fn open(dev_id: u16) -> Result<Self, ScanError> {
        // SOCK_NONBLOCK is required for AsyncFd
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                SOCK_RAW | SOCK_CLOEXEC | SOCK_NONBLOCK,
                BTPROTO_HCI,
            )
        };
        if fd < 0 {
            return Err(os_error("Failed to create HCI socket"));
        }
        let socket = HciSocket(unsafe { OwnedFd::from_raw_fd(fd) });

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as u16,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };
        let ret = unsafe {
            libc::bind(
                socket.0.as_raw_fd(),
                &addr as *const SockaddrHci as *const sockaddr,
                mem::size_of::<SockaddrHci>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(os_error("Failed to bind HCI socket"));
        }

        Ok(socket)
    }

    fn set_filter(&self, filter: &HciFilter) -> Result<(), ScanError> {
        let ret = unsafe {
            libc::setsockopt(
                self.0.as_raw_fd(),
                SOL_HCI,
                HCI_FILTER,
                filter as *const HciFilter as *const c_void,
                mem::size_of::<HciFilter>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(os_error("Failed to set HCI filter"));
        }
        Ok(())
    }

    fn send_command(&self, ogf: u16, ocf: u16, params: &[u8]) -> Result<(), ScanError> {
        let packet = hci_command_packet(ogf, ocf, params);
        let ret = unsafe {
            libc::write(
                self.0.as_raw_fd(),
                packet.as_ptr() as *const c_void,
                packet.len(),
            )
        };
        if ret < 0 {
            return Err(os_error("Failed to send HCI command"));
        }
        Ok(())
    }
}

/// Create an HCI command packet.
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// Find Eddystone service data in a block of AD structures.
fn find_eddystone_service_data(ad_data: &[u8]) -> Option<&[u8]> {
    let mut offset = 0;
    while offset + 2 <= ad_data.len() {
        let len = usize::from(ad_data[offset]);
        if len == 0 || offset + 1 + len > ad_data.len() {
            break;
        }

        let structure = &ad_data[offset + 1..offset + 1 + len];
        if structure[0] == SERVICE_DATA_16_TYPE
            && structure.len() >= 3
            && structure[1..3] == EDDYSTONE_UUID_BYTES
        {
            return Some(&structure[3..]);
        }

        offset += 1 + len;
    }
    None
}

/// Split one advertising report off the front of `reports`.
///
/// Returns the AD data, the raw RSSI byte and the remaining reports.
fn next_report(reports: &[u8]) -> Option<(&[u8], u8, &[u8])> {
    // event_type(1) + addr_type(1) + address(6) + data_len(1)
    let data_len = usize::from(*reports.get(8)?);
    let ad_data = reports.get(9..9 + data_len)?;
    let rssi = *reports.get(9 + data_len)?;
    Some((ad_data, rssi, &reports[10 + data_len..]))
}

/// Convert a report's RSSI byte to dBm; 0 when the controller had no reading.
fn rssi_dbm(raw: u8) -> i16 {
    match raw as i8 {
        RSSI_NOT_AVAILABLE => 0,
        dbm => i16::from(dbm),
    }
}

/// Parse an LE advertising report event into Eddystone advertisements.
///
/// Controllers may batch several reports into one event. Advertisers that
/// carry no Eddystone data are skipped; parsing stops at a truncated report.
fn parse_advertising_reports(event: &[u8], received_at: Instant) -> Vec<Advertisement> {
    let mut advertisements = Vec::new();

    // packet type, event code, parameter length, subevent, num_reports
    let Some((&num_reports, mut reports)) = event.get(4..).and_then(<[u8]>::split_first) else {
        return advertisements;
    };

    for index in 0..num_reports {
        let Some((ad_data, rssi, rest)) = next_report(reports) else {
            debug!(index, num_reports, "truncated advertising report");
            break;
        };
        reports = rest;

        if let Some(service_data) = find_eddystone_service_data(ad_data) {
            advertisements.push(Advertisement {
                service_data: service_data.to_vec(),
                rssi: rssi_dbm(rssi),
                received_at,
            });
        }
    }

    advertisements
}

/// Start scanning for Eddystone beacons using raw HCI sockets on `hci0`.
///
/// # Requirements
/// - CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges
/// - An available HCI device (typically hci0)
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    let events = HciSocket::open(0)?;
    events.set_filter(&HciFilter::le_meta_events())?;

    // Commands go through a separate socket bound to the same controller
    let commands = HciSocket::open(0)?;
    commands.send_command(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &LE_SCAN_PARAMETERS)?;
    commands.send_command(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &LE_SCAN_ENABLE)?;

    let async_fd = AsyncFd::new(events.0)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {e}")))?;

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    tokio::spawn(async move {
        let _commands = commands;
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        loop {
            let mut guard = match async_fd.readable().await {
                Ok(guard) => guard,
                Err(e) => {
                    warn!(error = %e, "HCI socket no longer readable");
                    break;
                }
            };

            // Drain all available packets before waiting again
            loop {
                let read = guard.try_io(|inner| {
                    let ret = unsafe {
                        libc::read(
                            inner.as_raw_fd(),
                            buf.as_mut_ptr() as *mut c_void,
                            buf.len(),
                        )
                    };
                    if ret < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(ret as usize)
                    }
                });
                let n = match read {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Err(e)) => {
                        debug!(error = %e, "HCI read failed");
                        break;
                    }
                    _ => break, // EOF or WouldBlock
                };

                let packet = &buf[..n];
                if n < 4
                    || packet[0] != HCI_EVENT_PKT
                    || packet[1] != EVT_LE_META_EVENT
                    || packet[3] != EVT_LE_ADVERTISING_REPORT
                {
                    continue;
                }
                for advertisement in parse_advertising_reports(packet, Instant::now()) {
                    if tx.send(advertisement).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    Ok(rx)
}
