use crate::frame::{DecodedFrame, decode};
use crate::registry::Registry;
use crate::status::Status;
use std::sync::Arc;

/// Namespace shared by the built-in tour beacons.
pub const TOUR_NAMESPACE: &str = "00000000000000000001";

/// Instance of the shotgun-house beacon.
pub const SHOTGUN_INSTANCE: &str = "000000000004";

pub const SHOTGUN_URL: &str = "https://example.org/tour/shotgun-house";

/// Build an 18-byte UID frame payload (tag, TX power, namespace, instance).
pub fn uid_payload(namespace: &str, instance: &str) -> Vec<u8> {
    let mut payload = vec![0x00, 0xEE];
    payload.extend(hex::decode(namespace).unwrap());
    payload.extend(hex::decode(instance).unwrap());
    assert_eq!(payload.len(), 18);
    payload
}

pub fn uid_frame(namespace: &str, instance: &str) -> DecodedFrame {
    decode(&uid_payload(namespace, instance))
}

pub fn test_registry() -> Arc<Registry> {
    Arc::new(Registry::builtin().unwrap())
}

/// Status as published right after the shotgun-house beacon was first seen.
pub fn detected_status() -> Status {
    let frame = uid_frame(TOUR_NAMESPACE, SHOTGUN_INSTANCE);
    Status {
        is_detected: true,
        frame_kind: Some(frame.kind),
        namespace: frame.namespace,
        instance: frame.instance,
        rssi: Some(-59),
        proximity: crate::proximity::Proximity::from_rssi(-59, -59),
        resource_url: Some(SHOTGUN_URL.parse().unwrap()),
        first_seen_trigger: true,
    }
}
