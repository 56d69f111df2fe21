//! Eddystone frame decoding.
//!
//! Eddystone beacons advertise under the 16-bit service UUID `0xFEAA`. The
//! service data payload starts with a frame-type tag; only UID frames carry
//! the namespace/instance pair used for matching. Other frame types are
//! recognized by tag and otherwise left alone.
//!
//! See: https://github.com/google/eddystone/blob/master/protocol-specification.md

use crate::beacon_id::{Instance, Namespace};
use std::fmt;

/// 16-bit Bluetooth SIG service UUID assigned to Eddystone.
pub const EDDYSTONE_SERVICE_UUID: u16 = 0xFEAA;

/// Minimum length of a UID frame that still carries a complete instance.
pub const UID_FRAME_MIN_LEN: usize = 18;

const UID_NAMESPACE: std::ops::Range<usize> = 2..12;
const UID_INSTANCE: std::ops::Range<usize> = 12..18;

/// Eddystone frame type, taken from the first byte of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Uid,
    Url,
    Tlm,
    Eid,
    Unknown,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Uid => "UID",
            FrameKind::Url => "URL",
            FrameKind::Tlm => "TLM",
            FrameKind::Eid => "EID",
            FrameKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of decoding a single advertisement payload.
///
/// `namespace` and `instance` are only ever present for [`FrameKind::Uid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub kind: FrameKind,
    pub namespace: Option<Namespace>,
    pub instance: Option<Instance>,
}

impl DecodedFrame {
    fn kind_only(kind: FrameKind) -> Self {
        Self {
            kind,
            namespace: None,
            instance: None,
        }
    }

    pub fn unknown() -> Self {
        Self::kind_only(FrameKind::Unknown)
    }

    /// Namespace as 20 uppercase hex characters.
    pub fn namespace_hex(&self) -> Option<String> {
        self.namespace.map(|ns| ns.to_hex())
    }

    /// Instance as 12 uppercase hex characters.
    pub fn instance_hex(&self) -> Option<String> {
        self.instance.map(|inst| inst.to_hex())
    }

    /// Namespace and instance, if this is a complete UID frame.
    pub fn uid(&self) -> Option<(Namespace, Instance)> {
        match (self.kind, self.namespace, self.instance) {
            (FrameKind::Uid, Some(ns), Some(inst)) => Some((ns, inst)),
            _ => None,
        }
    }
}

/// Decode an Eddystone service data payload.
///
/// Never fails: empty, truncated, or unrecognized payloads decode to
/// [`FrameKind::Unknown`] because partial frames are routine on the air.
///
/// # Arguments
/// * `payload` - Service data bytes for UUID `0xFEAA` (without the UUID itself)
pub fn decode(payload: &[u8]) -> DecodedFrame {
    let Some(&tag) = payload.first() else {
        return DecodedFrame::unknown();
    };

    match tag {
        0x00 => decode_uid(payload),
        0x10 => DecodedFrame::kind_only(FrameKind::Url),
        0x20 => DecodedFrame::kind_only(FrameKind::Tlm),
        0x30 => DecodedFrame::kind_only(FrameKind::Eid),
        _ => DecodedFrame::unknown(),
    }
}

// Byte 1 is the calibrated TX power at 0 m; bytes 18..20 are reserved.
fn decode_uid(payload: &[u8]) -> DecodedFrame {
    if payload.len() < UID_FRAME_MIN_LEN {
        return DecodedFrame::unknown();
    }

    match (
        Namespace::from_slice(&payload[UID_NAMESPACE]),
        Instance::from_slice(&payload[UID_INSTANCE]),
    ) {
        (Some(namespace), Some(instance)) => DecodedFrame {
            kind: FrameKind::Uid,
            namespace: Some(namespace),
            instance: Some(instance),
        },
        _ => DecodedFrame::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SHOTGUN_INSTANCE, TOUR_NAMESPACE, uid_payload};

    #[test]
    fn test_decode_empty_payload() {
        assert_eq!(decode(&[]), DecodedFrame::unknown());
    }

    #[test]
    fn test_decode_uid_frame() {
        let frame = decode(&uid_payload(TOUR_NAMESPACE, SHOTGUN_INSTANCE));
        assert_eq!(frame.kind, FrameKind::Uid);
        assert_eq!(frame.namespace_hex().as_deref(), Some(TOUR_NAMESPACE));
        assert_eq!(frame.instance_hex().as_deref(), Some(SHOTGUN_INSTANCE));
    }

    #[test]
    fn test_decode_uid_with_reserved_bytes() {
        let mut payload = uid_payload(TOUR_NAMESPACE, SHOTGUN_INSTANCE);
        payload.extend_from_slice(&[0x00, 0x00]);
        let frame = decode(&payload);
        assert_eq!(frame.instance_hex().as_deref(), Some(SHOTGUN_INSTANCE));
    }

    #[test]
    fn test_decode_uid_slices_exact_offsets() {
        let payload: Vec<u8> = (0u8..18).collect();
        let frame = decode(&payload);

        let (ns, inst) = frame.uid().unwrap();
        assert_eq!(ns.as_bytes(), &payload[2..12]);
        assert_eq!(inst.as_bytes(), &payload[12..18]);
        assert_eq!(frame.namespace_hex().unwrap(), "02030405060708090A0B");
        assert_eq!(frame.instance_hex().unwrap(), "0C0D0E0F1011");

        // Rendered hex decodes back to the original sub-slices.
        assert_eq!(hex::decode(frame.namespace_hex().unwrap()).unwrap(), &payload[2..12]);
        assert_eq!(hex::decode(frame.instance_hex().unwrap()).unwrap(), &payload[12..18]);
    }

    #[test]
    fn test_decode_truncated_uid_is_unknown() {
        let full = uid_payload(TOUR_NAMESPACE, SHOTGUN_INSTANCE);
        for len in 1..UID_FRAME_MIN_LEN {
            assert_eq!(
                decode(&full[..len]),
                DecodedFrame::unknown(),
                "length {len} should not decode"
            );
        }
    }

    #[test]
    fn test_decode_other_frame_types() {
        assert_eq!(decode(&[0x10, 0xEB, 0x03]).kind, FrameKind::Url);
        assert_eq!(decode(&[0x20, 0x00]).kind, FrameKind::Tlm);
        assert_eq!(decode(&[0x30, 0x00]).kind, FrameKind::Eid);
        assert_eq!(decode(&[0x40]).kind, FrameKind::Unknown);
        assert_eq!(decode(&[0xFF; 20]).kind, FrameKind::Unknown);

        let url = decode(&[0x10; 20]);
        assert!(url.namespace.is_none());
        assert!(url.instance.is_none());
        assert!(url.uid().is_none());
    }

    #[test]
    fn test_frame_kind_display() {
        assert_eq!(FrameKind::Uid.to_string(), "UID");
        assert_eq!(FrameKind::Tlm.to_string(), "TLM");
        assert_eq!(FrameKind::Unknown.to_string(), "Unknown");
    }
}
