//! Published detection status.

use crate::beacon_id::{Instance, Namespace};
use crate::frame::FrameKind;
use crate::proximity::Proximity;
use url::Url;

/// Snapshot of what the detector currently believes is in range.
///
/// Display fields always describe the most recent matching observation.
/// When the debounce window runs out they are cleared, except
/// `resource_url`, which keeps the last known resource so a late manual
/// action can still use it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Status {
    /// A registered beacon was seen within the debounce window
    pub is_detected: bool,
    /// Frame type of the last matching observation
    pub frame_kind: Option<FrameKind>,
    /// Namespace of the last matching beacon
    pub namespace: Option<Namespace>,
    /// Instance of the last matching beacon
    pub instance: Option<Instance>,
    /// RSSI of the last matching observation in dBm
    pub rssi: Option<i16>,
    /// Distance estimate derived from `rssi`
    pub proximity: Proximity,
    /// Resource of the last matching beacon (survives a reset)
    pub resource_url: Option<Url>,
    /// One-shot pulse, set when a beacon is seen for the first time this
    /// session. Consumers clear it with `Detector::take_trigger`.
    pub first_seen_trigger: bool,
}

impl Status {
    /// Frame kind label for display, `"-"` when nothing is detected.
    pub fn frame_kind_label(&self) -> &'static str {
        self.frame_kind.map_or("-", |k| k.as_str())
    }

    pub fn namespace_hex(&self) -> Option<String> {
        self.namespace.map(|ns| ns.to_hex())
    }

    pub fn instance_hex(&self) -> Option<String> {
        self.instance.map(|inst| inst.to_hex())
    }

    /// Return to the resting state, keeping the resource URL.
    pub(crate) fn clear_display(&mut self) {
        *self = Status {
            resource_url: self.resource_url.take(),
            first_seen_trigger: self.first_seen_trigger,
            ..Status::default()
        };
    }
}
