//! Beacon matching and detection debounce.
//!
//! The [`Detector`] consumes decoded frames, matches them against the
//! [`Registry`], and keeps a debounced "detected" status. A beacon stays
//! detected until `reset_after` passes without another matching observation.
//! Each beacon fires the first-seen trigger at most once per session.
//!
//! The detector does no I/O and never reads the clock itself: every call
//! takes the current time, which keeps it deterministic under test. The
//! owner is responsible for serializing `observe` and `expire` calls.

use crate::frame::DecodedFrame;
use crate::proximity::{DEFAULT_REFERENCE_POWER, Proximity};
use crate::registry::Registry;
use crate::status::Status;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default debounce window.
pub const DEFAULT_RESET_AFTER: Duration = Duration::from_secs(5);

/// Outcome of a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAction {
    /// Not a UID frame, or not on the allow-list. State is unchanged.
    NoMatch,
    /// Matched a registered beacon that is either still current or was
    /// already opened this session.
    UpdatedExisting,
    /// Matched a registered beacon that became current and had never been
    /// opened this session.
    NewBeaconFirstSeen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// How long a detection is held without a new matching observation
    pub reset_after: Duration,
    /// RSSI at one meter, used for the distance estimate
    pub reference_power: i16,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            reset_after: DEFAULT_RESET_AFTER,
            reference_power: DEFAULT_REFERENCE_POWER,
        }
    }
}

/// Debounced beacon detector for a single scan session.
#[derive(Debug)]
pub struct Detector {
    registry: Arc<Registry>,
    config: DetectorConfig,
    status: Status,
    /// Identifier of the beacon currently considered in range
    current: Option<String>,
    /// Identifiers whose trigger already fired; only ever grows
    opened: HashSet<String>,
    /// The single live reset deadline
    deadline: Option<Instant>,
}

impl Detector {
    pub fn new(registry: Arc<Registry>, config: DetectorConfig) -> Self {
        Detector {
            registry,
            config,
            status: Status::default(),
            current: None,
            opened: HashSet::new(),
            deadline: None,
        }
    }

    /// Feed one observation into the detector.
    ///
    /// Any elapsed deadline is applied first, so an observation that arrives
    /// late is evaluated against the reset state.
    ///
    /// # Arguments
    /// * `frame` - The decoded advertisement
    /// * `rssi` - Signal strength in dBm (0 when the radio had no reading)
    /// * `now` - Time the advertisement was received
    pub fn observe(&mut self, frame: &DecodedFrame, rssi: i16, now: Instant) -> EngineAction {
        self.expire(now);

        let Some((namespace, instance)) = frame.uid() else {
            debug!(kind = %frame.kind, "ignoring frame without UID");
            return EngineAction::NoMatch;
        };

        let Some(target) = self.registry.find(&namespace, &instance) else {
            debug!(%namespace, %instance, "ignoring unregistered beacon");
            return EngineAction::NoMatch;
        };

        let identifier = target.identifier();
        self.deadline = Some(now + self.config.reset_after);
        self.status = Status {
            is_detected: true,
            frame_kind: Some(frame.kind),
            namespace: Some(namespace),
            instance: Some(instance),
            rssi: Some(rssi),
            proximity: Proximity::from_rssi(rssi, self.config.reference_power),
            resource_url: Some(target.resource_url.clone()),
            first_seen_trigger: self.status.first_seen_trigger,
        };

        if self.current.as_deref() == Some(identifier.as_str()) {
            return EngineAction::UpdatedExisting;
        }

        info!(beacon = %identifier, rssi, proximity = %self.status.proximity, "beacon in range");
        self.current = Some(identifier.clone());

        if self.opened.insert(identifier) {
            info!(url = %target.resource_url, "first sighting this session");
            self.status.first_seen_trigger = true;
            EngineAction::NewBeaconFirstSeen
        } else {
            EngineAction::UpdatedExisting
        }
    }

    /// Apply the reset deadline if it has passed.
    ///
    /// Returns `true` if this call moved the detector back to idle.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if let Some(beacon) = self.current.take() {
                    info!(%beacon, "beacon out of range");
                }
                self.status.clear_display();
                true
            }
            _ => false,
        }
    }

    /// The pending reset deadline, if a beacon is being held.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Consume the first-seen pulse. Returns `true` at most once per trigger.
    pub fn take_trigger(&mut self) -> bool {
        std::mem::take(&mut self.status.first_seen_trigger)
    }

    /// Identifier of the beacon currently in range.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn opened(&self) -> impl Iterator<Item = &str> {
        self.opened.iter().map(String::as_str)
    }

    pub fn opened_count(&self) -> usize {
        self.opened.len()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

/// Parse a duration from a human-readable string.
///
/// Accepts `ms`, `s`, `m` and `h` suffixes; a bare number is seconds.
///
/// # Examples
/// ```
/// use eddystone_listener::detector::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
/// assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    const UNITS: &[(&str, u64)] = &[("ms", 1), ("h", 3_600_000), ("m", 60_000), ("s", 1_000)];

    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (number, millis_per_unit) = UNITS
        .iter()
        .find_map(|(suffix, scale)| src.strip_suffix(suffix).map(|n| (n, *scale)))
        .unwrap_or((src, 1_000));

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {src}"))?;

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration too large: {src}"))
}
