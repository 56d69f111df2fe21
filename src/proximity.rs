//! Distance estimate from received signal strength.
//!
//! Uses the log-distance path-loss curve fitted for BLE beacons, relative to
//! the power measured at one meter from the transmitter.

use std::fmt;

/// Default RSSI at one meter, in dBm.
pub const DEFAULT_REFERENCE_POWER: i16 = -59;

const IMMEDIATE_LIMIT_METERS: f64 = 1.0;
const NEAR_LIMIT_METERS: f64 = 5.0;

/// Estimated distance band, carrying the estimate in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Proximity {
    /// No usable reading.
    #[default]
    Unknown,
    /// Less than one meter away.
    Immediate(f64),
    /// One to five meters away.
    Near(f64),
    /// Five meters or more.
    Far(f64),
}

impl Proximity {
    /// Estimate proximity from an RSSI reading.
    ///
    /// An RSSI of exactly 0 means the radio had no reading and yields
    /// [`Proximity::Unknown`].
    ///
    /// # Arguments
    /// * `rssi` - Received signal strength in dBm
    /// * `reference_power` - RSSI measured at one meter, in dBm
    pub fn from_rssi(rssi: i16, reference_power: i16) -> Self {
        if rssi == 0 || reference_power == 0 {
            return Proximity::Unknown;
        }
        Self::from_meters(estimate_meters(rssi, reference_power))
    }

    /// Classify a distance in meters into a band.
    pub fn from_meters(meters: f64) -> Self {
        if !meters.is_finite() || meters < 0.0 {
            Proximity::Unknown
        } else if meters < IMMEDIATE_LIMIT_METERS {
            Proximity::Immediate(meters)
        } else if meters < NEAR_LIMIT_METERS {
            Proximity::Near(meters)
        } else {
            Proximity::Far(meters)
        }
    }

    pub fn meters(&self) -> Option<f64> {
        match *self {
            Proximity::Unknown => None,
            Proximity::Immediate(m) | Proximity::Near(m) | Proximity::Far(m) => Some(m),
        }
    }

    /// Band name without the numeric estimate.
    pub fn band(&self) -> &'static str {
        match self {
            Proximity::Unknown => "Unknown",
            Proximity::Immediate(_) => "Immediate",
            Proximity::Near(_) => "Near",
            Proximity::Far(_) => "Far",
        }
    }
}

impl fmt::Display for Proximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.meters() {
            Some(m) => write!(f, "{} ({:.2} m)", self.band(), m),
            None => f.write_str(self.band()),
        }
    }
}

fn estimate_meters(rssi: i16, reference_power: i16) -> f64 {
    let ratio = f64::from(rssi) / f64::from(reference_power);
    if ratio < 1.0 {
        ratio.powi(10)
    } else {
        0.89976 * ratio.powf(7.7095) + 0.111
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(rssi: i16) -> Proximity {
        Proximity::from_rssi(rssi, DEFAULT_REFERENCE_POWER)
    }

    #[test]
    fn test_zero_rssi_is_unknown() {
        assert_eq!(estimate(0), Proximity::Unknown);
        assert_eq!(estimate(0).to_string(), "Unknown");
    }

    #[test]
    fn test_reference_power_takes_curve_branch() {
        // ratio == 1.0 is not < 1.0, so the fitted curve applies: 0.89976 + 0.111
        let p = estimate(-59);
        assert!(matches!(p, Proximity::Near(_)));
        assert!((p.meters().unwrap() - 1.01076).abs() < 1e-9);
        assert_eq!(p.to_string(), "Near (1.01 m)");
    }

    #[test]
    fn test_stronger_than_reference_is_immediate() {
        let p = estimate(-40);
        assert!(matches!(p, Proximity::Immediate(_)));
        assert_eq!(p.to_string(), "Immediate (0.02 m)");
        assert_eq!(estimate(-58).to_string(), "Immediate (0.84 m)");
    }

    #[test]
    fn test_bands() {
        assert_eq!(estimate(-65).to_string(), "Near (2.01 m)");
        assert_eq!(estimate(-75).to_string(), "Far (5.83 m)");
        assert_eq!(estimate(-90).band(), "Far");
    }

    #[test]
    fn test_distance_increases_with_lower_rssi() {
        let mut last = 0.0;
        for rssi in (-100..=-30).rev() {
            let m = estimate(rssi).meters().unwrap();
            assert!(m > last, "rssi {rssi} should be farther than the previous reading");
            last = m;
        }
    }

    #[test]
    fn test_from_meters_edges() {
        assert_eq!(Proximity::from_meters(-0.5), Proximity::Unknown);
        assert_eq!(Proximity::from_meters(f64::NAN), Proximity::Unknown);
        assert_eq!(Proximity::from_meters(0.999).band(), "Immediate");
        assert_eq!(Proximity::from_meters(1.0).band(), "Near");
        assert_eq!(Proximity::from_meters(5.0).band(), "Far");
    }
}
