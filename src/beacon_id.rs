//! Fixed-size Eddystone UID identifiers.
//!
//! An Eddystone UID is split into a 10-byte namespace and a 6-byte instance.
//! Both are rendered as uppercase hex with no separators and parse
//! case-insensitively, so `"ab12"` and `"AB12"` name the same beacon.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw bytes of an identifier with a fixed length of `N` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexId<const N: usize>(pub [u8; N]);

/// 10-byte Eddystone namespace.
pub type Namespace = HexId<10>;

/// 6-byte Eddystone instance.
pub type Instance = HexId<6>;

impl<const N: usize> HexId<N> {
    /// Number of hex characters in the rendered form.
    pub const HEX_LEN: usize = N * 2;

    /// Copy an identifier out of a slice of exactly `N` bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; N]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Uppercase hex rendering, `2 * N` characters long.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl<const N: usize> fmt::Display for HexId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Errors returned when parsing an identifier from hex.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseIdError {
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("'{0}' is not valid hex")]
    InvalidHex(String),
}

impl<const N: usize> FromStr for HexId<N> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(ParseIdError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }

        let mut bytes = [0u8; N];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError::InvalidHex(s.into()))?;
        Ok(Self(bytes))
    }
}

impl<const N: usize> From<[u8; N]> for HexId<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_uppercase_without_separators() {
        let ns = Namespace::from([0xAB, 0xCD, 0xEF, 0, 0, 0, 0, 0, 0, 0x01]);
        assert_eq!(ns.to_string(), "ABCDEF00000000000001");
        assert_eq!(ns.to_string().len(), Namespace::HEX_LEN);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        let upper: Instance = "00000000ABCD".parse().unwrap();
        let lower: Instance = "00000000abcd".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.0, [0, 0, 0, 0, 0xAB, 0xCD]);
    }

    #[test]
    fn test_from_str_wrong_length() {
        assert_eq!(
            "0001".parse::<Instance>(),
            Err(ParseIdError::InvalidLength {
                expected: 12,
                actual: 4
            })
        );
        assert!(matches!(
            "000000000000000000011".parse::<Namespace>(),
            Err(ParseIdError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_from_str_invalid_hex() {
        assert!(matches!(
            "00000000000G".parse::<Instance>(),
            Err(ParseIdError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert_eq!(
            Instance::from_slice(&[1, 2, 3, 4, 5, 6]),
            Some(HexId([1, 2, 3, 4, 5, 6]))
        );
        assert_eq!(Instance::from_slice(&[1, 2, 3]), None);
    }

    #[test]
    fn test_hex_round_trip() {
        let ns = Namespace::from([0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xA0]);
        let parsed: Namespace = ns.to_hex().parse().unwrap();
        assert_eq!(parsed, ns);
    }
}
