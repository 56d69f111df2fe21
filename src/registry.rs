//! Allow-list of known beacons.
//!
//! Each entry maps an Eddystone UID (namespace + instance) to the web resource
//! that should be opened when the beacon is found. The table is built once at
//! startup and is read-only afterwards; configuration mistakes (bad hex, bad
//! URL, two entries with the same UID) are reported before scanning starts.

use crate::beacon_id::{Instance, Namespace, ParseIdError};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Built-in beacons of the house tour: `(namespace, instance, url)`.
const BUILTIN_BEACONS: &[(&str, &str, &str)] = &[
    (
        "00000000000000000001",
        "000000000001",
        "https://example.org/tour/creole-cottage",
    ),
    (
        "00000000000000000001",
        "000000000002",
        "https://example.org/tour/camelback-house",
    ),
    (
        "00000000000000000001",
        "000000000003",
        "https://example.org/tour/double-gallery-house",
    ),
    (
        "00000000000000000001",
        "000000000004",
        "https://example.org/tour/shotgun-house",
    ),
];

/// Configuration errors in the beacon table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("invalid namespace '{value}': {source}")]
    InvalidNamespace { value: String, source: ParseIdError },
    #[error("invalid instance '{value}': {source}")]
    InvalidInstance { value: String, source: ParseIdError },
    #[error("invalid resource URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("duplicate beacon identifier {0}")]
    DuplicateIdentifier(String),
    #[error("invalid beacon: expected format NAMESPACE:INSTANCE=URL")]
    InvalidFormat,
}

/// A beacon on the allow-list and the resource it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconTarget {
    pub namespace: Namespace,
    pub instance: Instance,
    pub resource_url: Url,
}

impl BeaconTarget {
    /// Build a target from its textual configuration.
    ///
    /// # Errors
    /// Returns a `RegistryError` if either id is not hex of the right length
    /// or the URL does not parse.
    pub fn new(namespace: &str, instance: &str, resource_url: &str) -> Result<Self, RegistryError> {
        let namespace = namespace
            .parse()
            .map_err(|source| RegistryError::InvalidNamespace {
                value: namespace.into(),
                source,
            })?;
        let instance = instance
            .parse()
            .map_err(|source| RegistryError::InvalidInstance {
                value: instance.into(),
                source,
            })?;
        let resource_url =
            Url::parse(resource_url.trim()).map_err(|source| RegistryError::InvalidUrl {
                value: resource_url.into(),
                source,
            })?;

        Ok(Self {
            namespace,
            instance,
            resource_url,
        })
    }

    /// Deduplication key: `NAMESPACE-INSTANCE` in uppercase hex.
    pub fn identifier(&self) -> String {
        format!("{}-{}", self.namespace, self.instance)
    }
}

/// Parse a beacon from a string in the format "NAMESPACE:INSTANCE=URL".
///
/// # Example
/// ```
/// use eddystone_listener::registry::parse_beacon;
///
/// let target = parse_beacon("00000000000000000002:0000000000AA=https://example.org/a").unwrap();
/// assert_eq!(target.identifier(), "00000000000000000002-0000000000AA");
/// ```
pub fn parse_beacon(src: &str) -> Result<BeaconTarget, RegistryError> {
    let (uid, url) = src.split_once('=').ok_or(RegistryError::InvalidFormat)?;
    let (namespace, instance) = uid.split_once(':').ok_or(RegistryError::InvalidFormat)?;
    BeaconTarget::new(namespace, instance, url)
}

/// Read-only table of beacon targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    targets: Vec<BeaconTarget>,
}

impl Registry {
    /// Validate and build a registry.
    ///
    /// # Errors
    /// Returns `RegistryError::DuplicateIdentifier` if two targets share a UID.
    pub fn new(targets: Vec<BeaconTarget>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(targets.len());
        for target in &targets {
            let id = target.identifier();
            if !seen.insert(id.clone()) {
                return Err(RegistryError::DuplicateIdentifier(id));
            }
        }
        Ok(Self { targets })
    }

    /// The compiled-in tour beacons.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_targets()?)
    }

    /// Find a target by hex namespace and instance, ignoring case.
    ///
    /// Inputs that are not valid hex of the right length never match.
    pub fn lookup(&self, namespace_hex: &str, instance_hex: &str) -> Option<&BeaconTarget> {
        let namespace: Namespace = namespace_hex.parse().ok()?;
        let instance: Instance = instance_hex.parse().ok()?;
        self.find(&namespace, &instance)
    }

    pub fn find(&self, namespace: &Namespace, instance: &Instance) -> Option<&BeaconTarget> {
        self.targets
            .iter()
            .find(|t| t.namespace == *namespace && t.instance == *instance)
    }

    pub fn targets(&self) -> &[BeaconTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Parse the compiled-in table into targets.
pub fn builtin_targets() -> Result<Vec<BeaconTarget>, RegistryError> {
    BUILTIN_BEACONS
        .iter()
        .map(|(ns, inst, url)| BeaconTarget::new(ns, inst, url))
        .collect()
}
