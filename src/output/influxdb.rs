//! InfluxDB line protocol output formatter.

use crate::output::OutputFormatter;
use crate::status::Status;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::String(s) => {
                // Only double quotes and backslashes need escaping in string fields
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\"")
            }
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<&'static str, String>,
    pub field_set: BTreeMap<&'static str, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        for (key, value) in &self.tag_set {
            write!(fmt, ",{key}={value}")?;
        }

        for (i, (key, value)) in self.field_set.iter().enumerate() {
            let sep = if i == 0 { " " } else { "," };
            write!(fmt, "{sep}{key}={value}")?;
        }

        // Timestamps before the epoch are dropped rather than wrapped
        if let Some(nanos) = self
            .timestamp
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
        {
            write!(fmt, " {nanos}")?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Beacon identity goes into tags; detection state, signal and distance go
/// into fields. Fields without a value are omitted.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn tag_set(status: &Status) -> BTreeMap<&'static str, String> {
        let mut tags = BTreeMap::new();
        if let Some(kind) = status.frame_kind {
            tags.insert("frame", kind.to_string());
        }
        if let Some(ns) = status.namespace_hex() {
            tags.insert("namespace", ns);
        }
        if let Some(inst) = status.instance_hex() {
            tags.insert("instance", inst);
        }
        tags
    }

    fn field_set(status: &Status) -> BTreeMap<&'static str, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert("detected", FieldValue::Boolean(status.is_detected));
        fields.insert("first_seen", FieldValue::Boolean(status.first_seen_trigger));
        fields.insert(
            "proximity",
            FieldValue::String(status.proximity.band().to_string()),
        );
        if let Some(rssi) = status.rssi {
            fields.insert("rssi", FieldValue::Integer(i64::from(rssi)));
        }
        if let Some(meters) = status.proximity.meters() {
            fields.insert("distance", FieldValue::Float(meters));
        }
        if let Some(url) = &status.resource_url {
            fields.insert("url", FieldValue::String(url.to_string()));
        }
        fields
    }

    fn to_data_point(&self, status: &Status, timestamp: SystemTime) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: Self::tag_set(status),
            field_set: Self::field_set(status),
            timestamp: Some(timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, status: &Status, timestamp: SystemTime) -> String {
        self.to_data_point(status, timestamp).to_string()
    }
}
