//! # Codec Settings
//!
//! Policy consumed by the encoder and decoder. Both structs are plain serde
//! data with defaults, so they can be embedded in a tool's config file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tag::ValueKind;

/// How timestamps are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Signed 64-bit count of seconds since the Unix epoch, UTC
    UnixSeconds,
    /// Signed 64-bit count of milliseconds since the Unix epoch, UTC
    UnixMilliseconds,
    /// ISO-8601 text with 100ns precision, stored like a string payload
    #[default]
    Iso8601,
}

/// Shape of a decoded timestamp when the requested type does not decide it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampShape {
    /// `Value::DateTime`, wall-clock time in UTC without an offset
    #[default]
    Naive,
    /// `Value::DateTimeOffset`, carrying the stored offset (UTC for epoch formats)
    OffsetAware,
}

/// Encoder settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationSettings {
    pub timestamp_format: TimestampFormat,
}

impl SerializationSettings {
    pub fn with_timestamp_format(timestamp_format: TimestampFormat) -> Self {
        Self { timestamp_format }
    }
}

/// Decoder settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeserializationSettings {
    pub timestamp_shape: TimestampShape,
}

impl DeserializationSettings {
    pub fn with_timestamp_shape(timestamp_shape: TimestampShape) -> Self {
        Self { timestamp_shape }
    }
}

/// Explicit per-key value types for map encoding
///
/// Needed whenever a map's values are heterogeneous or may be absent: the wire
/// format stores one tag per value, and an absent value carries no runtime type
/// to infer it from.
pub type ValueTypes<K> = HashMap<K, ValueKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(
            SerializationSettings::default().timestamp_format,
            TimestampFormat::Iso8601
        );
        assert_eq!(
            DeserializationSettings::default().timestamp_shape,
            TimestampShape::Naive
        );
    }

    #[test]
    fn test_settings_serde_snake_case() {
        let settings = SerializationSettings::with_timestamp_format(TimestampFormat::UnixMilliseconds);
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"timestamp_format":"unix_milliseconds"}"#);

        let parsed: DeserializationSettings =
            serde_json::from_str(r#"{"timestamp_shape":"offset_aware"}"#).unwrap();
        assert_eq!(parsed.timestamp_shape, TimestampShape::OffsetAware);

        // Missing fields fall back to defaults
        let empty: SerializationSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, SerializationSettings::default());
    }
}
