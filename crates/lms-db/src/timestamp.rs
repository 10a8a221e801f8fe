//! Timestamp normalization at the document boundary.
//!
//! Documents written by this crate store instants in the store-native shape
//! `{"seconds": i64, "nanoseconds": u32}`. Documents written by older clients
//! may instead carry epoch milliseconds or an RFC 3339 string, so every read
//! goes through [`parse_instant`], which accepts all three and nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser::SerializeStruct};
use serde_json::Value;

/// Store-native timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoreTimestamp(pub DateTime<Utc>);

impl From<DateTime<Utc>> for StoreTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl From<StoreTimestamp> for DateTime<Utc> {
    fn from(value: StoreTimestamp) -> Self {
        value.0
    }
}

impl Serialize for StoreTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StoreTimestamp", 2)?;
        state.serialize_field("seconds", &self.0.timestamp())?;
        state.serialize_field("nanoseconds", &self.0.timestamp_subsec_nanos())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for StoreTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_instant(&value)
            .map(Self)
            .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp: {value}")))
    }
}

/// Convert any supported timestamp representation into an instant.
///
/// Accepts the store-native object (with or without leading underscores on
/// its keys), integer epoch milliseconds, and RFC 3339 strings. Returns
/// `None` for anything else; callers decide whether to skip or fail.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// `#[serde(with = "store_format")]` for `DateTime<Utc>` fields.
pub mod store_format {
    use super::StoreTimestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        StoreTimestamp(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        StoreTimestamp::deserialize(deserializer).map(|t| t.0)
    }

    /// Same as the parent module, for `Option<DateTime<Utc>>`.
    pub mod option {
        use super::StoreTimestamp;
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(StoreTimestamp).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<StoreTimestamp>::deserialize(deserializer).map(|t| t.map(|t| t.0))
        }
    }
}
