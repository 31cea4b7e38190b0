//! Serde helpers for optional UTC timestamps.
//!
//! - Serialize: `Option<DateTime<Utc>>` -> RFC 3339 string or `null`
//! - Deserialize: RFC 3339 string, Unix seconds or Unix milliseconds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Number(i64),
    }

    match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(RawTimestamp::Text(s)) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| Error::custom(format!("Invalid timestamp: {s}"))),
        Some(RawTimestamp::Number(ts)) => from_unix(ts)
            .map(Some)
            .ok_or_else(|| Error::custom("Invalid Unix timestamp")),
        None => Ok(None),
    }
}

/// Parse a vendor timestamp: RFC 3339, or a decimal Unix timestamp in
/// seconds or milliseconds (some vendors send epoch values as strings).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    s.trim().parse::<i64>().ok().and_then(from_unix)
}

/// Values above 10^11 are taken as milliseconds.
fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 100_000_000_000 {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let dt = parse_timestamp("2024-03-01T10:00:00Z").unwrap();
        assert_eq!(dt.timestamp(), 1_709_287_200);
    }

    #[test]
    fn parses_epoch_seconds_and_millis() {
        assert_eq!(parse_timestamp("1709287200").unwrap().timestamp(), 1_709_287_200);
        assert_eq!(
            parse_timestamp("1709287200000").unwrap().timestamp(),
            1_709_287_200
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}
