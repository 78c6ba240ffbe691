//! # Record normalization
//!
//! Raw records (from the backend or from local storage) arrive as loosely
//! typed JSON. These functions coerce them into [`WallEntry`] and
//! [`BirthdayWish`] values:
//!
//! | Field | Rule |
//! |-------|------|
//! | `id`, `author`, `message`/`text` | Coerced to text. Required: a missing or falsy value (`null`, `""`, `0`, `false`) drops the whole record. |
//! | `flowers` | Numbers and numeric strings are accepted; anything else, negatives included, becomes `0`. Fractions are truncated. |
//! | `createdAt` | Parsed by [`parse_timestamp`]; anything unparseable becomes "now". |
//! | `images` | Non-arrays become an empty list; image objects without a `url` are skipped. |
//!
//! Normalizing an already normalized record returns an identical record, which
//! is why timestamps are kept at millisecond precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::models::{BirthdayWish, WallEntry, WallImage};

/// Normalize one raw wall record, or `None` if a required field is missing.
pub fn normalize_entry(raw: &Value) -> Option<WallEntry> {
    let obj = raw.as_object()?;
    let id = required_text(obj, "id")?;
    let author = required_text(obj, "author")?;
    let message = required_text(obj, "message")?;

    Some(WallEntry {
        id,
        author,
        message,
        created_at: parse_timestamp(obj.get("createdAt").unwrap_or(&Value::Null)),
        flowers: coerce_count(obj.get("flowers")),
        images: coerce_images(obj.get("images")),
    })
}

/// Normalize one raw birthday wish, or `None` if a required field is missing.
pub fn normalize_wish(raw: &Value) -> Option<BirthdayWish> {
    let obj = raw.as_object()?;

    Some(BirthdayWish {
        id: required_text(obj, "id")?,
        author: required_text(obj, "author")?,
        text: required_text(obj, "text")?,
        created_at: parse_timestamp(obj.get("createdAt").unwrap_or(&Value::Null)),
    })
}

/// Parse a timestamp leniently, falling back to the current time.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC),
/// plain dates, and integers as milliseconds since the Unix epoch.
pub fn parse_timestamp(value: &Value) -> DateTime<Utc> {
    let parsed = match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    };
    parsed.map(|ts| ts.trunc_subsecs(3)).unwrap_or_else(now)
}

/// The current time at the millisecond precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical text form of a timestamp: `2024-03-01T12:00:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn required_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn coerce_count(value: Option<&Value>) -> u64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

fn coerce_images(value: Option<&Value>) -> Vec<WallImage> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items.iter().filter_map(coerce_image).collect()
}

fn coerce_image(raw: &Value) -> Option<WallImage> {
    let obj = raw.as_object()?;
    let url = obj.get("url")?.as_str().filter(|u| !u.is_empty())?;
    let dimension = |key: &str| {
        obj.get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };

    Some(WallImage {
        url: url.to_string(),
        public_id: obj
            .get("publicId")
            .and_then(Value::as_str)
            .map(str::to_string),
        width: dimension("width"),
        height: dimension("height"),
    })
}

/// Serde adapter for `createdAt`: writes the canonical form, reads leniently.
pub(crate) mod created_at {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(super::parse_timestamp(&raw))
    }
}
