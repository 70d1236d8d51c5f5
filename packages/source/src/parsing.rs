//! Shared value-coercion utilities for disaster sources.
//!
//! Source collections disagree on types as much as on field names: the
//! same flag arrives as `true`, `1` or `"1"`, timestamps arrive as ISO
//! strings, epoch numbers or store timestamp objects. These helpers turn
//! a single JSON value into the Rust type the canonical record needs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Epoch values at or above this magnitude are taken as milliseconds.
const EPOCH_MS_THRESHOLD: f64 = 100_000_000_000.0;

/// Looks up a field by name, following `.`-separated paths into nested
/// objects (e.g. `"properties.mag"`).
#[must_use]
pub fn lookup<'a>(record: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if let Some(value) = record.get(path) {
        return Some(value);
    }
    if !path.contains('.') {
        return None;
    }
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
}

/// Returns the first non-null value among `fields`.
#[must_use]
pub fn first_present<'a>(
    record: &'a serde_json::Value,
    fields: &[String],
) -> Option<&'a serde_json::Value> {
    fields
        .iter()
        .filter_map(|f| lookup(record, f))
        .find(|v| !v.is_null())
}

/// Reads a number from a JSON number or a numeric string.
#[must_use]
pub fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Reads a non-empty string, converting numbers to their decimal form.
#[must_use]
pub fn value_as_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the first non-empty string among `fields`.
#[must_use]
pub fn first_string(record: &serde_json::Value, fields: &[String]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| lookup(record, f))
        .find_map(value_as_string)
}

/// Returns the first parseable number among `fields`.
#[must_use]
pub fn first_f64(record: &serde_json::Value, fields: &[String]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|f| lookup(record, f))
        .find_map(value_as_f64)
}

/// Interprets a legacy boolean encoding.
///
/// Accepts JSON booleans, numbers (`0` is false, anything else true) and
/// the strings `"true"`/`"false"`, `"1"`/`"0"`, `"yes"`/`"no"`.
/// Anything else is `None`.
#[must_use]
pub fn parse_flag(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Resolves a record's visibility across its legacy flag fields.
///
/// Visible if ANY recognized field reads as true. Records carrying none
/// of the fields are not visible.
#[must_use]
pub fn parse_visibility(record: &serde_json::Value, fields: &[String]) -> bool {
    fields
        .iter()
        .filter_map(|f| lookup(record, f))
        .filter_map(parse_flag)
        .any(|visible| visible)
}

/// Parses a datetime string in any of the formats seen across sources.
#[must_use]
pub fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(epoch) = s.parse::<f64>() {
        return parse_epoch(epoch);
    }
    None
}

/// Converts an epoch number to a timestamp. Values of 1e11 and above are
/// milliseconds, smaller values are seconds.
#[must_use]
pub fn parse_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let ms = if epoch.abs() >= EPOCH_MS_THRESHOLD {
        epoch
    } else {
        epoch * 1000.0
    };
    #[allow(clippy::cast_possible_truncation)]
    DateTime::from_timestamp_millis(ms as i64)
}

/// Parses any supported timestamp value: strings, epoch numbers, and
/// store timestamp objects (`{seconds, nanoseconds}` or
/// `{_seconds, _nanoseconds}`).
#[must_use]
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => parse_datetime_str(s),
        serde_json::Value::Number(n) => parse_epoch(n.as_f64()?),
        serde_json::Value::Object(obj) => {
            let seconds = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(value_as_f64)?;
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(value_as_f64)
                .unwrap_or(0.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            DateTime::from_timestamp(seconds as i64, nanos.clamp(0.0, 999_999_999.0) as u32)
        }
        _ => None,
    }
}

/// Returns the first parseable timestamp among `fields`, in order.
#[must_use]
pub fn first_timestamp(record: &serde_json::Value, fields: &[String]) -> Option<DateTime<Utc>> {
    fields
        .iter()
        .filter_map(|f| lookup(record, f))
        .find_map(parse_timestamp)
}
