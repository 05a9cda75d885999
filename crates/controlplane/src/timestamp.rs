//! Flexible timestamp handling for observed records.
//!
//! The API is not consistent about timestamp formats. Accepted inputs:
//!
//! | Input                          | Result                  |
//! |--------------------------------|-------------------------|
//! | RFC3339 with offset            | converted to UTC        |
//! | `YYYY-MM-DDTHH:MM:SS[.ffffff]` | assumed UTC             |
//! | `YYYY-MM-DD HH:MM:SS[.ffffff]` | assumed UTC             |
//! | `""` or `null`                 | `None`                  |
//!
//! Use with `#[serde(default, with = "crate::timestamp")]` on
//! `Option<DateTime<Utc>>` fields. Values serialize back as RFC3339.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer, de};

const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp in any accepted format.
#[must_use]
pub fn parse(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(input, layout).ok())
        .map(|naive| naive.and_utc())
}

/// Serialize as RFC3339, or `null`.
pub fn serialize<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(t) => serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => serializer.serialize_none(),
    }
}

/// Deserialize any accepted format.
pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse(s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp '{s}'"))),
    }
}
