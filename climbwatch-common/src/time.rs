//! Timestamp utilities
//!
//! Upstream timestamps arrive either as RFC 3339 text or as naive
//! `YYYY-MM-DDTHH:MM:SS[.fff]` text without a zone. Naive values are taken as
//! UTC. Persisted timestamps are naive `YYYY-MM-DD HH:MM:SS` text, shifted by
//! the deployment's configured offset.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// Column format for persisted timestamps
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", STORAGE_FORMAT];

/// Parse an upstream timestamp
pub fn parse_upstream(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidTimestamp(text.to_string()))
}

/// Shift a timestamp by the configured offset (whole hours, may be negative)
pub fn apply_offset(ts: DateTime<Utc>, offset_hours: i64) -> DateTime<Utc> {
    ts + Duration::hours(offset_hours)
}

/// Render a timestamp for the `last_updated` column
pub fn to_storage(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(STORAGE_FORMAT).to_string()
}

/// Parse a `last_updated` column value
pub fn from_storage(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), STORAGE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::InvalidTimestamp(text.to_string()))
}

/// serde adapter for [`parse_upstream`]
///
/// `null` yields the zero timestamp (Unix epoch) so the rest of the record
/// still decodes. Malformed text is an error.
pub fn deserialize_upstream<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) => parse_upstream(&text).map_err(serde::de::Error::custom),
        None => Ok(DateTime::default()),
    }
}
