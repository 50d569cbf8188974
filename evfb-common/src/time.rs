//! Timestamp utilities

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for TEXT storage (RFC 3339, UTC)
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a timestamp previously written by [`to_db`]
pub fn from_db(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
