//! Wire formatting shared by every response
//!
//! Timestamps are rendered `MM-DD-YYYY HH:MM:SS` in UTC; identifiers are
//! lowercase hyphenated v4 GUIDs.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Render an instant the way the vehicle API does
pub fn timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Fresh random identifier, 36 characters
pub fn guid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
