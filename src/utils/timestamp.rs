//! Timestamps embedded in artifact names

use chrono::{DateTime, Local};

/// Local time, microsecond precision, no offset: `2024-05-01T12:34:56.123456`
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local time in artifact-name format
pub fn now_iso() -> String {
    format_iso(&Local::now())
}

pub fn format_iso(at: &DateTime<Local>) -> String {
    at.format(ISO_FORMAT).to_string()
}

/// Build `{prefix}_{timestamp}.{extension}`
pub fn artifact_file_name(prefix: &str, timestamp: &str, extension: &str) -> String {
    format!("{}_{}.{}", prefix, timestamp, extension)
}
