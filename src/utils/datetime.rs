use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp the way it is stored in the database.
///
/// The fixed-width UTC form keeps lexicographic order equal to time order,
/// which the time-window filters rely on.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_db_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// Renders a stored timestamp for display, falling back to the raw value.
pub fn format_db_timestamp(value: &str) -> String {
    parse_db_timestamp(value)
        .map(|dt| format_datetime(&dt))
        .unwrap_or_else(|| value.to_string())
}
