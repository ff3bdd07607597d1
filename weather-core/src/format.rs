//! Display strings for forecast timestamps.
//!
//! Timestamps carry the location's UTC offset, so every string here is in the
//! location's local time regardless of where the widget runs.

use chrono::{DateTime, TimeZone};

/// "3:05 PM"
pub fn format_time<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%-I:%M %p").to_string()
}

/// "Sat, Aug 30"
pub fn format_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%a, %b %-d").to_string()
}

/// "Saturday, August 30, 2025"
pub fn format_full_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%A, %B %-d, %Y").to_string()
}
