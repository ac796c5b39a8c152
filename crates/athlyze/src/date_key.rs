//! Wire date encoding.
//!
//! The Athlyze API has no external key for a measurement; the wire date is
//! the only identity shared by both sides. Two records are the same record
//! iff their encoded strings are byte-equal. Consequences:
//! - timestamps are rendered in the local zone at encoding time, so a zone
//!   change between insert and update breaks the match;
//! - precision is truncated to milliseconds, so timestamps differing only
//!   below one millisecond collide.
//!
//! Decoding is intentionally absent: remote dates are compared, never parsed.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};

/// `yyyy-MM-dd'T'HH:mm:ss.SSSXXX` with a numeric `±HH:MM` offset.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Encode a timestamp in the system's local time zone.
pub fn encode(timestamp: DateTime<Utc>) -> String {
    encode_in(timestamp, &Local)
}

/// Encode a timestamp in an explicit time zone.
pub fn encode_in<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    timestamp
        .with_timezone(tz)
        .format(DATE_KEY_FORMAT)
        .to_string()
}
