//! Lenient scalar coercion used by the typed getters.
//!
//! None of these functions fail. A value that has no sensible reading in the
//! requested type, or no value at all, coerces to that type's zero value.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::value::{Native, Number};

pub fn as_number(value: Option<&Native>) -> Option<Number> {
    match value? {
        Native::Int(i) => Some(Number::Int(*i)),
        Native::UInt(u) => Some(Number::UInt(*u)),
        Native::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

/// Integers truncate toward zero and saturate. `true` is 1, `false` is 0.
pub fn as_long(value: Option<&Native>) -> i64 {
    match value {
        Some(Native::Bool(b)) => *b as i64,
        _ => as_number(value).map_or(0, Number::as_i64),
    }
}

pub fn as_int(value: Option<&Native>) -> i32 {
    let long = match value {
        Some(Native::Float(f)) => return *f as i32,
        _ => as_long(value),
    };
    long.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

pub fn as_double(value: Option<&Native>) -> f64 {
    match value {
        Some(Native::Bool(b)) => *b as i64 as f64,
        _ => as_number(value).map_or(0.0, Number::as_f64),
    }
}

pub fn as_float(value: Option<&Native>) -> f32 {
    as_double(value) as f32
}

/// Numbers are true when their integer part is non-zero. Any other
/// non-null value is true.
pub fn as_bool(value: Option<&Native>) -> bool {
    match value {
        None | Some(Native::Null) => false,
        Some(Native::Bool(b)) => *b,
        Some(Native::Int(_) | Native::UInt(_) | Native::Float(_)) => as_long(value) != 0,
        Some(_) => true,
    }
}

/// Parses an ISO-8601 timestamp, with or without fractional seconds.
///
/// A timestamp without an offset is taken as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn as_date(value: Option<&Native>) -> Option<DateTime<Utc>> {
    match value? {
        Native::String(s) => parse_date(s),
        _ => None,
    }
}

/// `YYYY-MM-DDTHH:MM:SS.sssZ`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
