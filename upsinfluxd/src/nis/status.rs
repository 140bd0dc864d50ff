//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Parsing of the `status` report returned by apcupsd.
//!
//! The report is a list of `KEY : VALUE` lines. Values carry physical units
//! (`"42.0 Percent"`) that can be stripped so the remainder is a plain number.
use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Key/value report for one poll cycle.
pub type StatusSnapshot = HashMap<String, String>;

/// Unit suffixes appended by apcupsd, tested in this order.
pub const UNIT_SUFFIXES: [&str; 7] = [
    " Minutes", " Seconds", " Percent", " Volts", " Watts", " Hz", " C",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S ";
const TZ_OFFSET_LEN: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Status line has no ':' separator: {0:?}")]
    MissingSeparator(String),
    #[error("Invalid timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },
}

/// Turns raw status lines into a key/value map.
///
/// Keys and values are split on the first `:` and trimmed. When
/// `strip_units` is set, the first matching entry of [`UNIT_SUFFIXES`] is
/// removed from the end of the value.
pub fn parse_status_lines<I, S>(lines: I, strip_units: bool) -> Result<StatusSnapshot, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| {
            let line = line.as_ref();
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::MissingSeparator(line.to_string()))?;
            let value = value.trim();
            let value = if strip_units {
                strip_unit(value)
            } else {
                value
            };
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

fn strip_unit(value: &str) -> &str {
    UNIT_SUFFIXES
        .iter()
        .find_map(|unit| value.strip_suffix(unit))
        .unwrap_or(value)
}

/// Converts an apcupsd timestamp such as `2021-06-01 12:00:00 -0500` to UTC
/// epoch seconds.
///
/// The offset is applied with apcupsd-to-influx's historical sign
/// convention: a leading `+` subtracts the offset, any other sign adds it.
pub fn parse_timestamp(text: &str) -> Result<i64, ParseError> {
    let invalid = |reason: String| ParseError::Timestamp {
        value: text.to_string(),
        reason,
    };

    let split_at = text
        .len()
        .checked_sub(TZ_OFFSET_LEN)
        .filter(|idx| text.is_char_boundary(*idx))
        .ok_or_else(|| invalid("too short to hold a timezone offset".into()))?;
    let (date, offset) = text.split_at(split_at);

    // chrono accepts a missing trailing space, apcupsd always emits one.
    if !date.ends_with(' ') {
        return Err(invalid("missing space before timezone offset".into()));
    }
    let date =
        NaiveDateTime::parse_from_str(date, DATE_FORMAT).map_err(|e| invalid(e.to_string()))?;

    let sign = offset.chars().next();
    let hours =
        offset_component(offset.get(1..3)).ok_or_else(|| invalid("bad offset hours".into()))?;
    let minutes =
        offset_component(offset.get(3..5)).ok_or_else(|| invalid("bad offset minutes".into()))?;

    let mut delta = Duration::hours(hours) + Duration::minutes(minutes);
    if sign == Some('+') {
        delta = -delta;
    }

    date.checked_add_signed(delta)
        .map(|shifted| Utc.from_utc_datetime(&shifted).timestamp())
        .ok_or_else(|| invalid("out of range".into()))
}

fn offset_component(digits: Option<&str>) -> Option<i64> {
    digits
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|d| d.parse().ok())
}
