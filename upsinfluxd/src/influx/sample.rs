//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use log::debug;
use thiserror::Error;

use crate::nis::{parse_timestamp, ParseError, StatusSnapshot};

use super::line::{FieldValue, Line};

pub const MEASUREMENT: &str = "smartups";

/// Status keys that are published, with the field name they are published as.
/// Fields are written in this order.
pub const FIELD_MAPPING: [(&str, &str); 14] = [
    ("TONBATT", "seconds_on_battery"),
    ("LOADPCT", "ups_load_percent"),
    ("TIMELEFT", "time_left_minute"),
    ("ITEMP", "internal_temperature"),
    ("NOMOUTV", "output_nominal_voltage"),
    ("BATTV", "battery_current_voltage"),
    ("BCHARGE", "battery_charge_percent"),
    ("NOMBATTV", "battery_nominal_voltage"),
    ("LINEFREQ", "line_current_freq"),
    ("LINEV", "line_input_voltage"),
    ("MAXLINEV", "line_maximum_voltage"),
    ("MINLINEV", "line_minimum_voltage"),
    ("OUTPUTV", "output_current_voltage"),
    ("STATUS", "ups_status"),
];

/// Keys published as string fields rather than numbers.
const STRING_FIELDS: [&str; 1] = ["STATUS"];

const SERIAL_KEY: &str = "SERIALNO";
const MODEL_KEY: &str = "MODEL";
const DATE_KEY: &str = "DATE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("Status report has no {0} entry")]
    MissingKey(&'static str),
    #[error("Status report has none of the published fields")]
    NoFields,
    #[error("UPS date: {0}")]
    Timestamp(#[from] ParseError),
    #[error("UPS date {0} is out of range")]
    TimestampOutOfRange(i64),
}

/// Builds the `smartups` point for a status snapshot (with units stripped).
pub fn line_from_status(status: &StatusSnapshot) -> Result<Line, SampleError> {
    let get = |key: &'static str| {
        status
            .get(key)
            .ok_or(SampleError::MissingKey(key))
            .map(String::as_str)
    };
    let serial = get(SERIAL_KEY)?;
    let model = get(MODEL_KEY)?;
    let date = parse_timestamp(get(DATE_KEY)?)?;
    let timestamp_ns = date
        .checked_mul(1_000_000_000)
        .ok_or(SampleError::TimestampOutOfRange(date))?;

    let fields: Vec<(String, FieldValue)> = FIELD_MAPPING
        .iter()
        .filter_map(|(key, field)| {
            let value = status.get(*key)?;
            let value = if STRING_FIELDS.contains(key) {
                FieldValue::String(value.clone())
            } else if value.parse::<f64>().is_ok_and(f64::is_finite) {
                FieldValue::Number(value.clone())
            } else {
                debug!("Skipping {}: {:?} is not a number", key, value);
                return None;
            };
            Some((field.to_string(), value))
        })
        .collect();

    if fields.is_empty() {
        return Err(SampleError::NoFields);
    }

    Ok(Line {
        measurement: MEASUREMENT.to_string(),
        tags: vec![
            ("serial".to_string(), serial.to_string()),
            ("model".to_string(), model.to_string()),
        ],
        fields,
        timestamp_ns,
    })
}
