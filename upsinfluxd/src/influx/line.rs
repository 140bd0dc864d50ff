//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! InfluxDB line protocol rendering.
//!
//! `measurement,tag=value field=value,field="text" 1622566800000000000`
use std::fmt::{self, Display};

use itertools::Itertools;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// Numeric value, kept in the notation the UPS reported it in.
    Number(String),
    String(String),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

/// One point of a measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    pub timestamp_ns: i64,
}

impl Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape(&self.measurement, &[',', ' ']))?;
        // InfluxDB rejects the whole point over a tag without a value.
        for (key, value) in self.tags.iter().filter(|(_, value)| !value.is_empty()) {
            write!(f, ",{}={}", escape_key(key), escape_key(value))?;
        }
        let fields = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape_key(key), value))
            .join(",");
        write!(f, " {} {}", fields, self.timestamp_ns)
    }
}

fn escape_key(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn line(tags: &[(&str, &str)], fields: Vec<(&str, FieldValue)>) -> Line {
        Line {
            measurement: "smartups".to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            timestamp_ns: 1_622_566_800_000_000_000,
        }
    }

    #[test]
    fn renders_tags_fields_and_timestamp() {
        let line = line(
            &[("serial", "AS1234567890"), ("model", "Smart-UPS 1500")],
            vec![
                ("ups_load_percent", FieldValue::Number("42.0".into())),
                ("ups_status", FieldValue::String("ONLINE".into())),
            ],
        );

        assert_snapshot!(line.to_string(), @r###"smartups,serial=AS1234567890,model=Smart-UPS\ 1500 ups_load_percent=42.0,ups_status="ONLINE" 1622566800000000000"###);
    }

    #[test]
    fn escapes_tag_separators() {
        let line = line(
            &[("model", "a,b=c d")],
            vec![("x", FieldValue::Number("1".into()))],
        );

        assert_snapshot!(line.to_string(), @r###"smartups,model=a\,b\=c\ d x=1 1622566800000000000"###);
    }

    #[test]
    fn escapes_quotes_in_string_fields() {
        assert_eq!(
            FieldValue::String(r#"ON "LINE" \ X"#.into()).to_string(),
            r#""ON \"LINE\" \\ X""#
        );
    }

    #[test]
    fn empty_tag_values_are_left_out() {
        let line = line(
            &[("serial", ""), ("model", "Back-UPS")],
            vec![("x", FieldValue::Number("1".into()))],
        );

        assert_snapshot!(line.to_string(), @"smartups,model=Back-UPS x=1 1622566800000000000");
    }

    #[test]
    fn measurement_without_tags() {
        let line = line(&[], vec![("x", FieldValue::Number("1".into()))]);

        assert_eq!(line.to_string(), "smartups x=1 1622566800000000000");
    }
}
