// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Serialization of the enriched payload written to the output binding.
//!
//! Two renderings are supported:
//!
//! * [`OutputFormat::Json`] writes canonical JSON.
//! * [`OutputFormat::PythonRepr`] writes the mapping in Python's `repr` form
//!   (`{'a': 1, 'ok': True, 'none': None}`), the form older downstream consumers
//!   of this function expect. It is not valid JSON.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    PythonRepr,
}

impl OutputFormat {
    pub fn render(&self, payload: &Map<String, Value>) -> String {
        match self {
            OutputFormat::Json => Value::Object(payload.clone()).to_string(),
            OutputFormat::PythonRepr => {
                let mut out = String::new();
                write_dict(&mut out, payload);
                out
            }
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "repr" | "python" | "python_repr" => Ok(OutputFormat::PythonRepr),
            other => Err(format!(
                "Invalid output format '{other}'. Must be one of: json, repr"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::PythonRepr => f.write_str("repr"),
        }
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_str(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_dict(out, map),
    }
}

fn write_dict(out: &mut String, map: &Map<String, Value>) {
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_str(out, key);
        out.push_str(": ");
        write_value(out, value);
    }
    out.push('}');
}

/// Integers keep the digits they were parsed with, however large.
fn write_number(out: &mut String, n: &Number) {
    match n.as_f64() {
        Some(f) if n.is_f64() => write_float(out, f),
        _ => {
            let _ = write!(out, "{n}");
        }
    }
}

/// Floats use the shortest round-trip digits; Python switches to exponent notation
/// outside `[1e-4, 1e16)` and always prints a signed, two-digit exponent.
fn write_float(out: &mut String, f: f64) {
    let magnitude = f.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let _ = write!(out, "{f:?}");
        return;
    }
    let formatted = format!("{f:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            let _ = write!(out, "{mantissa}e{sign}{digits:0>2}");
        }
        None => out.push_str(&formatted),
    }
}

fn write_str(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => {
                let code = u32::from(c);
                let _ = if code <= 0xff {
                    write!(out, "\\x{code:02x}")
                } else if code <= 0xffff {
                    write!(out, "\\u{code:04x}")
                } else {
                    write!(out, "\\U{code:08x}")
                };
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

/// Mirrors `str.isprintable`: control, format, separator (other than the ASCII space) and
/// private-use characters are escaped. Unassigned code points are left as they are.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !matches!(
        u32::from(c),
        // Cc
        0x00..=0x1f | 0x7f..=0x9f
        // Zs, Zl, Zp
        | 0xa0 | 0x1680 | 0x2000..=0x200a | 0x2028 | 0x2029 | 0x202f | 0x205f | 0x3000
        // Cf
        | 0xad | 0x600..=0x605 | 0x61c | 0x6dd | 0x70f | 0x890..=0x891 | 0x8e2 | 0x180e
        | 0x200b..=0x200f | 0x202a..=0x202e | 0x2060..=0x2064 | 0x2066..=0x206f | 0xfeff
        | 0xfff9..=0xfffb | 0x110bd | 0x110cd | 0x13430..=0x1343f | 0x1bca0..=0x1bca3
        | 0x1d173..=0x1d17a | 0xe0001 | 0xe0020..=0xe007f
        // Co
        | 0xe000..=0xf8ff | 0xf0000..=0xffffd | 0x100000..=0x10fffd
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_json_render_is_canonical() {
        let payload = as_map(json!({"a": 1, "blob_name": "myfile.json", "ok": true}));
        let rendered = OutputFormat::Json.render(&payload);
        assert_eq!(rendered, r#"{"a":1,"blob_name":"myfile.json","ok":true}"#);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, Value::Object(payload));
    }

    #[test]
    fn test_repr_render_matches_python_dict() {
        let payload = as_map(json!({
            "a": 1,
            "blob_name": "myfile.json",
            "miztiik_event_processed": true,
            "tags": ["x", null, false],
            "nested": {"ratio": 0.5}
        }));
        assert_eq!(
            OutputFormat::PythonRepr.render(&payload),
            "{'a': 1, 'blob_name': 'myfile.json', 'miztiik_event_processed': True, \
             'tags': ['x', None, False], 'nested': {'ratio': 0.5}}"
        );
    }

    #[test]
    fn test_repr_render_empty_containers() {
        let payload = as_map(json!({"list": [], "map": {}}));
        assert_eq!(
            OutputFormat::PythonRepr.render(&payload),
            "{'list': [], 'map': {}}"
        );
    }

    #[duplicate_item(
        test_name                       input                   expected;
        [test_repr_plain_string]        ["plain"]               ["'plain'"];
        [test_repr_single_quote]        ["it's"]                ["\"it's\""];
        [test_repr_both_quotes]         ["it's \"x\""]          ["'it\\'s \"x\"'"];
        [test_repr_backslash]           ["a\\b"]                ["'a\\\\b'"];
        [test_repr_newline_and_tab]     ["a\nb\tc"]             ["'a\\nb\\tc'"];
        [test_repr_control_char]        ["\u{1}"]               ["'\\x01'"];
        [test_repr_delete_char]         ["\u{7f}"]              ["'\\x7f'"];
        [test_repr_no_break_space]      ["a\u{a0}b"]            ["'a\\xa0b'"];
        [test_repr_line_separator]      ["\u{2028}"]            ["'\\u2028'"];
        [test_repr_zero_width_space]    ["\u{200b}"]            ["'\\u200b'"];
        [test_repr_byte_order_mark]     ["\u{feff}"]            ["'\\ufeff'"];
        [test_repr_private_use_plane]   ["\u{f0000}"]           ["'\\U000f0000'"];
        [test_repr_emoji_kept]          ["\u{1f600}"]           ["'\u{1f600}'"];
        [test_repr_unicode_kept]        ["café"]                ["'café'"];
    )]
    #[test]
    fn test_name() {
        let mut out = String::new();
        write_str(&mut out, input);
        assert_eq!(out, expected);
    }

    #[duplicate_item(
        test_name                       input           expected;
        [test_float_whole]              [1.0]           ["1.0"];
        [test_float_fraction]           [0.1]           ["0.1"];
        [test_float_negative]           [-2.5]          ["-2.5"];
        [test_float_large]              [1e20]          ["1e+20"];
        [test_float_small]              [1.5e-7]        ["1.5e-07"];
        [test_float_below_threshold]    [1e15]          ["1000000000000000.0"];
    )]
    #[test]
    fn test_name() {
        let mut out = String::new();
        write_float(&mut out, input);
        assert_eq!(out, expected);
    }

    #[duplicate_item(
        test_name                       format                      expected;
        [test_json_keeps_big_integers]  [OutputFormat::Json]        [r#"{"n":18446744073709551616,"m":-9223372036854775809}"#];
        [test_repr_keeps_big_integers]  [OutputFormat::PythonRepr]  ["{'n': 18446744073709551616, 'm': -9223372036854775809}"];
    )]
    #[test]
    fn test_name() {
        let payload: Map<String, Value> =
            serde_json::from_str(r#"{"n":18446744073709551616,"m":-9223372036854775809}"#)
                .unwrap();
        assert_eq!(format.render(&payload), expected);
    }

    #[test]
    fn test_repr_float_literals_follow_python() {
        let payload: Map<String, Value> =
            serde_json::from_str(r#"{"e":1E5,"f":2.50,"g":1e20}"#).unwrap();
        assert_eq!(
            OutputFormat::PythonRepr.render(&payload),
            "{'e': 100000.0, 'f': 2.5, 'g': 1e+20}"
        );
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("REPR".parse::<OutputFormat>(), Ok(OutputFormat::PythonRepr));
        assert_eq!(" python ".parse::<OutputFormat>(), Ok(OutputFormat::PythonRepr));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display_round_trips() {
        for format in [OutputFormat::Json, OutputFormat::PythonRepr] {
            assert_eq!(format.to_string().parse::<OutputFormat>(), Ok(format));
        }
    }
}
