//! Scalar field types and loose value conversions
//!
//! A declared field type is either one of the scalar kinds below or the name
//! of another schema (see [`crate::registry`]). Scalar kinds are checked before
//! the directive pipeline runs and coerced, best effort, after it.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Scalar kinds a field can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    /// A list or a map
    Array,
    /// Untyped field, never checked nor coerced
    Any,
}

impl ScalarKind {
    /// Parse a declared type name into a scalar kind.
    ///
    /// A leading `?` (nullable marker) is ignored and an empty name means the
    /// field is untyped. Returns `None` when the name is not a scalar type, in
    /// which case it is expected to name a schema.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let trimmed = type_name.trim().trim_start_matches('?');

        match trimmed.to_lowercase().as_str() {
            "" | "mixed" | "any" => Some(ScalarKind::Any),
            "string" | "str" => Some(ScalarKind::String),
            "int" | "integer" => Some(ScalarKind::Integer),
            "float" | "double" => Some(ScalarKind::Float),
            "bool" | "boolean" => Some(ScalarKind::Boolean),
            "array" | "list" => Some(ScalarKind::Array),
            _ => None,
        }
    }

    /// Name used in type-mismatch messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "int",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "bool",
            ScalarKind::Array => "array",
            ScalarKind::Any => "mixed",
        }
    }

    /// Check a raw value against this kind. `null` always matches.
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }

        match self {
            ScalarKind::String => value.is_string(),
            ScalarKind::Integer => value.is_i64() || value.is_u64(),
            // Integers are accepted where floats are expected
            ScalarKind::Float => value.is_number(),
            ScalarKind::Boolean => value.is_boolean(),
            ScalarKind::Array => value.is_array() || value.is_object(),
            ScalarKind::Any => true,
        }
    }

    /// Convert a value to this kind.
    ///
    /// Returns `None` when no sensible conversion exists; callers keep the
    /// original value in that case.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match self {
            ScalarKind::Any => Some(value.clone()),
            ScalarKind::String => match value {
                Value::String(_) => Some(value.clone()),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            ScalarKind::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
                Value::Number(n) => n.as_f64().and_then(float_to_int).map(Value::from),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                Value::String(s) => {
                    let trimmed = s.trim();
                    trimmed
                        .parse::<i64>()
                        .ok()
                        .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_int))
                        .map(Value::from)
                }
                _ => None,
            },
            ScalarKind::Float => match value {
                Value::Number(n) => n.as_f64().and_then(Number::from_f64).map(Value::Number),
                Value::Bool(b) => Number::from_f64(if *b { 1.0 } else { 0.0 }).map(Value::Number),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number),
                _ => None,
            },
            ScalarKind::Boolean => Some(Value::Bool(is_truthy(value))),
            ScalarKind::Array => match value {
                Value::Array(_) | Value::Object(_) => Some(value.clone()),
                other => Some(Value::Array(vec![other.clone()])),
            },
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn float_to_int(value: f64) -> Option<i64> {
    if value.is_finite() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

/// `null` or the empty string
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Truthiness used by boolean conversions: `null`, `false`, `0`, `""`, `"0"`,
/// `"false"` and empty collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Textual form of a scalar value, used by validators that inspect digits.
///
/// `true` renders as `"1"`, `false` and `null` as `""`. Lists and maps have no
/// textual form.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Whether a value is a number or a string holding a plain decimal number
pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => {
            let trimmed = s.trim_start();
            !trimmed.is_empty()
                && trimmed
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
                && trimmed.parse::<f64>().is_ok()
        }
        _ => false,
    }
}

/// Integer conversion that reads the leading numeric part of a string and
/// falls back to zero, e.g. `"42abc"` becomes `42`.
pub fn loose_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_int))
            .unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => float_to_int(leading_number(s)).unwrap_or(0),
        Value::Array(items) => i64::from(!items.is_empty()),
        Value::Object(map) => i64::from(!map.is_empty()),
        Value::Null => 0,
    }
}

/// Float conversion with the same leading-number rule as [`loose_int`]
pub fn loose_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => leading_number(s),
        Value::Array(items) => f64::from(u8::from(!items.is_empty())),
        Value::Object(map) => f64::from(u8::from(!map.is_empty())),
        Value::Null => 0.0,
    }
}

fn leading_number(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in trimmed.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => seen_digit = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return 0.0;
    }
    trimmed[..end].parse::<f64>().unwrap_or(0.0)
}
