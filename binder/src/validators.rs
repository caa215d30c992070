//! Built-in validators
//!
//! Every validator is a pure predicate over the current working value and the
//! directive's parameters. Unless documented otherwise, `null` and the empty
//! string pass so that optional fields only need `notEmpty` to become required.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

use crate::schema::Params;
use crate::types::{as_text, is_blank, is_numeric};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    )
    .unwrap();

    /// Scheme, host, then an optional path, query or fragment
    static ref URL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s/?#]+(?:[/?#]\S*)?$").unwrap();

    static ref DECIMAL_REGEX: Regex = Regex::new(r"^-?\d*\.?\d+$").unwrap();

    static ref DIGITS_REGEX: Regex = Regex::new(r"^[0-9]+$").unwrap();

    /// HTML tag detection pattern
    static ref HTML_TAG_REGEX: Regex = Regex::new(r"<[^>]+>").unwrap();

    /// Script/event handler pattern for XSS detection
    static ref XSS_PATTERN_REGEX: Regex = Regex::new(
        r"(?i)(javascript:|on\w+\s*=|<script|<iframe|<object|<embed)"
    )
    .unwrap();
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

fn digits_of(value: &Value) -> Option<String> {
    as_text(value).map(|text| text.chars().filter(char::is_ascii_digit).collect())
}

/// Required: fails on `null` and `""`
pub fn not_empty(value: &Value, _params: &Params) -> bool {
    !is_blank(value)
}

pub fn string(value: &Value, _params: &Params) -> bool {
    is_blank(value) || value.is_string()
}

pub fn boolean(value: &Value, _params: &Params) -> bool {
    is_blank(value) || value.is_boolean()
}

/// 10 to 15 digits once punctuation is removed
pub fn phone(value: &Value, _params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    digits_of(value)
        .map(|digits| (10..=15).contains(&digits.len()))
        .unwrap_or(false)
}

pub fn email(value: &Value, _params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    as_text(value)
        .map(|text| EMAIL_REGEX.is_match(&text))
        .unwrap_or(false)
}

/// Strict membership in `options`, a JSON list that may use single quotes:
/// `options="['ASC','DESC']"`
pub fn one_of(value: &Value, params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    let Some(options) = params.str("options") else {
        return false;
    };

    serde_json::from_str::<Vec<Value>>(&options.replace('\'', "\""))
        .map(|options| options.contains(value))
        .unwrap_or(false)
}

/// Numeric value within `min` and `max`, compared at two-decimal precision
pub fn interval(value: &Value, params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    let Some(text) = as_text(value) else {
        return false;
    };
    if !DECIMAL_REGEX.is_match(&text) {
        return false;
    }
    let Some(number) = to_cents(&text) else {
        return false;
    };

    let below_min = params
        .get("min")
        .and_then(|min| to_cents(&min.to_text()))
        .map(|min| number < min)
        .unwrap_or(false);
    let above_max = params
        .get("max")
        .and_then(|max| to_cents(&max.to_text()))
        .map(|max| number > max)
        .unwrap_or(false);

    !(below_min || above_max)
}

fn to_cents(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let normalized = if let Some(rest) = text.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else if let Some(rest) = text.strip_prefix('.') {
        format!("0.{}", rest)
    } else {
        text.to_string()
    };

    Decimal::from_str(&normalized)
        .ok()
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::ToZero))
}

/// Digits only. Falsy values (`0`, `"0"`, `false`, empty list) pass.
pub fn integer(value: &Value, _params: &Params) -> bool {
    let falsy = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    };
    if falsy {
        return true;
    }

    as_text(value)
        .map(|text| DIGITS_REGEX.is_match(&text))
        .unwrap_or(false)
}

/// String of at least `value` characters
pub fn min_length(value: &Value, params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    match (value.as_str(), params.int("value")) {
        (Some(text), Some(min)) => text.chars().count() as i64 >= min,
        _ => false,
    }
}

/// String of at most `value` characters
pub fn max_length(value: &Value, params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    match (value.as_str(), params.int("value")) {
        (Some(text), Some(max)) => text.chars().count() as i64 <= max,
        _ => false,
    }
}

pub fn list(value: &Value, _params: &Params) -> bool {
    is_blank(value) || value.is_array() || value.is_object()
}

/// `YYYY-MM-DD`. Only `null` is skipped; the empty string fails.
pub fn date(value: &Value, _params: &Params) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(|d| d.format(DATE_FORMAT).to_string() == *s)
            .unwrap_or(false),
        _ => false,
    }
}

/// `YYYY-MM-DD HH:MM:SS`
pub fn date_time(value: &Value, _params: &Params) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
            .map(|d| d.format(DATE_TIME_FORMAT).to_string() == *s)
            .unwrap_or(false),
        _ => false,
    }
}

/// `YYYY-MM-DDTHH:MM:SS+HH:MM`
pub fn date_time_iso8601(value: &Value, _params: &Params) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => DateTime::parse_from_str(s, ISO8601_FORMAT)
            .map(|d| d.format(ISO8601_FORMAT).to_string() == *s)
            .unwrap_or(false),
        _ => false,
    }
}

/// At least 8 characters with a lowercase and an uppercase letter, a digit and
/// a symbol
pub fn enforced_password(value: &Value, _params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    let Some(text) = as_text(value) else {
        return false;
    };

    text.chars().count() >= 8
        && text.chars().any(|c| c.is_ascii_lowercase())
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .any(|c| !c.is_ascii_alphanumeric() && c != '_' && !c.is_whitespace())
}

pub fn url(value: &Value, _params: &Params) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || URL_REGEX.is_match(s),
        _ => false,
    }
}

/// Either a valid CPF (11 digits) or a valid CNPJ (14 digits)
pub fn cpf_cnpj(value: &Value, params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    let digits = digits_of(value).unwrap_or_default();
    match digits.len() {
        11 => cpf(&Value::String(digits), params),
        14 => cnpj(&Value::String(digits), params),
        _ => false,
    }
}

/// Brazilian individual taxpayer id, check digits included
pub fn cpf(value: &Value, _params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    let digits: Vec<u32> = match digits_of(value) {
        Some(text) => text.chars().filter_map(|c| c.to_digit(10)).collect(),
        None => return false,
    };
    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    (9..11).all(|t| {
        let sum: u32 = (0..t).map(|c| digits[c] * (t as u32 + 1 - c as u32)).sum();
        digits[t] == ((10 * sum) % 11) % 10
    })
}

/// Brazilian company taxpayer id, check digits included
pub fn cnpj(value: &Value, _params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    let digits: Vec<u32> = match digits_of(value) {
        Some(text) => text.chars().filter_map(|c| c.to_digit(10)).collect(),
        None => return false,
    };
    if digits.len() != 14 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize, start_weight: u32| {
        let mut weight = start_weight;
        let mut sum = 0;
        for digit in &digits[..len] {
            sum += digit * weight;
            weight = if weight == 2 { 9 } else { weight - 1 };
        }
        let rest = sum % 11;
        if rest < 2 {
            0
        } else {
            11 - rest
        }
    };

    digits[12] == check_digit(12, 5) && digits[13] == check_digit(13, 6)
}

/// Numeric amount with at most two decimals and 16 characters
pub fn currency(value: &Value, _params: &Params) -> bool {
    if is_blank(value) {
        return true;
    }
    if !is_numeric(value) {
        return false;
    }
    let Some(text) = as_text(value) else {
        return false;
    };
    if text.len() > 16 {
        return false;
    }

    text.split('.').nth(1).map(|decimals| decimals.len() <= 2).unwrap_or(true)
}

/// Runtime type check against the `type` parameter. Unknown types pass.
pub fn scalar_type(value: &Value, params: &Params) -> bool {
    if value.is_null() {
        return true;
    }
    match params.str("type").unwrap_or_default() {
        "string" => value.is_string(),
        "int" | "integer" => value.is_i64() || value.is_u64(),
        "float" => value.is_number(),
        "bool" | "boolean" => value.is_boolean(),
        "array" => value.is_array() || value.is_object(),
        _ => true,
    }
}

/// No HTML tags
pub fn no_html(value: &Value, _params: &Params) -> bool {
    value
        .as_str()
        .map(|text| !HTML_TAG_REGEX.is_match(text))
        .unwrap_or(true)
}

/// No script tags, `javascript:` urls or inline event handlers
pub fn no_xss(value: &Value, _params: &Params) -> bool {
    value
        .as_str()
        .map(|text| !XSS_PATTERN_REGEX.is_match(text))
        .unwrap_or(true)
}
