//! Built-in sanitizers
//!
//! Pure transforms over the current working value. The text cleaners
//! (`alphaNum`, `safeString`, `lower`, `email`, `phoneBr`, `cpfcnpj`) turn
//! anything that is not a string into `null`; the whitespace and markup
//! cleaners leave non-strings untouched.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

use crate::schema::Params;
use crate::types::{as_text, is_blank, is_truthy, loose_float, loose_int};

lazy_static! {
    /// Pattern to match HTML tags
    static ref HTML_TAG_PATTERN: Regex = Regex::new(r"<[^>]*>").unwrap();

    /// Pattern to match multiple whitespace characters
    static ref MULTI_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Pattern to match control characters (except newline and tab)
    static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").unwrap();

    static ref NOT_ALPHA_NUM: Regex =
        Regex::new(r"[^0-9a-zA-ZáàâãéèêíïóôõöúçñÁÀÂÃÉÈÍÏÓÔÕÖÚÇÑ ]").unwrap();

    static ref NOT_SAFE: Regex = Regex::new(
        r#"[^0-9a-zA-ZáàâãéèêíïóôõöúçñÁÀÂÃÉÈÍÏÓÔÕÖÚÇÑ\s!@#$%^&*()\-_=+{}|\[\]:;",.<>?/`~]"#
    )
    .unwrap();

    /// Characters that cannot appear in an e-mail address
    static ref NOT_EMAIL: Regex = Regex::new(r"[^a-zA-Z0-9!#$%&'*+\-=?^_`{|}~@.\[\]]").unwrap();
}

fn collapse(value: &str) -> String {
    MULTI_WHITESPACE.replace_all(value, " ").trim().to_string()
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Letters (accented Portuguese letters included), digits and single spaces
pub fn alpha_num(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => {
            let stripped = HTML_TAG_PATTERN.replace_all(&s, "");
            Value::String(collapse(&NOT_ALPHA_NUM.replace_all(&stripped, "")))
        }
        _ => Value::Null,
    }
}

/// Like [`alpha_num`] but keeping common punctuation
pub fn safe_string(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => {
            let stripped = HTML_TAG_PATTERN.replace_all(&s, "");
            Value::String(collapse(&NOT_SAFE.replace_all(&stripped, "")))
        }
        _ => Value::Null,
    }
}

/// Lowercase, strip tags and trim
pub fn lower(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => Value::String(
            HTML_TAG_PATTERN
                .replace_all(&s.to_lowercase(), "")
                .trim()
                .to_string(),
        ),
        _ => Value::Null,
    }
}

/// Format a Brazilian phone number as `+55 (11) 98765-4321`. Numbers with an
/// unexpected digit count are returned as bare digits.
pub fn phone_br(value: Value, _params: &Params) -> Value {
    let s = match value {
        Value::String(s) if !s.is_empty() => s,
        _ => return Value::Null,
    };
    let number = digits(s.trim());

    let formatted = match number.len() {
        10 => format!("+55 ({}) {}-{}", &number[..2], &number[2..6], &number[6..]),
        11 => format!("+55 ({}) {}-{}", &number[..2], &number[2..7], &number[7..]),
        12 => format!(
            "+{} ({}) {}-{}",
            &number[..2],
            &number[2..4],
            &number[4..8],
            &number[8..]
        ),
        13 => format!(
            "+{} ({}) {}-{}",
            &number[..2],
            &number[2..4],
            &number[4..9],
            &number[9..]
        ),
        _ => number,
    };

    Value::String(formatted)
}

/// Drop characters that cannot appear in an e-mail address
pub fn email(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => Value::String(NOT_EMAIL.replace_all(&s, "").to_string()),
        _ => Value::Null,
    }
}

/// Format as `000.000.000-00` (CPF) or `00.000.000/0000-00` (CNPJ)
pub fn cpf_cnpj(value: Value, _params: &Params) -> Value {
    let s = match value {
        Value::String(s) if !s.is_empty() => s,
        _ => return Value::Null,
    };
    let doc = digits(&s);

    match doc.len() {
        11 => Value::String(format!(
            "{}.{}.{}-{}",
            &doc[..3],
            &doc[3..6],
            &doc[6..9],
            &doc[9..]
        )),
        14 => Value::String(format!(
            "{}.{}.{}/{}-{}",
            &doc[..2],
            &doc[2..5],
            &doc[5..8],
            &doc[8..12],
            &doc[12..]
        )),
        _ => Value::Null,
    }
}

/// Replace `null`/`""` with the `value` parameter
pub fn default_if_empty(value: Value, params: &Params) -> Value {
    if is_blank(&value) {
        params.get("value").map(|v| v.to_value()).unwrap_or(Value::Null)
    } else {
        value
    }
}

pub fn boolean(value: Value, _params: &Params) -> Value {
    Value::Bool(is_truthy(&value))
}

/// Leading integer part, e.g. `"42abc"` becomes `42`
pub fn integer(value: Value, _params: &Params) -> Value {
    if is_blank(&value) {
        return Value::Null;
    }
    Value::from(loose_int(&value))
}

/// First `length` characters of the textual value
pub fn truncate(value: Value, params: &Params) -> Value {
    if is_blank(&value) {
        return Value::Null;
    }
    let (Some(length), Some(text)) = (params.int("length"), as_text(&value)) else {
        return Value::Null;
    };

    Value::String(text.chars().take(length.max(0) as usize).collect())
}

/// Round to two decimals, halves away from zero
pub fn currency(value: Value, _params: &Params) -> Value {
    if is_blank(&value) {
        return Value::Null;
    }

    let exact = as_text(&value).and_then(|text| Decimal::from_str(text.trim()).ok());
    let amount = match exact {
        Some(amount) => amount,
        None => match Decimal::try_from(loose_float(&value)) {
            Ok(amount) => amount,
            Err(_) => return Value::Null,
        },
    };

    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    f64::try_from(rounded).map(Value::from).unwrap_or(Value::Null)
}

/// Trim leading and trailing whitespace from a string
pub fn trim(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

/// Strip all HTML tags from a string
pub fn strip_html(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => Value::String(HTML_TAG_PATTERN.replace_all(&s, "").to_string()),
        other => other,
    }
}

/// Collapse runs of whitespace into a single space
pub fn normalize_whitespace(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => Value::String(collapse(&s)),
        other => other,
    }
}

/// Remove control characters, keeping newlines and tabs
pub fn remove_control_chars(value: Value, _params: &Params) -> Value {
    match value {
        Value::String(s) => Value::String(CONTROL_CHARS.replace_all(&s, "").to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn none() -> Params {
        Params::new()
    }

    #[test]
    fn test_alpha_num_and_safe_string() {
        assert_eq!(
            alpha_num(json!("<b>João</b>  da   Silva!!"), &none()),
            json!("João da Silva")
        );
        assert_eq!(
            safe_string(json!("  Hello,\n world! <script>x</script>'"), &none()),
            json!("Hello, world! x")
        );
        assert_eq!(alpha_num(json!(12), &none()), Value::Null);
    }

    #[test]
    fn test_lower() {
        assert_eq!(lower(json!("  FOO@BAR.COM "), &none()), json!("foo@bar.com"));
        assert_eq!(lower(json!("<i>ÁRVORE</i>"), &none()), json!("árvore"));
        assert_eq!(lower(Value::Null, &none()), Value::Null);
    }

    #[test]
    fn test_phone_br() {
        assert_eq!(phone_br(json!("11987654321"), &none()), json!("+55 (11) 98765-4321"));
        assert_eq!(phone_br(json!("(11) 3456-7890"), &none()), json!("+55 (11) 3456-7890"));
        assert_eq!(
            phone_br(json!("+55 (11) 98765-4321"), &none()),
            json!("+55 (11) 98765-4321")
        );
        assert_eq!(phone_br(json!("12-34"), &none()), json!("1234"));
        assert_eq!(phone_br(json!(""), &none()), Value::Null);
    }

    #[test]
    fn test_email_and_tax_ids() {
        assert_eq!(email(json!("jo hn(at)@ex ample.com"), &none()), json!("johnat@example.com"));
        assert_eq!(cpf_cnpj(json!("52998224725"), &none()), json!("529.982.247-25"));
        assert_eq!(
            cpf_cnpj(json!("11222333000181"), &none()),
            json!("11.222.333/0001-81")
        );
        assert_eq!(cpf_cnpj(json!("123"), &none()), Value::Null);
    }

    #[test]
    fn test_defaults_and_conversions() {
        let fallback = Params::new().with("value", 3600);
        assert_eq!(default_if_empty(json!(""), &fallback), json!(3600));
        assert_eq!(default_if_empty(json!(10), &fallback), json!(10));
        assert_eq!(default_if_empty(Value::Null, &none()), Value::Null);

        assert_eq!(boolean(json!(""), &none()), json!(false));
        assert_eq!(boolean(json!("yes"), &none()), json!(true));
        assert_eq!(integer(json!("42abc"), &none()), json!(42));
        assert_eq!(integer(json!(""), &none()), Value::Null);
    }

    #[test]
    fn test_truncate_and_currency() {
        let five = Params::new().with("length", 5);
        assert_eq!(truncate(json!("abcdefgh"), &five), json!("abcde"));
        assert_eq!(truncate(json!("ação!!"), &five), json!("ação!"));
        assert_eq!(truncate(json!("abc"), &none()), Value::Null);

        assert_eq!(currency(json!("10.005"), &none()), json!(10.01));
        assert_eq!(currency(json!(2.5), &none()), json!(2.5));
        assert_eq!(currency(json!("-1.234"), &none()), json!(-1.23));
        assert_eq!(currency(json!(""), &none()), Value::Null);
    }

    #[test]
    fn test_text_cleaners_leave_non_strings_alone() {
        assert_eq!(trim(json!("  x  "), &none()), json!("x"));
        assert_eq!(trim(json!(5), &none()), json!(5));
        assert_eq!(strip_html(json!("<p>hi</p>"), &none()), json!("hi"));
        assert_eq!(
            normalize_whitespace(json!(" a \t\n b "), &none()),
            json!("a b")
        );
        assert_eq!(
            remove_control_chars(json!("a\u{0007}b\nc"), &none()),
            json!("ab\nc")
        );
    }
}
