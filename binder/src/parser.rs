//! Directive declaration parser
//!
//! Turns declaration blocks such as
//!
//! ```text
//! @Sanitization\Lower()
//! @Validation\MinLength(value="3":int, msg="Username is too short")
//! @Dto\listOfObjects(class="UserDto")
//! ```
//!
//! into ordered [`DirectiveSpec`]s. Parsing never fails: unknown categories are
//! skipped and parameters that do not follow `key="value"` are dropped.

use lazy_static::lazy_static;
use regex::Regex;

use crate::schema::{DirectiveCategory, DirectiveSpec, Literal, Params};

lazy_static! {
    /// `@Category\Name` with an optional parenthesised parameter list. Parentheses
    /// inside quoted values do not close the list.
    static ref DIRECTIVE_REGEX: Regex = Regex::new(
        r#"@(Validation|Sanitization|CustomValidation|CustomSanitization|Dto|Composition)\\(\w+)(\(((?:[^)"]|"[^"]*")*)\))?"#
    )
    .unwrap();

    /// `key="value"` with an optional `:type` suffix
    static ref PARAM_REGEX: Regex = Regex::new(r#"(\w+)="([^"]+)":?(\w+)?"#).unwrap();
}

/// Every directive in `source`, in the order written
pub fn parse_directives(source: &str) -> Vec<DirectiveSpec> {
    DIRECTIVE_REGEX
        .captures_iter(source)
        .filter_map(|caps| {
            let category = DirectiveCategory::from_name(caps.get(1)?.as_str())?;
            let name = caps.get(2)?.as_str();
            let params = caps
                .get(4)
                .map(|args| parse_params(args.as_str()))
                .unwrap_or_default();

            Some(DirectiveSpec::new(category, name, params))
        })
        .collect()
}

/// Parameters of one directive. Anything that is not `key="value"` or
/// `key="value":type` is ignored.
pub fn parse_params(source: &str) -> Params {
    let mut params = Params::new();

    for caps in PARAM_REGEX.captures_iter(source) {
        let (Some(key), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let type_hint = caps.get(3).map(|m| m.as_str());
        params.insert(key.as_str(), parse_literal(raw.as_str(), type_hint));
    }

    params
}

/// Coerce a raw parameter string by its `:type` suffix. Numbers that do not
/// parse stay strings.
pub fn parse_literal(raw: &str, type_hint: Option<&str>) -> Literal {
    match type_hint.map(str::to_lowercase).as_deref() {
        Some("int") | Some("integer") => raw
            .trim()
            .parse::<i64>()
            .map(Literal::Int)
            .unwrap_or_else(|_| Literal::Str(raw.to_string())),
        Some("float") | Some("double") => raw
            .trim()
            .parse::<f64>()
            .map(Literal::Float)
            .unwrap_or_else(|_| Literal::Str(raw.to_string())),
        Some("bool") | Some("boolean") => Literal::Bool(raw == "true"),
        _ => Literal::Str(raw.to_string()),
    }
}
