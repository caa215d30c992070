mod common;

use binder::{bind, Schema, SchemaBuilder};
use common::*;
use proptest::prelude::*;
use serde_json::json;

struct ProfileDto;

impl Schema for ProfileDto {
    fn schema_name() -> &'static str {
        "ProfileDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("displayName").typed("?string").annotate(
            r#"@Sanitization\RemoveControlChars()
               @Sanitization\StripHtml()
               @Sanitization\NormalizeWhitespace()
               @Sanitization\DefaultIfEmpty(value="anonymous")"#,
        );
        schema
            .field("handle")
            .typed("?string")
            .annotate(r#"@Sanitization\Lower() @Sanitization\AlphaNum()"#);
        schema
            .field("phone")
            .typed("?string")
            .annotate(r#"@Sanitization\PhoneBr()"#);
        schema
            .field("visits")
            .typed("?int")
            .annotate(r#"@Validation\Integer(msg="Visits must be an integer") @Sanitization\Integer()"#);
    }
}

#[test]
fn rebinding_a_bound_user_changes_nothing() {
    let first = bind::<UserDto>(&payload(valid_user()), false).unwrap();
    let second = bind::<UserDto>(&payload(first.to_value()), false).unwrap();

    assert_eq!(first.to_value(), second.to_value());
}

proptest! {
    #[test]
    fn prop_sanitized_output_is_a_fixed_point(
        display_name in "[ a-zA-Z<>/\t]{0,40}",
        handle in "[ a-zA-Z0-9<>!._-]{0,30}",
        phone in "\\(?[0-9]{2}\\)? ?[0-9]{4,5}-?[0-9]{4}",
        visits in 0i64..100_000,
    ) {
        let raw = json!({
            "displayName": display_name,
            "handle": handle,
            "phone": phone,
            "visits": visits,
        });

        let first = bind::<ProfileDto>(&payload(raw), false).unwrap();
        let second = bind::<ProfileDto>(&payload(first.to_value()), false).unwrap();

        prop_assert_eq!(first.to_value(), second.to_value());
    }
}
