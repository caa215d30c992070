//! Fixture schemas shared by the integration tests
#![allow(dead_code)]

use binder::{DirectiveContext, Params, Schema, SchemaBuilder};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

lazy_static! {
    static ref E164_REGEX: Regex = Regex::new(r"^\+?\d{1,3}\d{1,14}$").unwrap();
}

pub fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture payload must be an object, got {}", other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub const STRONG_PASSWORD_MESSAGE: &str =
    "Password must contain an uppercase letter, a lowercase letter, a number and a symbol.";
pub const PHONE_MESSAGE: &str = "Invalid phone number. Use the E.164 format.";

pub struct UserDto;

impl Schema for UserDto {
    fn schema_name() -> &'static str {
        "UserDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("externalId").typed("?string").annotate(
            r#"@Validation\NotEmpty(msg="External id is required")
               @Validation\String(msg="External id must be a string")"#,
        );
        schema.field("username").typed("?string").annotate(
            r#"@Validation\NotEmpty(msg="Username is required")
               @Validation\String(msg="Username must be a string")
               @Validation\MinLength(value="3", msg="Username must have at least 3 characters")
               @Validation\MaxLength(value="50", msg="Username must have at most 50 characters")
               @Sanitization\SafeString()"#,
        );
        schema.field("email").typed("?string").annotate(
            r#"@Validation\NotEmpty(msg="E-mail is required")
               @Validation\Email(msg="Invalid e-mail")
               @Sanitization\Lower()"#,
        );
        schema.field("phoneNumber").typed("?string").annotate(
            r#"@Validation\String(msg="Phone number must be a string")
               @CustomValidation\PhoneNumber()"#,
        );
        schema.field("password").typed("?string").annotate(
            r#"@Validation\NotEmpty(msg="Password is required")
               @Validation\MinLength(value="8", msg="Password must have at least 8 characters")
               @CustomValidation\StrongPassword()"#,
        );
        schema.field("accountStatus").typed("?string").annotate(
            r#"@Validation\Enum(options="['ACTIVE','INACTIVE','SUSPENDED', 'PENDING']", msg="Invalid account status")"#,
        );
        schema
            .field("emailVerified")
            .typed("?bool")
            .annotate(r#"@Validation\Boolean(msg="Email verified must be a boolean")"#);
        schema
            .field("customAttributes")
            .typed("?array")
            .annotate(r#"@Validation\List(msg="Custom attributes must be a list or JSON")"#);

        schema
            .custom_validator("phoneNumber", phone_number)
            .custom_validator("strongPassword", strong_password);
    }
}

fn phone_number(value: &Value, _: &Params, _: &DirectiveContext<'_>) -> Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) if E164_REGEX.is_match(s) => Ok(()),
        _ => Err(PHONE_MESSAGE.to_string()),
    }
}

fn strong_password(value: &Value, _: &Params, _: &DirectiveContext<'_>) -> Result<(), String> {
    let text = value.as_str().unwrap_or_default();
    let strong = text.chars().count() >= 8
        && text.chars().any(|c| c.is_ascii_lowercase())
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(|c| "@$!%*?&".contains(c));

    if strong {
        Ok(())
    } else {
        Err(STRONG_PASSWORD_MESSAGE.to_string())
    }
}

pub fn valid_user() -> Value {
    serde_json::json!({
        "externalId": "ext-1",
        "username": "jdoe",
        "email": "John.Doe@Example.com",
        "phoneNumber": "+5511987654321",
        "password": "Secret@123",
        "accountStatus": "ACTIVE",
        "emailVerified": true,
        "customAttributes": {"team": "core"}
    })
}

/// Public view of a user, without credentials
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub external_id: String,
    pub username: String,
    pub email: String,
    pub account_status: Option<String>,
}

pub struct UserBatchDto;

impl Schema for UserBatchDto {
    fn schema_name() -> &'static str {
        "UserBatchDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.uses::<UserDto>();
        schema
            .field("users")
            .typed("?array")
            .annotate(r#"@Dto\listOfObjects(class="UserDto")"#);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User listing with nested filters
// ─────────────────────────────────────────────────────────────────────────────

pub const START_REQUIRED: &str = "Start date: you must specify the start date";
pub const START_AFTER_END: &str = "Start date: cannot be after the end date";
pub const END_REQUIRED: &str = "End date: you must specify the end date";
pub const END_BEFORE_START: &str = "End date: cannot be before the start date";

pub struct UserListDto;

impl Schema for UserListDto {
    fn schema_name() -> &'static str {
        "UserListDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("format").typed("?string").annotate(
            r#"@Validation\Enum(options="['full','id','compact']", msg="Format: must be full, id or compact.")
               @Sanitization\DefaultIfEmpty(value="full")"#,
        );
        schema.field("search").typed("?string").annotate(
            r#"@Validation\String(msg="Search: must be text")
               @Validation\MaxLength(value="50", msg="Search: at most 50 characters.")"#,
        );
        schema.field("page").annotate(
            r#"@Validation\Integer(msg="Page: must be an integer.")
               @Sanitization\Integer()"#,
        );
        schema.field("rowsPerPage").annotate(
            r#"@Validation\Integer(msg="Rows per page: must be an integer.")
               @Sanitization\Integer()"#,
        );
        schema.field("filters").nested::<UserFilterDto>();
    }
}

pub struct UserFilterDto;

impl Schema for UserFilterDto {
    fn schema_name() -> &'static str {
        "UserFilterDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema
            .field("username")
            .typed("?string")
            .annotate(r#"@Validation\String(msg="Username: must be text")"#);
        schema
            .field("email")
            .typed("?string")
            .annotate(r#"@Validation\Email(msg="E-mail: must be a valid e-mail")"#);
        schema.field("accountStatus").typed("?string").annotate(
            r#"@Validation\Enum(options="['ACTIVE','INACTIVE','SUSPENDED']", msg="Account status: must be a valid option.")"#,
        );
        schema.field("createdAtPeriod").nested::<UserDatePeriodDto>();
        schema.field("updatedAtPeriod").nested::<UserDatePeriodDto>();
    }
}

pub struct UserDatePeriodDto;

impl Schema for UserDatePeriodDto {
    fn schema_name() -> &'static str {
        "UserDatePeriodDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("startDate").typed("?string").annotate(
            r#"@Validation\String(msg="Start date: must be text")
               @Validation\Date(msg="Start date: must be a date")
               @CustomValidation\StartDate()"#,
        );
        schema.field("endDate").typed("?string").annotate(
            r#"@Validation\String(msg="End date: must be text")
               @Validation\Date(msg="End date: must be a date")
               @CustomValidation\EndDate()"#,
        );

        schema
            .custom_validator("startDate", start_date)
            .custom_validator("endDate", end_date);
    }
}

fn filled<'a>(ctx: &DirectiveContext<'a>, key: &str) -> Option<&'a str> {
    ctx.raw_value(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn start_date(value: &Value, _: &Params, ctx: &DirectiveContext<'_>) -> Result<(), String> {
    let end = filled(ctx, "endDate");
    match (value.as_str(), end) {
        (Some(""), Some(_)) => Err(START_REQUIRED.to_string()),
        (Some(start), Some(end)) if !start.is_empty() && start > end => {
            Err(START_AFTER_END.to_string())
        }
        _ => Ok(()),
    }
}

fn end_date(value: &Value, _: &Params, ctx: &DirectiveContext<'_>) -> Result<(), String> {
    let start = filled(ctx, "startDate");
    match (value.as_str(), start) {
        (Some(""), Some(_)) => Err(END_REQUIRED.to_string()),
        (Some(end), Some(start)) if !end.is_empty() && end < start => {
            Err(END_BEFORE_START.to_string())
        }
        _ => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_TTL: i64 = 3600;

#[derive(Debug, Deserialize)]
pub struct CacheSetDto {
    pub key: String,
    pub value: Value,
    pub ttl: i64,
}

impl Schema for CacheSetDto {
    fn schema_name() -> &'static str {
        "CacheSetDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("key").typed("?string").annotate(
            r#"@Validation\string(msg="Cache key must be a string.")
               @Validation\notEmpty(msg="Cache key is required.")"#,
        );
        schema.field("value");
        schema.field("ttl").annotate(
            r#"@Validation\integer(msg="Cache TTL must be a number of seconds.")
               @CustomSanitization\defaultExpires()"#,
        );

        schema.custom_sanitizer("defaultExpires", default_expires);
    }
}

fn default_expires(value: Value, _: &Params, _: &DirectiveContext<'_>) -> Value {
    match &value {
        Value::Null => Value::from(DEFAULT_TTL),
        Value::String(s) if s.is_empty() => Value::from(DEFAULT_TTL),
        _ => Value::from(binder::types::loose_int(&value)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders: list composition and parent access
// ─────────────────────────────────────────────────────────────────────────────

pub const QUANTITY_OVER_LIMIT: &str = "Quantity exceeds the order limit";

pub struct OrderDto;

impl Schema for OrderDto {
    fn schema_name() -> &'static str {
        "OrderDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("reference").typed("?string").annotate(
            r#"@Sanitization\Trim() @Validation\NotEmpty(msg="Reference is required")"#,
        );
        schema.field("maxQuantity").typed("?int");
        schema.field("lines").typed("?array").each_as::<OrderLineDto>();
        schema.field("customer").nested::<CustomerDto>();
    }
}

pub struct OrderLineDto;

impl Schema for OrderLineDto {
    fn schema_name() -> &'static str {
        "OrderLineDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema
            .field("sku")
            .typed("?string")
            .annotate(r#"@Sanitization\Trim() @Validation\NotEmpty(msg="SKU is required")"#);
        schema
            .field("quantity")
            .typed("?int")
            .validate("interval", Params::new().with("min", 1).with("msg", "Quantity must be positive"))
            .custom_validate("withinOrderLimit", Params::new());

        schema.custom_validator("withinOrderLimit", within_order_limit);
    }
}

/// Compares against `maxQuantity` of the order the line belongs to
fn within_order_limit(value: &Value, _: &Params, ctx: &DirectiveContext<'_>) -> Result<(), String> {
    let limit = ctx
        .parent()
        .and_then(|order| order.raw_value("maxQuantity"))
        .and_then(Value::as_i64);

    match (value.as_i64(), limit) {
        (Some(quantity), Some(limit)) if quantity > limit => Err(QUANTITY_OVER_LIMIT.to_string()),
        _ => Ok(()),
    }
}

pub struct CustomerDto;

impl Schema for CustomerDto {
    fn schema_name() -> &'static str {
        "CustomerDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("name").typed("?string").annotate(
            r#"@Sanitization\NormalizeWhitespace() @Validation\NotEmpty(msg="Customer name is required")"#,
        );
        schema
            .field("document")
            .typed("?string")
            .annotate(r#"@Validation\CpfCnpj(msg="Invalid document") @Sanitization\CpfCnpj()"#);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline order
// ─────────────────────────────────────────────────────────────────────────────

pub const NOT_ALLOWED: &str = "Address is not allowed";

/// Lowercases before checking
pub struct LowerFirstDto;

impl Schema for LowerFirstDto {
    fn schema_name() -> &'static str {
        "LowerFirstDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("email").typed("?string").annotate(
            r#"@Sanitization\Lower()
               @Validation\Email(msg="Invalid e-mail")
               @Validation\Enum(options="['foo@bar.com']", msg="Address is not allowed")
               @CustomValidation\echoValue()"#,
        );
        schema.custom_validator("echoValue", echo_value);
    }
}

/// Checks before lowercasing
pub struct CheckFirstDto;

impl Schema for CheckFirstDto {
    fn schema_name() -> &'static str {
        "CheckFirstDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("email").typed("?string").annotate(
            r#"@Validation\Email(msg="Invalid e-mail")
               @Validation\Enum(options="['foo@bar.com']", msg="Address is not allowed")
               @CustomValidation\echoValue()
               @Sanitization\Lower()"#,
        );
        schema.custom_validator("echoValue", echo_value);
    }
}

/// Always fails, reporting the value it was handed
fn echo_value(value: &Value, _: &Params, _: &DirectiveContext<'_>) -> Result<(), String> {
    Err(format!("saw {}", value))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authoring defects
// ─────────────────────────────────────────────────────────────────────────────

pub struct MissingCustomDto;

impl Schema for MissingCustomDto {
    fn schema_name() -> &'static str {
        "MissingCustomDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("name").typed("?string").annotate(
            r#"@Sanitization\Trim()
               @Validation\NotEmpty(msg="Name is required")
               @CustomValidation\doesNotExist()"#,
        );
    }
}

pub struct MissingClassDto;

impl Schema for MissingClassDto {
    fn schema_name() -> &'static str {
        "MissingClassDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema
            .field("items")
            .annotate(r#"@Dto\listOfObjects(class="NoSuchItemDto")"#);
    }
}

pub struct UnknownTypeDto;

impl Schema for UnknownTypeDto {
    fn schema_name() -> &'static str {
        "UnknownTypeDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("owner").typed("NoSuchOwnerDto");
    }
}

/// Every node requires a child, so binding never bottoms out
pub struct EndlessNodeDto;

impl Schema for EndlessNodeDto {
    fn schema_name() -> &'static str {
        "EndlessNodeDto"
    }

    fn declare(schema: &mut SchemaBuilder) {
        schema.field("label").typed("?string");
        schema.field("child").nested::<EndlessNodeDto>();
    }
}
