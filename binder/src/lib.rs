//! Schema binding and validation
//!
//! Turns untyped key/value payloads into typed, validated objects following
//! per-field directives declared once per schema type.
//!
//! ```ignore
//! use binder::{bind, Params, Schema, SchemaBuilder};
//!
//! struct SignupDto;
//!
//! impl Schema for SignupDto {
//!     fn schema_name() -> &'static str {
//!         "SignupDto"
//!     }
//!
//!     fn declare(schema: &mut SchemaBuilder) {
//!         schema.field("email").typed("?string").annotate(
//!             r#"@Sanitization\Lower()
//!                @Validation\NotEmpty(msg="E-mail is required")
//!                @Validation\Email(msg="Invalid e-mail")"#,
//!         );
//!         schema
//!             .field("username")
//!             .typed("?string")
//!             .validate("minLength", Params::new().with("value", 3));
//!     }
//! }
//!
//! let bound = bind::<SignupDto>(&payload, false)?;
//! assert_eq!(bound.value("email"), Some(&json!("foo@bar.com")));
//! ```

pub mod binder;
pub mod config;
pub mod directives;
pub mod errors;
pub mod instance;
pub mod parser;
pub mod registry;
pub mod sanitizers;
pub mod schema;
pub mod types;
pub mod validators;

pub use binder::{bind, bind_as, Binder};
pub use config::BinderConfig;
pub use directives::{CustomDirectives, CustomSanitizer, CustomValidator};
pub use errors::{BindError, ErrorReport, FieldError, FieldErrors, ValidationError};
pub use instance::{Bound, BoundInstance, BoundValue, DirectiveContext, InstanceGraph, NodeId};
pub use registry::{SchemaRef, SchemaTable};
pub use schema::{
    describe, DirectiveCategory, DirectiveSpec, FieldDescriptor, FieldType, Literal, Params,
    Schema, SchemaBuilder, SchemaDescriptor,
};
pub use types::ScalarKind;
