//! Schema descriptors and the builder schemas are declared with
//!
//! A schema type implements [`Schema`] and declares its fields once through a
//! [`SchemaBuilder`]. [`describe`] turns that declaration into an immutable
//! [`SchemaDescriptor`], memoized per type for the life of the process.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::directives::{
    Composition, CustomDirectives, CustomSanitizer, CustomValidator, LIST_OF_OBJECTS,
};
use crate::errors::BindError;
use crate::parser;
use crate::registry::{SchemaRef, SchemaTable};
use crate::types::ScalarKind;

/// A type whose instances are bound from raw key/value payloads
///
/// ```ignore
/// struct CacheGetDto;
///
/// impl Schema for CacheGetDto {
///     fn schema_name() -> &'static str {
///         "CacheGetDto"
///     }
///
///     fn declare(schema: &mut SchemaBuilder) {
///         schema.field("key").typed("?string").annotate(
///             r#"@Validation\string(msg="Cache key must be a string.")
///                @Validation\notEmpty(msg="Cache key is required.")"#,
///         );
///     }
/// }
/// ```
pub trait Schema: 'static {
    /// Name other schemas refer to this one by
    fn schema_name() -> &'static str;

    /// Declare fields, in binding order, and the custom directives they use
    fn declare(schema: &mut SchemaBuilder);
}

// ─────────────────────────────────────────────────────────────────────────────
// Directive declarations
// ─────────────────────────────────────────────────────────────────────────────

/// What a directive does to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectiveCategory {
    Validation,
    Sanitization,
    CustomValidation,
    CustomSanitization,
    Composition,
}

impl DirectiveCategory {
    /// Parse the category part of a declaration. `Dto` is accepted as an alias of
    /// `Composition`; unknown categories yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Validation" => Some(DirectiveCategory::Validation),
            "Sanitization" => Some(DirectiveCategory::Sanitization),
            "CustomValidation" => Some(DirectiveCategory::CustomValidation),
            "CustomSanitization" => Some(DirectiveCategory::CustomSanitization),
            "Composition" | "Dto" => Some(DirectiveCategory::Composition),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DirectiveCategory::Validation | DirectiveCategory::CustomValidation
        )
    }
}

impl fmt::Display for DirectiveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectiveCategory::Validation => "Validation",
            DirectiveCategory::Sanitization => "Sanitization",
            DirectiveCategory::CustomValidation => "CustomValidation",
            DirectiveCategory::CustomSanitization => "CustomSanitization",
            DirectiveCategory::Composition => "Composition",
        };
        write!(f, "{}", name)
    }
}

/// A literal directive parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; numeric strings are parsed
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Literal::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float view; numeric strings are parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            Literal::Str(s) => s.trim().parse().ok(),
            Literal::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            Literal::Str(s) if s == "true" => Some(true),
            Literal::Str(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Str(s) => s.clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::from(*i),
            Literal::Float(f) => Value::from(*f),
            Literal::Str(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

/// Named literal parameters of a directive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, Literal>);

impl Params {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<Literal>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Literal>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Literal::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Literal::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Literal::as_f64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Literal::as_bool)
    }

    /// The configured failure message (`msg`)
    pub fn message(&self) -> Option<String> {
        self.get("msg").map(Literal::to_text)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One declared step of a field's pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveSpec {
    pub category: DirectiveCategory,
    pub name: String,
    pub params: Params,
}

impl DirectiveSpec {
    pub fn new(category: DirectiveCategory, name: impl Into<String>, params: Params) -> Self {
        Self {
            category,
            name: name.into(),
            params,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Declared type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarKind),
    Nested(SchemaRef),
    ListOf(SchemaRef),
}

impl FieldType {
    pub fn display_name(&self) -> String {
        match self {
            FieldType::Scalar(kind) => kind.display_name().to_string(),
            FieldType::Nested(target) => target.name().to_string(),
            FieldType::ListOf(target) => format!("{}[]", target.name()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// Replayed in exactly this order
    pub directives: Vec<DirectiveSpec>,
}

/// Immutable field-level contract of a schema type
#[derive(Debug)]
pub struct SchemaDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    customs: CustomDirectives,
    schemas: SchemaTable,
}

impl SchemaDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn customs(&self) -> &CustomDirectives {
        &self.customs
    }

    /// Schemas this one may refer to by name
    pub fn schemas(&self) -> &SchemaTable {
        &self.schemas
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum DeclaredType {
    Resolved(FieldType),
    Named(String),
}

/// Declares one field
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    name: String,
    declared: DeclaredType,
    directives: Vec<DirectiveSpec>,
    uses: Vec<SchemaRef>,
}

impl FieldBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declared: DeclaredType::Resolved(FieldType::Scalar(ScalarKind::Any)),
            directives: vec![],
            uses: vec![],
        }
    }

    /// Declare a scalar kind
    pub fn of(&mut self, kind: ScalarKind) -> &mut Self {
        self.declared = DeclaredType::Resolved(FieldType::Scalar(kind));
        self
    }

    /// Declare the type by name: a scalar name (`"?string"`, `"int"`), a
    /// schema name known to this schema (see [`SchemaBuilder::uses`]), or such a
    /// name suffixed with `[]`. Names are
    /// resolved when the descriptor is built.
    pub fn typed(&mut self, type_name: &str) -> &mut Self {
        self.declared = DeclaredType::Named(type_name.to_string());
        self
    }

    /// Declare the field as a nested object of schema `T`
    pub fn nested<T: Schema>(&mut self) -> &mut Self {
        self.declared = DeclaredType::Resolved(FieldType::Nested(SchemaRef::of::<T>()));
        self
    }

    /// Declare the field as a list of objects of schema `T`
    pub fn list_of<T: Schema>(&mut self) -> &mut Self {
        self.declared = DeclaredType::Resolved(FieldType::ListOf(SchemaRef::of::<T>()));
        self
    }

    /// Append every directive found in a declaration block such as
    /// `@Validation\MinLength(value="3", msg="too short") @Sanitization\Lower()`
    pub fn annotate(&mut self, declarations: &str) -> &mut Self {
        self.directives.extend(parser::parse_directives(declarations));
        self
    }

    pub fn directive(&mut self, spec: DirectiveSpec) -> &mut Self {
        self.directives.push(spec);
        self
    }

    pub fn validate(&mut self, name: &str, params: Params) -> &mut Self {
        self.directive(DirectiveSpec::new(DirectiveCategory::Validation, name, params))
    }

    pub fn sanitize(&mut self, name: &str, params: Params) -> &mut Self {
        self.directive(DirectiveSpec::new(DirectiveCategory::Sanitization, name, params))
    }

    pub fn custom_validate(&mut self, name: &str, params: Params) -> &mut Self {
        self.directive(DirectiveSpec::new(
            DirectiveCategory::CustomValidation,
            name,
            params,
        ))
    }

    pub fn custom_sanitize(&mut self, name: &str, params: Params) -> &mut Self {
        self.directive(DirectiveSpec::new(
            DirectiveCategory::CustomSanitization,
            name,
            params,
        ))
    }

    /// Bind each element of the (sanitized) list value against schema `T`
    pub fn each_as<T: Schema>(&mut self) -> &mut Self {
        self.uses.push(SchemaRef::of::<T>());
        self.directive(DirectiveSpec::new(
            DirectiveCategory::Composition,
            LIST_OF_OBJECTS,
            Params::new().with("class", T::schema_name()),
        ))
    }

    /// Schemas this field names through its declaration
    fn references(&self) -> impl Iterator<Item = SchemaRef> + '_ {
        let declared = match &self.declared {
            DeclaredType::Resolved(FieldType::Nested(target))
            | DeclaredType::Resolved(FieldType::ListOf(target)) => Some(*target),
            _ => None,
        };
        declared.into_iter().chain(self.uses.iter().copied())
    }

    fn build(self, schemas: &SchemaTable) -> Result<FieldDescriptor, BindError> {
        let field_type = match self.declared {
            DeclaredType::Resolved(field_type) => field_type,
            DeclaredType::Named(type_name) => schemas.resolve(&type_name)?,
        };

        for directive in &self.directives {
            if directive.category == DirectiveCategory::Composition
                && Composition::from_name(&directive.name) == Some(Composition::ListOfObjects)
            {
                schemas.target(directive.params.str("class").unwrap_or_default())?;
            }
        }

        Ok(FieldDescriptor {
            name: self.name,
            field_type,
            directives: self.directives,
        })
    }
}

/// Collects a schema's field declarations and custom directives
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldBuilder>,
    customs: CustomDirectives,
    schemas: SchemaTable,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: vec![],
            customs: CustomDirectives::default(),
            schemas: SchemaTable::new(),
        }
    }

    /// Make `T` resolvable by name from this schema's type names and
    /// `listOfObjects(class="...")` declarations
    pub fn uses<T: Schema>(&mut self) -> &mut Self {
        self.schemas.register::<T>();
        self
    }

    /// Start (or continue) declaring a field. Fields bind in first-declared order.
    pub fn field(&mut self, name: &str) -> &mut FieldBuilder {
        let position = match self.fields.iter().position(|f| f.name == name) {
            Some(position) => position,
            None => {
                self.fields.push(FieldBuilder::new(name));
                self.fields.len() - 1
            }
        };
        &mut self.fields[position]
    }

    pub fn custom_validator(&mut self, name: &str, validator: CustomValidator) -> &mut Self {
        self.customs.register_validator(name, validator);
        self
    }

    pub fn custom_sanitizer(&mut self, name: &str, sanitizer: CustomSanitizer) -> &mut Self {
        self.customs.register_sanitizer(name, sanitizer);
        self
    }

    /// Resolve declared type names and composition classes, then freeze the
    /// descriptor
    pub fn build(self) -> Result<SchemaDescriptor, BindError> {
        let mut schemas = self.schemas;
        for field in &self.fields {
            field.references().for_each(|target| schemas.insert(target));
        }

        let fields = self
            .fields
            .into_iter()
            .map(|field| field.build(&schemas))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SchemaDescriptor {
            name: self.name,
            fields,
            customs: self.customs,
            schemas,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Descriptor cache
// ─────────────────────────────────────────────────────────────────────────────

static DESCRIPTORS: Lazy<RwLock<HashMap<TypeId, Arc<SchemaDescriptor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Descriptor of `T`, built on first use and shared afterwards.
///
/// Fails only when a field names a type that cannot be resolved; failures are
/// not cached.
pub fn describe<T: Schema>() -> Result<Arc<SchemaDescriptor>, BindError> {
    let type_id = TypeId::of::<T>();
    if let Some(descriptor) = DESCRIPTORS.read().get(&type_id) {
        return Ok(Arc::clone(descriptor));
    }

    let mut builder = SchemaBuilder::new(T::schema_name());
    builder.uses::<T>();
    T::declare(&mut builder);
    let descriptor = Arc::new(builder.build()?);

    tracing::debug!(
        schema = descriptor.name(),
        fields = descriptor.fields().len(),
        "schema descriptor built"
    );

    // Two threads may race to build the same descriptor; the first one stored wins
    let mut cache = DESCRIPTORS.write();
    Ok(Arc::clone(cache.entry(type_id).or_insert(descriptor)))
}
