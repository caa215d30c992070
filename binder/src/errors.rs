//! Error types and the per-bind error aggregator
//!
//! [`ErrorReport`] accumulates every failing directive of a bind call before
//! anything is raised. Nested objects and list elements contribute whole
//! sub-reports rather than flat strings, so a caller can tell exactly which
//! sub-field failed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::DirectiveCategory;

/// Status the surrounding application answers with on validation failure
pub const VALIDATION_STATUS: u16 = 409;

/// A single flattened validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path to the failing field, e.g. `filters.createdAtPeriod.startDate`
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Everything that went wrong with one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    messages: Vec<String>,
    nested: Option<ErrorReport>,
    items: BTreeMap<usize, ErrorReport>,
}

impl FieldErrors {
    /// Messages from the field's own directives, in execution order
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Report of a nested object that failed to bind
    pub fn nested(&self) -> Option<&ErrorReport> {
        self.nested.as_ref()
    }

    /// Reports of failing list elements keyed by element index
    pub fn items(&self) -> &BTreeMap<usize, ErrorReport> {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&ErrorReport> {
        self.items.get(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.nested.is_none() && self.items.is_empty()
    }

    fn merge(&mut self, other: FieldErrors) {
        self.messages.extend(other.messages);
        if let Some(nested) = other.nested {
            match self.nested.as_mut() {
                Some(existing) => existing.merge(nested),
                None => self.nested = Some(nested),
            }
        }
        for (index, report) in other.items {
            self.items.entry(index).or_default().merge(report);
        }
    }

    /// JSON shape: a plain message list when only messages exist, the nested
    /// report or the index map when that is all there is, otherwise an object
    /// holding the non-empty parts under `messages`, `fields` and `items`.
    pub fn to_value(&self) -> Value {
        let has_nested = self.nested.is_some();
        let has_items = !self.items.is_empty();

        match (self.messages.is_empty(), has_nested, has_items) {
            (_, false, false) => messages_value(&self.messages),
            (true, true, false) => self
                .nested
                .as_ref()
                .map(ErrorReport::to_value)
                .unwrap_or(Value::Null),
            (true, false, true) => items_value(&self.items),
            _ => {
                let mut out = Map::new();
                if !self.messages.is_empty() {
                    out.insert("messages".to_string(), messages_value(&self.messages));
                }
                if let Some(nested) = &self.nested {
                    out.insert("fields".to_string(), nested.to_value());
                }
                if has_items {
                    out.insert("items".to_string(), items_value(&self.items));
                }
                Value::Object(out)
            }
        }
    }
}

fn messages_value(messages: &[String]) -> Value {
    Value::Array(messages.iter().cloned().map(Value::String).collect())
}

fn items_value(items: &BTreeMap<usize, ErrorReport>) -> Value {
    Value::Object(
        items
            .iter()
            .map(|(index, report)| (index.to_string(), report.to_value()))
            .collect(),
    )
}

/// Field name to errors, in the order fields first failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport {
    entries: Vec<(String, FieldErrors)>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    fn entry_mut(&mut self, field: &str) -> &mut FieldErrors {
        let position = match self.entries.iter().position(|(name, _)| name == field) {
            Some(position) => position,
            None => {
                self.entries.push((field.to_string(), FieldErrors::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    /// Append a message to a field's error list
    pub fn push_message(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.entry_mut(field).messages.push(message.into());
        self
    }

    /// Attach the report of a nested object under `field`. Empty reports are ignored.
    pub fn attach_nested(&mut self, field: &str, report: ErrorReport) -> &mut Self {
        if report.is_empty() {
            return self;
        }
        let entry = self.entry_mut(field);
        match entry.nested.as_mut() {
            Some(existing) => existing.merge(report),
            None => entry.nested = Some(report),
        }
        self
    }

    /// Attach the report of list element `index` under `field`. Empty reports are ignored.
    pub fn attach_item(&mut self, field: &str, index: usize, report: ErrorReport) -> &mut Self {
        if report.is_empty() {
            return self;
        }
        self.entry_mut(field)
            .items
            .entry(index)
            .or_default()
            .merge(report);
        self
    }

    /// Fold another report into this one, field by field
    pub fn merge(&mut self, other: ErrorReport) {
        for (field, errors) in other.entries {
            if !errors.is_empty() {
                self.entry_mut(&field).merge(errors);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, errors)| errors.is_empty())
    }

    /// Number of failing fields at this level
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|(_, errors)| !errors.is_empty()).count()
    }

    pub fn get(&self, field: &str) -> Option<&FieldErrors> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, errors)| errors)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Shortcut for the plain messages of a field
    pub fn messages(&self, field: &str) -> &[String] {
        self.get(field).map(FieldErrors::messages).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldErrors)> {
        self.entries.iter().map(|(name, errors)| (name.as_str(), errors))
    }

    /// Flatten into one error per message with dotted field paths
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut out = vec![];
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<FieldError>) {
        for (field, errors) in &self.entries {
            let path = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{}.{}", prefix, field)
            };

            for message in &errors.messages {
                out.push(FieldError::new(path.clone(), message.clone()));
            }
            if let Some(nested) = &errors.nested {
                nested.flatten_into(&path, out);
            }
            for (index, report) in &errors.items {
                report.flatten_into(&format!("{}.{}", path, index), out);
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .filter(|(_, errors)| !errors.is_empty())
                .map(|(field, errors)| (field.clone(), errors.to_value()))
                .collect(),
        )
    }
}

impl Serialize for ErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// User-input defect: one or more fields failed their directives
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    report: ErrorReport,
}

impl ValidationError {
    pub fn new(report: ErrorReport) -> Self {
        Self { report }
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut report = ErrorReport::new();
        report.push_message(field, message);
        Self { report }
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }

    pub fn status(&self) -> u16 {
        VALIDATION_STATUS
    }

    /// `{"status": 409, "data": <report>}`
    pub fn details(&self) -> Value {
        serde_json::json!({
            "status": self.status(),
            "data": self.report.to_value(),
        })
    }

    pub fn field_errors(&self) -> Vec<FieldError> {
        self.report.field_errors()
    }

    pub fn summary(&self) -> String {
        let fields: Vec<&str> = self.report.fields().collect();
        if fields.len() == 1 {
            format!("Validation failed for field '{}'", fields[0])
        } else {
            format!("Validation failed for {} fields", fields.len())
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl std::error::Error for ValidationError {}

/// Everything a bind call can fail with
#[derive(Error, Debug)]
pub enum BindError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{category} directive '{name}' is not defined for schema '{schema}'")]
    DirectiveNotFound {
        schema: String,
        category: DirectiveCategory,
        name: String,
    },

    #[error("type '{name}' is neither a scalar type nor a schema known to the declaring schema")]
    UnresolvedType { name: String },

    #[error("schema '{schema}' exceeds the maximum nesting depth of {limit}")]
    DepthExceeded { schema: String, limit: usize },

    #[error("bound value does not fit the target type: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl BindError {
    /// Schema authoring defects, never suppressed by `ignore_validation`
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BindError::DirectiveNotFound { .. }
                | BindError::UnresolvedType { .. }
                | BindError::DepthExceeded { .. }
        )
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            BindError::Validation(err) => Some(err),
            _ => None,
        }
    }
}
