//! Type registry
//!
//! Resolves declared field types. Scalar names map to [`ScalarKind`]; any other
//! name must belong to a schema in the declaring schema's [`SchemaTable`]. A
//! schema's table holds the schema itself, the targets of its
//! `nested::<T>()`/`list_of::<T>()`/`each_as::<T>()` fields and every schema
//! declared with `SchemaBuilder::uses::<T>()`. Resolution therefore depends on
//! the declaration alone, never on what the process has bound before.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::errors::BindError;
use crate::schema::{describe, FieldType, Schema, SchemaDescriptor};
use crate::types::ScalarKind;

type DescriptorFactory = fn() -> Result<Arc<SchemaDescriptor>, BindError>;

/// Lazy handle to a schema's descriptor. Holding one never builds the
/// descriptor, so schemas may refer to each other freely.
#[derive(Clone, Copy)]
pub struct SchemaRef {
    name: &'static str,
    factory: DescriptorFactory,
}

impl SchemaRef {
    pub fn of<T: Schema>() -> Self {
        Self {
            name: T::schema_name(),
            factory: describe::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn descriptor(&self) -> Result<Arc<SchemaDescriptor>, BindError> {
        (self.factory)()
    }
}

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaRef").field(&self.name).finish()
    }
}

/// Table key: last `\`, `::` or `.` separated segment, lower-cased
fn normalize(name: &str) -> String {
    let trimmed = name.trim().trim_start_matches('?');
    trimmed
        .rsplit(|c: char| c == '\\' || c == ':' || c == '.')
        .next()
        .unwrap_or(trimmed)
        .to_lowercase()
}

/// Schemas one schema may refer to by name
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    entries: HashMap<String, SchemaRef>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `target`; an earlier entry under the same name is kept
    pub fn insert(&mut self, target: SchemaRef) {
        self.entries
            .entry(normalize(target.name()))
            .or_insert(target);
    }

    pub fn register<T: Schema>(&mut self) {
        self.insert(SchemaRef::of::<T>());
    }

    pub fn lookup(&self, name: &str) -> Option<SchemaRef> {
        self.entries.get(&normalize(name)).copied()
    }

    /// Like [`SchemaTable::lookup`], failing with `UnresolvedType`
    pub fn target(&self, name: &str) -> Result<SchemaRef, BindError> {
        self.lookup(name).ok_or_else(|| self.unresolved(name))
    }

    fn unresolved(&self, type_name: &str) -> BindError {
        warn!(type_name, known = ?self.names(), "unresolved schema type");
        BindError::UnresolvedType {
            name: type_name.to_string(),
        }
    }

    /// Classify a declared type name.
    ///
    /// `Name[]` declares a list of `Name` objects.
    pub fn resolve(&self, type_name: &str) -> Result<FieldType, BindError> {
        if let Some(kind) = ScalarKind::from_type_name(type_name) {
            return Ok(FieldType::Scalar(kind));
        }

        let trimmed = type_name.trim().trim_start_matches('?');
        let (element, is_list) = match trimmed.strip_suffix("[]") {
            Some(element) => (element, true),
            None => (trimmed, false),
        };

        let target = self
            .lookup(element)
            .ok_or_else(|| self.unresolved(type_name))?;

        Ok(if is_list {
            FieldType::ListOf(target)
        } else {
            FieldType::Nested(target)
        })
    }

    /// Descriptor of the schema known under `name`
    pub fn resolve_schema(&self, name: &str) -> Result<Arc<SchemaDescriptor>, BindError> {
        self.target(name)?.descriptor()
    }

    /// Names of every known schema, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.values().map(SchemaRef::name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
