//! The binding pipeline
//!
//! For every field, in declaration order, the binder reads the raw value, checks
//! its declared scalar type, folds the field's directives over it, coerces the
//! result and assigns it. Nested objects and list elements are bound
//! recursively into the same [`InstanceGraph`]. Errors are collected for the
//! whole call and raised once at the end.

use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::config::BinderConfig;
use crate::directives::{builtin_sanitizer, builtin_validator, Composition};
use crate::errors::{BindError, ErrorReport, ValidationError};
use crate::instance::{Bound, BoundValue, DirectiveContext, InstanceGraph, NodeId};
use crate::schema::{
    describe, DirectiveCategory, DirectiveSpec, FieldDescriptor, FieldType, Schema,
    SchemaDescriptor,
};
use crate::types::ScalarKind;

/// Recorded for a list element that is not an object
pub const LIST_ELEMENT_MESSAGE: &str = "The field must be of type list";

/// Reported under `body` when the payload itself is not an object
pub const PAYLOAD_MESSAGE: &str = "payload must be an object";

pub fn type_mismatch_message(field: &str, type_name: &str) -> String {
    format!("The parameter '{}' must be of type {}", field, type_name)
}

static DEFAULT_BINDER: Lazy<Binder> = Lazy::new(Binder::from_env);

/// Bind `raw` against `T` with the environment-configured binder
pub fn bind<T: Schema>(raw: &Map<String, Value>, ignore_validation: bool) -> Result<Bound, BindError> {
    DEFAULT_BINDER.bind::<T>(raw, ignore_validation)
}

/// Bind and validate `raw` against `T`, then deserialize the result into `T`
pub fn bind_as<T: Schema + DeserializeOwned>(raw: &Value) -> Result<T, BindError> {
    DEFAULT_BINDER.bind_value::<T>(raw, false)?.deserialize()
}

/// Working value of a field while its directives run
enum Working {
    Value(Value),
    /// Elements bound by a list composition
    Objects(Vec<NodeId>),
}

impl Working {
    fn view(&self, graph: &InstanceGraph) -> Cow<'_, Value> {
        match self {
            Working::Value(value) => Cow::Borrowed(value),
            Working::Objects(ids) => Cow::Owned(project(graph, ids)),
        }
    }

    fn into_value(self, graph: &InstanceGraph) -> Value {
        match self {
            Working::Value(value) => value,
            Working::Objects(ids) => project(graph, &ids),
        }
    }
}

fn project(graph: &InstanceGraph, ids: &[NodeId]) -> Value {
    Value::Array(
        ids.iter()
            .filter_map(|id| graph.instance(*id))
            .map(|instance| instance.to_value())
            .collect(),
    )
}

/// Where one field is being bound
struct Site<'s> {
    schema: &'s SchemaDescriptor,
    node: NodeId,
    field: &'s FieldDescriptor,
    depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Binder {
    config: BinderConfig,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BinderConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::with_config(BinderConfig::from_env())
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Bind `raw` against `T`.
    ///
    /// With `ignore_validation` validators are skipped and recorded errors are
    /// returned through [`Bound::suppressed`] instead of being raised.
    /// Configuration defects are raised either way.
    pub fn bind<T: Schema>(
        &self,
        raw: &Map<String, Value>,
        ignore_validation: bool,
    ) -> Result<Bound, BindError> {
        self.bind_descriptor(describe::<T>()?, raw, ignore_validation)
    }

    /// Like [`Binder::bind`] for an arbitrary JSON payload. `null` binds as an
    /// empty object. Any other non-object records [`PAYLOAD_MESSAGE`] under
    /// `body`: raised as a validation error, or with `ignore_validation` an
    /// empty instance is returned carrying the message in
    /// [`Bound::suppressed`].
    pub fn bind_value<T: Schema>(
        &self,
        raw: &Value,
        ignore_validation: bool,
    ) -> Result<Bound, BindError> {
        match raw {
            Value::Object(map) => self.bind::<T>(map, ignore_validation),
            Value::Null => self.bind::<T>(&Map::new(), ignore_validation),
            _ if ignore_validation => {
                debug!(schema = T::schema_name(), "payload is not an object");
                let mut bound = self.bind::<T>(&Map::new(), true)?;
                bound.suppressed_mut().push_message("body", PAYLOAD_MESSAGE);
                Ok(bound)
            }
            _ => Err(ValidationError::single("body", PAYLOAD_MESSAGE).into()),
        }
    }

    pub fn bind_descriptor(
        &self,
        schema: Arc<SchemaDescriptor>,
        raw: &Map<String, Value>,
        ignore_validation: bool,
    ) -> Result<Bound, BindError> {
        let mut graph = InstanceGraph::new();
        let name = schema.name().to_string();
        let (root, report) =
            self.bind_object(&mut graph, schema, raw, None, ignore_validation, 0)?;

        if !report.is_empty() {
            debug!(
                schema = %name,
                fields = report.len(),
                ignore_validation,
                "bind recorded validation errors"
            );
            if !ignore_validation {
                return Err(ValidationError::new(report).into());
            }
        }

        Ok(Bound::new(graph, root, report))
    }

    /// Bind `raw` against `T` as a new object of an existing graph whose parent
    /// is `parent`. Nothing is added to the graph when binding fails. The new
    /// object sits one level below `parent` for the depth limit.
    pub fn bind_under<T: Schema>(
        &self,
        bound: &mut Bound,
        parent: NodeId,
        raw: &Map<String, Value>,
        ignore_validation: bool,
    ) -> Result<NodeId, BindError> {
        let schema = describe::<T>()?;
        let graph = bound.graph_mut();
        let checkpoint = graph.checkpoint();
        let depth = graph.depth(parent) + 1;

        let (node, report) =
            match self.bind_object(graph, schema, raw, Some(parent), ignore_validation, depth) {
                Ok(bound_object) => bound_object,
                Err(err) => {
                    graph.rollback(checkpoint);
                    return Err(err);
                }
            };

        if !report.is_empty() {
            debug!(
                schema = T::schema_name(),
                fields = report.len(),
                ignore_validation,
                "bind recorded validation errors"
            );
            if !ignore_validation {
                graph.rollback(checkpoint);
                return Err(ValidationError::new(report).into());
            }
            bound.suppressed_mut().merge(report);
        }

        Ok(node)
    }

    fn bind_object(
        &self,
        graph: &mut InstanceGraph,
        schema: Arc<SchemaDescriptor>,
        raw: &Map<String, Value>,
        parent: Option<NodeId>,
        ignore_validation: bool,
        depth: usize,
    ) -> Result<(NodeId, ErrorReport), BindError> {
        if depth > self.config.max_depth {
            warn!(schema = schema.name(), limit = self.config.max_depth, "nesting too deep");
            return Err(BindError::DepthExceeded {
                schema: schema.name().to_string(),
                limit: self.config.max_depth,
            });
        }

        let node = graph.push(Arc::clone(&schema), raw.clone(), parent);
        let mut report = ErrorReport::new();

        for field in schema.fields() {
            let site = Site {
                schema: &schema,
                node,
                field,
                depth,
            };
            let value = self.bind_field(graph, &site, raw, ignore_validation, &mut report)?;
            graph.assign(node, &field.name, value);
        }

        Ok((node, report))
    }

    fn bind_field(
        &self,
        graph: &mut InstanceGraph,
        site: &Site<'_>,
        raw: &Map<String, Value>,
        ignore_validation: bool,
        report: &mut ErrorReport,
    ) -> Result<BoundValue, BindError> {
        let field = site.field;
        let raw_value = raw.get(&field.name).cloned().unwrap_or(Value::Null);

        // Recorded even when validation is ignored
        match &field.field_type {
            FieldType::Scalar(kind) if !kind.matches(&raw_value) => {
                report.push_message(
                    &field.name,
                    type_mismatch_message(&field.name, kind.display_name()),
                );
            }
            FieldType::ListOf(_) if !(raw_value.is_null() || raw_value.is_array()) => {
                report.push_message(
                    &field.name,
                    type_mismatch_message(&field.name, &field.field_type.display_name()),
                );
            }
            _ => {}
        }

        let mut working = Working::Value(raw_value);
        for directive in &field.directives {
            working = self.apply(graph, site, directive, working, ignore_validation, report)?;
        }

        match (&field.field_type, working) {
            (_, Working::Objects(ids)) => Ok(BoundValue::List(ids)),
            (FieldType::Scalar(kind), Working::Value(value)) => {
                Ok(BoundValue::Scalar(coerce(*kind, &field.name, value)))
            }
            (FieldType::Nested(target), Working::Value(value)) => {
                let map = match value {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    _ => {
                        report.push_message(
                            &field.name,
                            type_mismatch_message(&field.name, target.name()),
                        );
                        return Ok(BoundValue::Scalar(Value::Null));
                    }
                };
                self.bind_nested(graph, site, target.descriptor()?, &map, report)
            }
            (FieldType::ListOf(target), Working::Value(Value::Array(items))) => {
                let ids = self.bind_list(graph, site, target.descriptor()?, &items, report)?;
                Ok(BoundValue::List(ids))
            }
            (FieldType::ListOf(_), Working::Value(value)) => Ok(BoundValue::Scalar(value)),
        }
    }

    /// Run one directive against the working value
    fn apply(
        &self,
        graph: &mut InstanceGraph,
        site: &Site<'_>,
        directive: &DirectiveSpec,
        working: Working,
        ignore_validation: bool,
        report: &mut ErrorReport,
    ) -> Result<Working, BindError> {
        let field = &site.field.name;
        let params = &directive.params;
        trace!(
            schema = site.schema.name(),
            field = %field,
            category = %directive.category,
            directive = %directive.name,
            "applying directive"
        );

        match directive.category {
            DirectiveCategory::Validation => {
                let validator = builtin_validator(&directive.name)
                    .ok_or_else(|| missing(site.schema, directive))?;
                if !ignore_validation && !validator(&working.view(graph), params) {
                    report.push_message(
                        field,
                        params.message().unwrap_or_else(|| directive.name.clone()),
                    );
                }
                Ok(working)
            }
            DirectiveCategory::Sanitization => {
                let sanitizer = builtin_sanitizer(&directive.name)
                    .ok_or_else(|| missing(site.schema, directive))?;
                Ok(Working::Value(sanitizer(working.into_value(graph), params)))
            }
            DirectiveCategory::CustomValidation => {
                let validator = site
                    .schema
                    .customs()
                    .validator(&directive.name)
                    .ok_or_else(|| missing(site.schema, directive))?;
                if !ignore_validation {
                    let ctx = DirectiveContext::new(graph, site.node, field);
                    if let Err(message) = validator(&working.view(graph), params, &ctx) {
                        report.push_message(field, message);
                    }
                }
                Ok(working)
            }
            DirectiveCategory::CustomSanitization => {
                let sanitizer = site
                    .schema
                    .customs()
                    .sanitizer(&directive.name)
                    .ok_or_else(|| missing(site.schema, directive))?;
                let value = working.into_value(graph);
                let ctx = DirectiveContext::new(graph, site.node, field);
                Ok(Working::Value(sanitizer(value, params, &ctx)))
            }
            DirectiveCategory::Composition => match Composition::from_name(&directive.name) {
                Some(Composition::ListOfObjects) => {
                    let class = params.str("class").unwrap_or_default();
                    let target = site.schema.schemas().resolve_schema(class)?;
                    match working.into_value(graph) {
                        Value::Array(items) => {
                            let ids = self.bind_list(graph, site, target, &items, report)?;
                            Ok(Working::Objects(ids))
                        }
                        other => Ok(Working::Value(other)),
                    }
                }
                None => Err(missing(site.schema, directive)),
            },
        }
    }

    /// Bind a nested object under the current one. A failing child is removed
    /// from the graph and its report attached under the field.
    fn bind_nested(
        &self,
        graph: &mut InstanceGraph,
        site: &Site<'_>,
        target: Arc<SchemaDescriptor>,
        raw: &Map<String, Value>,
        report: &mut ErrorReport,
    ) -> Result<BoundValue, BindError> {
        let checkpoint = graph.checkpoint();
        let (child, child_report) =
            self.bind_object(graph, target, raw, Some(site.node), false, site.depth + 1)?;

        if child_report.is_empty() {
            Ok(BoundValue::Object(child))
        } else {
            graph.rollback(checkpoint);
            report.attach_nested(&site.field.name, child_report);
            Ok(BoundValue::Scalar(Value::Null))
        }
    }

    /// Bind every element; failing elements are reported by index and left out
    fn bind_list(
        &self,
        graph: &mut InstanceGraph,
        site: &Site<'_>,
        target: Arc<SchemaDescriptor>,
        items: &[Value],
        report: &mut ErrorReport,
    ) -> Result<Vec<NodeId>, BindError> {
        let field = &site.field.name;
        let mut ids = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let Value::Object(map) = item else {
                let mut element = ErrorReport::new();
                element.push_message(field, LIST_ELEMENT_MESSAGE);
                report.attach_item(field, index, element);
                continue;
            };

            let checkpoint = graph.checkpoint();
            let (child, child_report) = self.bind_object(
                graph,
                Arc::clone(&target),
                map,
                Some(site.node),
                false,
                site.depth + 1,
            )?;

            if child_report.is_empty() {
                ids.push(child);
            } else {
                graph.rollback(checkpoint);
                report.attach_item(field, index, child_report);
            }
        }

        Ok(ids)
    }
}

fn missing(schema: &SchemaDescriptor, directive: &DirectiveSpec) -> BindError {
    warn!(
        schema = schema.name(),
        category = %directive.category,
        directive = %directive.name,
        "directive not found"
    );
    BindError::DirectiveNotFound {
        schema: schema.name().to_string(),
        category: directive.category,
        name: directive.name.clone(),
    }
}

/// Best-effort conversion to the declared kind; the value is kept as is when
/// no conversion exists
fn coerce(kind: ScalarKind, field: &str, value: Value) -> Value {
    if value.is_null() {
        return value;
    }
    match kind.coerce(&value) {
        Some(coerced) => coerced,
        None => {
            trace!(field, kind = %kind, "coercion skipped");
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Params, SchemaBuilder};
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    struct Credentials;

    impl Schema for Credentials {
        fn schema_name() -> &'static str {
            "BinderTestCredentials"
        }

        fn declare(schema: &mut SchemaBuilder) {
            schema
                .field("login")
                .typed("?string")
                .annotate(r#"@Sanitization\Trim() @Validation\NotEmpty(msg="login is required")"#);
            schema
                .field("age")
                .typed("int")
                .validate("interval", Params::new().with("min", 18).with("msg", "too young"));
        }
    }

    #[test]
    fn test_bind_sanitizes_and_coerces() {
        let bound = Binder::new()
            .bind::<Credentials>(&payload(json!({"login": "  ana  ", "age": 30})), false)
            .unwrap();

        assert_eq!(bound.value("login"), Some(&json!("ana")));
        assert_eq!(bound.value("age"), Some(&json!(30)));
        assert_eq!(bound.raw().get("login"), Some(&json!("  ana  ")));
        assert!(bound.suppressed().is_empty());
    }

    #[test]
    fn test_type_mismatch_is_recorded_before_directives() {
        let err = Binder::new()
            .bind::<Credentials>(&payload(json!({"login": "ana", "age": "12"})), false)
            .unwrap_err();
        let report = err.validation().unwrap().report();

        assert_eq!(
            report.messages("age"),
            [
                "The parameter 'age' must be of type int".to_string(),
                "too young".to_string()
            ]
        );
    }

    #[test]
    fn test_ignore_validation_still_reports_type_mismatch() {
        let bound = Binder::new()
            .bind::<Credentials>(&payload(json!({"login": "", "age": "12"})), true)
            .unwrap();

        assert_eq!(bound.value("age"), Some(&json!(12)));
        assert_eq!(
            bound.suppressed().messages("age"),
            ["The parameter 'age' must be of type int".to_string()]
        );
        assert!(!bound.suppressed().contains("login"));
    }

    #[test]
    fn test_non_object_payload() {
        let err = Binder::new()
            .bind_value::<Credentials>(&json!([1, 2]), false)
            .unwrap_err();
        assert_eq!(
            err.validation().unwrap().report().messages("body"),
            [PAYLOAD_MESSAGE.to_string()]
        );
    }

    #[test]
    fn test_non_object_payload_is_suppressed_when_ignoring() {
        let bound = Binder::new()
            .bind_value::<Credentials>(&json!("login=ana"), true)
            .unwrap();

        assert_eq!(
            bound.suppressed().messages("body"),
            [PAYLOAD_MESSAGE.to_string()]
        );
        assert_eq!(bound.value("login"), Some(&Value::Null));
        assert!(bound.raw().is_empty());
    }

    #[test]
    fn test_bind_under_counts_parent_depth() {
        let binder = Binder::with_config(BinderConfig::default().with_max_depth(2));
        let raw = payload(json!({"login": "ana", "age": 30}));
        let mut bound = binder.bind::<Credentials>(&raw, false).unwrap();
        let root = bound.root().id();

        let first = binder
            .bind_under::<Credentials>(&mut bound, root, &raw, false)
            .unwrap();
        let second = binder
            .bind_under::<Credentials>(&mut bound, first, &raw, false)
            .unwrap();
        assert_eq!(bound.graph().depth(second), 2);

        let nodes = bound.graph().len();
        let err = binder
            .bind_under::<Credentials>(&mut bound, second, &raw, false)
            .unwrap_err();
        assert!(matches!(err, BindError::DepthExceeded { limit: 2, .. }));
        assert_eq!(bound.graph().len(), nodes);
    }

    #[test]
    fn test_unknown_builtin_is_fatal() {
        let mut builder = SchemaBuilder::new("BinderTestBroken");
        builder.field("name").validate("isPalindrome", Params::new());
        let schema = Arc::new(builder.build().unwrap());

        let err = Binder::new()
            .bind_descriptor(schema, &Map::new(), true)
            .unwrap_err();
        assert!(matches!(
            err,
            BindError::DirectiveNotFound { ref name, category: DirectiveCategory::Validation, .. } if name == "isPalindrome"
        ));
    }

    #[test]
    fn test_coerce_keeps_unconvertible_values() {
        assert_eq!(coerce(ScalarKind::Integer, "n", json!("abc")), json!("abc"));
        assert_eq!(coerce(ScalarKind::Integer, "n", json!("7")), json!(7));
        assert_eq!(coerce(ScalarKind::String, "n", Value::Null), Value::Null);
    }
}
