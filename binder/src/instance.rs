//! Bound instances
//!
//! Every object produced by one bind call lives in a caller-owned
//! [`InstanceGraph`]. Nested objects and list elements are further nodes of the
//! same graph; a node refers to its parent by [`NodeId`], never by ownership, so
//! dropping the graph drops the whole tree at once.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{BindError, ErrorReport};
use crate::schema::SchemaDescriptor;

/// Index of a node in its [`InstanceGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Final value of a bound field
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Scalar(Value),
    Object(NodeId),
    List(Vec<NodeId>),
}

#[derive(Debug)]
struct Node {
    schema: Arc<SchemaDescriptor>,
    raw: Map<String, Value>,
    parent: Option<NodeId>,
    fields: Vec<(String, BoundValue)>,
}

/// Arena holding every object bound by one call
#[derive(Debug, Default)]
pub struct InstanceGraph {
    nodes: Vec<Node>,
}

impl InstanceGraph {
    pub fn new() -> Self {
        Self { nodes: vec![] }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn instance(&self, id: NodeId) -> Option<BoundInstance<'_>> {
        (id.0 < self.nodes.len()).then_some(BoundInstance { graph: self, id })
    }

    pub(crate) fn push(
        &mut self,
        schema: Arc<SchemaDescriptor>,
        raw: Map<String, Value>,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.nodes.push(Node {
            schema,
            raw,
            parent,
            fields: vec![],
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Set a field of `id`, replacing an earlier assignment
    pub(crate) fn assign(&mut self, id: NodeId, field: &str, value: BoundValue) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        match node.fields.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => node.fields.push((field.to_string(), value)),
        }
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node created after `checkpoint`
    pub(crate) fn rollback(&mut self, checkpoint: usize) {
        self.nodes.truncate(checkpoint);
    }

    /// Number of ancestors of `id`; zero for a root or an unknown id
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(id.0).and_then(|node| node.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes.get(parent.0).and_then(|node| node.parent);
        }
        depth
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// Read-only handle to one bound object
#[derive(Clone, Copy)]
pub struct BoundInstance<'g> {
    graph: &'g InstanceGraph,
    id: NodeId,
}

impl<'g> BoundInstance<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn schema(&self) -> &'g Arc<SchemaDescriptor> {
        &self.graph.node(self.id).schema
    }

    pub fn schema_name(&self) -> &'g str {
        self.graph.node(self.id).schema.name()
    }

    /// The payload this object was bound from, before any sanitizer ran
    pub fn raw(&self) -> &'g Map<String, Value> {
        &self.graph.node(self.id).raw
    }

    pub fn raw_value(&self, key: &str) -> Option<&'g Value> {
        self.raw().get(key)
    }

    /// The object this one was bound under, if any
    pub fn parent(&self) -> Option<BoundInstance<'g>> {
        self.graph
            .node(self.id)
            .parent
            .and_then(|id| self.graph.instance(id))
    }

    pub fn get(&self, field: &str) -> Option<&'g BoundValue> {
        self.graph
            .node(self.id)
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Sanitized scalar value of `field`
    pub fn value(&self, field: &str) -> Option<&'g Value> {
        match self.get(field) {
            Some(BoundValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    pub fn object(&self, field: &str) -> Option<BoundInstance<'g>> {
        match self.get(field) {
            Some(BoundValue::Object(id)) => self.graph.instance(*id),
            _ => None,
        }
    }

    /// Elements of a list-of-objects field; empty for any other field
    pub fn list(&self, field: &str) -> Vec<BoundInstance<'g>> {
        match self.get(field) {
            Some(BoundValue::List(ids)) => ids
                .iter()
                .filter_map(|id| self.graph.instance(*id))
                .collect(),
            _ => vec![],
        }
    }

    /// Names of the fields bound so far, in binding order
    pub fn fields(&self) -> impl Iterator<Item = &'g str> {
        self.graph
            .node(self.id)
            .fields
            .iter()
            .map(|(name, _)| name.as_str())
    }

    /// Plain projection of the bound values. Raw payloads and parent links are
    /// not part of it.
    pub fn to_value(&self) -> Value {
        let fields = &self.graph.node(self.id).fields;
        Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), self.project(value)))
                .collect(),
        )
    }

    fn project(&self, value: &BoundValue) -> Value {
        match value {
            BoundValue::Scalar(value) => value.clone(),
            BoundValue::Object(id) => self
                .graph
                .instance(*id)
                .map(|child| child.to_value())
                .unwrap_or(Value::Null),
            BoundValue::List(ids) => Value::Array(
                ids.iter()
                    .filter_map(|id| self.graph.instance(*id))
                    .map(|child| child.to_value())
                    .collect(),
            ),
        }
    }
}

impl fmt::Debug for BoundInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInstance")
            .field("schema", &self.schema_name())
            .field("id", &self.id)
            .field("parent", &self.graph.node(self.id).parent)
            .field("values", &self.to_value())
            .finish()
    }
}

/// Result of a successful bind: the graph, its root and, when validation was
/// ignored, the errors that were recorded but not raised
#[derive(Debug)]
pub struct Bound {
    graph: InstanceGraph,
    root: NodeId,
    suppressed: ErrorReport,
    hidden: Vec<String>,
}

impl Bound {
    pub(crate) fn new(graph: InstanceGraph, root: NodeId, suppressed: ErrorReport) -> Self {
        Self {
            graph,
            root,
            suppressed,
            hidden: vec![],
        }
    }

    pub fn root(&self) -> BoundInstance<'_> {
        BoundInstance {
            graph: &self.graph,
            id: self.root,
        }
    }

    pub fn graph(&self) -> &InstanceGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut InstanceGraph {
        &mut self.graph
    }

    pub fn instance(&self, id: NodeId) -> Option<BoundInstance<'_>> {
        self.graph.instance(id)
    }

    /// Shortcut for `root().value(field)`
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.root().value(field)
    }

    /// Shortcut for `root().raw()`
    pub fn raw(&self) -> &Map<String, Value> {
        self.root().raw()
    }

    /// Errors recorded while validation was ignored
    pub fn suppressed(&self) -> &ErrorReport {
        &self.suppressed
    }

    pub(crate) fn suppressed_mut(&mut self) -> &mut ErrorReport {
        &mut self.suppressed
    }

    /// Hide top-level fields from [`Bound::to_value`] and [`Bound::deserialize`]
    pub fn without(mut self, fields: &[&str]) -> Self {
        self.hidden.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn to_value(&self) -> Value {
        let mut value = self.root().to_value();
        if let Value::Object(map) = &mut value {
            for field in &self.hidden {
                map.remove(field);
            }
        }
        value
    }

    /// Convert the projection into a typed struct
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        Ok(serde_json::from_value(self.to_value())?)
    }
}

/// What a custom directive can see while it runs
pub struct DirectiveContext<'a> {
    graph: &'a InstanceGraph,
    current: NodeId,
    field: &'a str,
}

impl<'a> DirectiveContext<'a> {
    pub(crate) fn new(graph: &'a InstanceGraph, current: NodeId, field: &'a str) -> Self {
        Self {
            graph,
            current,
            field,
        }
    }

    /// Field the directive is attached to
    pub fn field(&self) -> &'a str {
        self.field
    }

    /// The object being bound; only fields declared before this one are set
    pub fn instance(&self) -> BoundInstance<'a> {
        BoundInstance {
            graph: self.graph,
            id: self.current,
        }
    }

    pub fn schema_name(&self) -> &'a str {
        self.instance().schema_name()
    }

    /// Raw payload of the object being bound
    pub fn raw(&self) -> &'a Map<String, Value> {
        self.instance().raw()
    }

    pub fn raw_value(&self, key: &str) -> Option<&'a Value> {
        self.instance().raw_value(key)
    }

    pub fn parent(&self) -> Option<BoundInstance<'a>> {
        self.instance().parent()
    }
}
