//! Graph vertices.
//!
//! A vertex is created once, during ingestion or synthesis, from an AST label
//! and a property bag. Structural metadata (child position, line, defining
//! type) is lifted into typed fields; lookups that must ignore case read the
//! lowercase copies computed here instead of folding on every query.

use crate::kind::VertexKind;
use crate::property::{keys, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identity of a vertex, preserved when a vertex is copied into a
/// just-in-time subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u64);

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed node in the program graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub kind: VertexKind,
    /// The label as it appeared in the AST. Equal to `kind.as_str()` unless
    /// the kind is `Unknown`.
    pub label: String,
    /// Position among the parent's children.
    pub child_index: usize,
    pub first_child: bool,
    pub last_child: bool,
    pub line: u32,
    /// True for vertices ingested from library (standard) code.
    pub is_standard: bool,
    properties: BTreeMap<String, PropertyValue>,
    folded: BTreeMap<String, String>,
}

impl Vertex {
    /// Builds a vertex from an AST label and its property bag.
    pub fn new(id: VertexId, label: &str, properties: BTreeMap<String, PropertyValue>) -> Self {
        let line = properties
            .get(keys::BEGIN_LINE)
            .and_then(PropertyValue::as_int)
            .unwrap_or(0)
            .max(0) as u32;
        let mut vertex = Self {
            id,
            kind: VertexKind::from_label(label),
            label: label.to_string(),
            child_index: 0,
            first_child: false,
            last_child: false,
            line,
            is_standard: false,
            properties,
            folded: BTreeMap::new(),
        };
        vertex.refold();
        vertex
    }

    fn refold(&mut self) {
        self.folded = keys::CASE_INSENSITIVE
            .iter()
            .filter_map(|key| {
                self.properties
                    .get(*key)
                    .and_then(PropertyValue::as_str)
                    .map(|value| (key.to_string(), value.to_lowercase()))
            })
            .collect();
    }

    /// Reads a property, including the typed structural fields.
    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        match key {
            keys::CHILD_INDEX => Some(PropertyValue::Int(self.child_index as i64)),
            keys::FIRST_CHILD => Some(PropertyValue::Bool(self.first_child)),
            keys::LAST_CHILD => Some(PropertyValue::Bool(self.last_child)),
            keys::IS_STANDARD => Some(PropertyValue::Bool(self.is_standard)),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// Writes an annotation property. Case-folded copies are refreshed.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) {
        self.properties.insert(key.to_string(), value);
        if keys::CASE_INSENSITIVE.contains(&key) {
            self.refold();
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_str)
    }

    /// Lowercase form of a string property. Declared case-insensitive keys
    /// use the copy computed at construction.
    pub fn folded_property(&self, key: &str) -> Option<String> {
        match self.folded.get(key) {
            Some(folded) => Some(folded.clone()),
            None => self.str_property(key).map(str::to_lowercase),
        }
    }

    pub fn bool_property(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    pub fn int_property(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(PropertyValue::as_int)
    }

    pub fn list_property(&self, key: &str) -> &[String] {
        self.properties
            .get(key)
            .and_then(PropertyValue::as_list)
            .unwrap_or(&[])
    }

    pub fn name(&self) -> Option<&str> {
        self.str_property(keys::NAME)
    }

    /// Lowercase name, for case-insensitive comparisons.
    pub fn name_ci(&self) -> Option<&str> {
        self.folded.get(keys::NAME).map(String::as_str)
    }

    pub fn defining_type(&self) -> Option<&str> {
        self.str_property(keys::DEFINING_TYPE)
    }

    pub fn defining_type_ci(&self) -> Option<&str> {
        self.folded.get(keys::DEFINING_TYPE).map(String::as_str)
    }

    pub fn is_static(&self) -> bool {
        self.bool_property(keys::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.bool_property(keys::CONSTRUCTOR)
    }

    pub fn arity(&self) -> Option<usize> {
        self.int_property(keys::ARITY).map(|a| a.max(0) as usize)
    }

    /// Scope labels this statement exits, innermost first.
    pub fn end_scopes(&self) -> &[String] {
        self.list_property(keys::END_SCOPES)
    }
}
