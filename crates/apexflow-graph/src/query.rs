//! Vertex queries.
//!
//! A query selects vertices by label set and a conjunction of property
//! predicates. String comparisons marked case-insensitive read the folded
//! copies stored on each vertex.

use crate::graph::ProgramGraph;
use apexflow_core::{PropertyValue, Vertex, VertexId, VertexKind};

/// A single property predicate.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Exact equality.
    Eq(String, PropertyValue),
    /// Case-insensitive string equality.
    EqIgnoreCase(String, String),
    /// Case-insensitive match against any of the values.
    OneOf(String, Vec<String>),
    /// Case-insensitive suffix match.
    EndsWith(String, String),
    /// A list property contains the value, ignoring case.
    Contains(String, String),
    /// The property is present.
    Has(String),
}

impl Predicate {
    fn matches(&self, vertex: &Vertex) -> bool {
        match self {
            Predicate::Eq(key, value) => vertex.property(key).as_ref() == Some(value),
            Predicate::EqIgnoreCase(key, value) => vertex
                .folded_property(key)
                .map(|folded| folded == value.to_lowercase())
                .unwrap_or(false),
            Predicate::OneOf(key, values) => vertex
                .folded_property(key)
                .map(|folded| values.iter().any(|v| v.to_lowercase() == folded))
                .unwrap_or(false),
            Predicate::EndsWith(key, suffix) => vertex
                .folded_property(key)
                .map(|folded| folded.ends_with(&suffix.to_lowercase()))
                .unwrap_or(false),
            Predicate::Contains(key, value) => {
                let value = value.to_lowercase();
                vertex
                    .list_property(key)
                    .iter()
                    .any(|item| item.to_lowercase() == value)
            }
            Predicate::Has(key) => vertex.property(key).is_some(),
        }
    }
}

/// Builder for vertex queries.
#[derive(Debug, Clone, Default)]
pub struct VertexQuery {
    kinds: Vec<VertexKind>,
    predicates: Vec<Predicate>,
    include_standard: bool,
}

impl VertexQuery {
    /// Matches vertices of any of the given kinds.
    pub fn kinds(kinds: &[VertexKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            predicates: Vec::new(),
            include_standard: true,
        }
    }

    pub fn kind(kind: VertexKind) -> Self {
        Self::kinds(&[kind])
    }

    pub fn eq(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.predicates
            .push(Predicate::Eq(key.to_string(), value.into()));
        self
    }

    pub fn eq_ignore_case(mut self, key: &str, value: &str) -> Self {
        self.predicates
            .push(Predicate::EqIgnoreCase(key.to_string(), value.to_string()));
        self
    }

    pub fn one_of(mut self, key: &str, values: &[&str]) -> Self {
        self.predicates.push(Predicate::OneOf(
            key.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn ends_with(mut self, key: &str, suffix: &str) -> Self {
        self.predicates
            .push(Predicate::EndsWith(key.to_string(), suffix.to_string()));
        self
    }

    pub fn contains(mut self, key: &str, value: &str) -> Self {
        self.predicates
            .push(Predicate::Contains(key.to_string(), value.to_string()));
        self
    }

    pub fn has(mut self, key: &str) -> Self {
        self.predicates.push(Predicate::Has(key.to_string()));
        self
    }

    /// Excludes vertices ingested from library code.
    pub fn user_only(mut self) -> Self {
        self.include_standard = false;
        self
    }

    /// True if the vertex satisfies every part of the query.
    pub fn matches(&self, vertex: &Vertex) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&vertex.kind))
            && (self.include_standard || !vertex.is_standard)
            && self.predicates.iter().all(|p| p.matches(vertex))
    }
}

impl ProgramGraph {
    /// Runs a query. Results are ordered by vertex id.
    pub fn query(&self, query: &VertexQuery) -> Vec<VertexId> {
        let mut found: Vec<VertexId> = if query.kinds.is_empty() {
            self.vertices()
                .filter(|v| query.matches(v))
                .map(|v| v.id)
                .collect()
        } else {
            query
                .kinds
                .iter()
                .flat_map(|kind| self.vertices_of_kind(*kind).iter().copied())
                .filter(|id| self.vertex(*id).map(|v| query.matches(v)).unwrap_or(false))
                .collect()
        };
        found.sort();
        found.dedup();
        found
    }

    /// Convenience: the first match, if any.
    pub fn query_one(&self, query: &VertexQuery) -> Option<VertexId> {
        self.query(query).into_iter().next()
    }
}
