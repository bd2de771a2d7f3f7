//! Visitor traits driven by the walker.
//!
//! A walk drives two visitors side by side. The symbol provider tracks
//! scopes and symbols; the path vertex visitor is where rules run. Each one
//! decides for itself whether to descend into a vertex's children.

use crate::path::{ApexPath, PathVertex};
use crate::scope::ClassStaticScope;
use crate::walker::StaticScopes;
use apexflow_core::{Vertex, VertexId, VertexKind};

pub trait SymbolProviderVisitor {
    /// Returns whether to descend into the vertex's children. `scopes` looks
    /// up a class's static scope, initializing it first if needed; the
    /// visitor passes itself in so that it sees the initialization walk.
    fn visit(&mut self, _vertex: &Vertex, _scopes: &mut StaticScopes<'_, '_>) -> bool {
        true
    }

    fn after_visit(&mut self, _vertex: &Vertex) {}

    /// Returns true if a scope was pushed for this vertex. The walker pops it
    /// after the vertex is done.
    fn push_scope(&mut self, _vertex: &Vertex) -> bool {
        false
    }

    fn pop_scope(&mut self, _vertex: &Vertex) {}

    fn before_method_call(&mut self, _invocation: &Vertex, _method: VertexId) {}

    fn after_method_call(&mut self, _invocation: &Vertex, _method: VertexId) {}

    /// Brackets a call whose receiver is not known, such as the constructor
    /// run before an instance method.
    fn push_indeterminate_scope(&mut self) {}

    fn pop_indeterminate_scope(&mut self) {}

    /// Called on every state change of a class's static scope.
    fn static_scope_changed(&mut self, _scope: &ClassStaticScope) {}
}

pub trait PathVertexVisitor {
    /// Returns whether to descend into the vertex's children.
    fn visit(&mut self, _at: &PathVertex, _vertex: &Vertex) -> bool {
        true
    }

    fn after_visit(&mut self, _at: &PathVertex, _vertex: &Vertex) {}

    fn before_method_call(&mut self, _at: &PathVertex, _invocation: &Vertex, _path: &ApexPath) {}

    fn after_method_call(&mut self, _at: &PathVertex, _invocation: &Vertex, _path: &ApexPath) {}

    /// `path` owns the call-site; the walk does not descend into it.
    fn recursion_detected(&mut self, _at: &PathVertex, _invocation: &Vertex, _path: &ApexPath) {}
}

#[derive(Debug, Default)]
pub struct NoopSymbolProvider;

impl SymbolProviderVisitor for NoopSymbolProvider {}

#[derive(Debug, Default)]
pub struct NoopPathVisitor;

impl PathVertexVisitor for NoopPathVisitor {}

/// What a visited vertex means to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexCategory {
    Call,
    Dml,
    Throw,
    Return,
    Other,
}

impl VertexCategory {
    pub fn of(kind: VertexKind) -> Self {
        match kind {
            k if k.is_invocable() => VertexCategory::Call,
            k if k.is_dml() => VertexCategory::Dml,
            VertexKind::ThrowStatement => VertexCategory::Throw,
            VertexKind::ReturnStatement => VertexCategory::Return,
            _ => VertexCategory::Other,
        }
    }
}

/// Records everything a walk shows it.
#[derive(Debug, Default)]
pub struct RecordingVisitor {
    pub visited: Vec<PathVertex>,
    pub kinds: Vec<VertexKind>,
    /// (invocation, callee path) on entry to each resolved call.
    pub calls: Vec<(VertexId, crate::path::PathId)>,
    pub returns_from_calls: usize,
    /// Invocations flagged as recursive.
    pub recursions: Vec<VertexId>,
    pub dml_count: usize,
}

impl RecordingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited_vertices(&self) -> Vec<VertexId> {
        self.visited.iter().map(|v| v.vertex).collect()
    }

    pub fn count_of(&self, kind: VertexKind) -> usize {
        self.kinds.iter().filter(|k| **k == kind).count()
    }
}

impl PathVertexVisitor for RecordingVisitor {
    fn visit(&mut self, at: &PathVertex, vertex: &Vertex) -> bool {
        self.visited.push(*at);
        self.kinds.push(vertex.kind);
        if VertexCategory::of(vertex.kind) == VertexCategory::Dml {
            self.dml_count += 1;
        }
        true
    }

    fn before_method_call(&mut self, _at: &PathVertex, invocation: &Vertex, path: &ApexPath) {
        self.calls.push((invocation.id, path.stable_id()));
    }

    fn after_method_call(&mut self, _at: &PathVertex, _invocation: &Vertex, _path: &ApexPath) {
        self.returns_from_calls += 1;
    }

    fn recursion_detected(&mut self, _at: &PathVertex, invocation: &Vertex, _path: &ApexPath) {
        self.recursions.push(invocation.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(VertexCategory::of(VertexKind::NewObjectExpression), VertexCategory::Call);
        assert_eq!(VertexCategory::of(VertexKind::DmlInsertStatement), VertexCategory::Dml);
        assert_eq!(VertexCategory::of(VertexKind::ThrowStatement), VertexCategory::Throw);
        assert_eq!(VertexCategory::of(VertexKind::ReturnStatement), VertexCategory::Return);
        assert_eq!(VertexCategory::of(VertexKind::LiteralExpression), VertexCategory::Other);
    }
}
