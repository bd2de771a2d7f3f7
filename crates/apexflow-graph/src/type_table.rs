use crate::graph::ProgramGraph;
use apexflow_core::{VertexId, VertexKind};
use std::collections::HashMap;

/// Lookup table for user type declarations.
///
/// Maps lowercase fully qualified names (e.g. "outer.inner") to vertex ids.
/// Library types are not registered; names that do not resolve here refer to
/// types outside the scanned source.
#[derive(Debug, Default, Clone)]
pub struct TypeTable {
    /// Map of lowercase FQN to vertex id
    by_name: HashMap<String, VertexId>,

    /// Map of vertex id to its FQN as declared
    by_id: HashMap<VertexId, String>,
}

impl TypeTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every non-library class, interface and enum in the graph.
    pub fn from_graph(graph: &ProgramGraph) -> Self {
        let mut table = Self::new();
        for kind in [VertexKind::UserClass, VertexKind::UserInterface, VertexKind::UserEnum] {
            for id in graph.vertices_of_kind(kind) {
                let Some(vertex) = graph.vertex(*id) else {
                    continue;
                };
                if vertex.is_standard {
                    continue;
                }
                if let Some(name) = vertex.defining_type() {
                    table.insert(name.to_string(), *id);
                }
            }
        }
        table
    }

    pub fn insert(&mut self, fqn: String, id: VertexId) {
        self.by_name.insert(fqn.to_lowercase(), id);
        self.by_id.insert(id, fqn);
    }

    /// Resolves a fully qualified name, ignoring case.
    pub fn resolve(&self, fqn: &str) -> Option<VertexId> {
        self.by_name.get(&fqn.to_lowercase()).copied()
    }

    /// The declared FQN of a registered type.
    pub fn name_of(&self, id: VertexId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Resolves a type name as seen from `referencing`.
    ///
    /// An unqualified name is tried first as an inner type of the same outer
    /// type, then as a top-level type.
    pub fn resolve_from(&self, referencing: VertexId, name: &str) -> Option<VertexId> {
        if !name.contains('.') {
            if let Some(own) = self.name_of(referencing) {
                let outer = own.split('.').next().unwrap_or(own);
                if let Some(found) = self.resolve(&format!("{}.{}", outer, name)) {
                    return Some(found);
                }
            }
        }
        self.resolve(name)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_resolve() {
        let mut table = TypeTable::new();
        table.insert("Outer".to_string(), VertexId(1));
        table.insert("Outer.Base".to_string(), VertexId(2));
        table.insert("Base".to_string(), VertexId(3));

        assert_eq!(table.resolve("outer"), Some(VertexId(1)));
        assert_eq!(table.resolve("Missing"), None);
        assert_eq!(table.name_of(VertexId(2)), Some("Outer.Base"));
    }

    #[test]
    fn test_inner_type_takes_precedence() {
        let mut table = TypeTable::new();
        table.insert("Outer".to_string(), VertexId(1));
        table.insert("Outer.Base".to_string(), VertexId(2));
        table.insert("Outer.Child".to_string(), VertexId(3));
        table.insert("Base".to_string(), VertexId(4));
        table.insert("Other".to_string(), VertexId(5));

        assert_eq!(table.resolve_from(VertexId(3), "Base"), Some(VertexId(2)));
        assert_eq!(table.resolve_from(VertexId(1), "Base"), Some(VertexId(2)));
        assert_eq!(table.resolve_from(VertexId(5), "Base"), Some(VertexId(4)));
        assert_eq!(table.resolve_from(VertexId(5), "Outer.Base"), Some(VertexId(2)));
    }
}
