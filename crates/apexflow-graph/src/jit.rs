//! Just-in-time subgraphs.
//!
//! A worker that only needs a handful of classes reads from a reduced graph
//! that is filled on first reference. Importing a class copies the whole file
//! it was declared in, keeping vertex ids, plus every edge of the full graph
//! whose endpoints are both present. Supertypes are imported with it. The
//! full graph is never written.

use crate::edge::EdgeKind;
use crate::graph::ProgramGraph;
use apexflow_core::{Result, VertexId, VertexKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A worker's view of the program graph.
#[derive(Debug)]
pub enum GraphProvider {
    /// Reads the shared full graph directly.
    Full(Arc<ProgramGraph>),
    /// Reads a reduced copy filled on demand.
    JustInTime(JitGraph),
}

impl GraphProvider {
    pub fn full(graph: Arc<ProgramGraph>) -> Self {
        GraphProvider::Full(graph)
    }

    pub fn just_in_time(graph: Arc<ProgramGraph>) -> Self {
        GraphProvider::JustInTime(JitGraph::new(graph))
    }

    /// The graph to read from.
    pub fn graph(&self) -> &ProgramGraph {
        match self {
            GraphProvider::Full(graph) => graph.as_ref(),
            GraphProvider::JustInTime(jit) => &jit.reduced,
        }
    }

    /// Makes a class (and its supertypes) readable. Returns false for
    /// classes that do not exist in the full graph.
    pub fn ensure_class(&mut self, name: &str) -> Result<bool> {
        match self {
            GraphProvider::Full(graph) => Ok(find_type(graph, name).is_some()),
            GraphProvider::JustInTime(jit) => jit.ensure_class(name),
        }
    }

    /// Makes the class that declares `id` readable.
    pub fn ensure_class_of(&mut self, id: VertexId) -> Result<bool> {
        let name = {
            let full = match &*self {
                GraphProvider::Full(graph) => graph.as_ref(),
                GraphProvider::JustInTime(jit) => jit.full.as_ref(),
            };
            full.require(id)?.defining_type().map(str::to_string)
        };
        match name {
            Some(name) => self.ensure_class(&name),
            None => Ok(false),
        }
    }
}

fn find_type(graph: &ProgramGraph, name: &str) -> Option<VertexId> {
    let name = name.to_lowercase();
    [VertexKind::UserClass, VertexKind::UserInterface, VertexKind::UserEnum]
        .iter()
        .flat_map(|kind| graph.vertices_of_kind(*kind).iter().copied())
        .find(|id| {
            graph
                .vertex(*id)
                .and_then(|v| v.defining_type_ci())
                .map(|t| t == name)
                .unwrap_or(false)
        })
}

/// A reduced graph holding only the classes referenced so far.
#[derive(Debug)]
pub struct JitGraph {
    full: Arc<ProgramGraph>,
    reduced: ProgramGraph,
    /// Lowercase FQN to declaration vertex, over the full graph.
    types: HashMap<String, VertexId>,
    loaded: HashSet<String>,
    copied_edges: HashSet<(VertexId, VertexId, EdgeKind)>,
}

impl JitGraph {
    pub fn new(full: Arc<ProgramGraph>) -> Self {
        let mut types = HashMap::new();
        for kind in [VertexKind::UserClass, VertexKind::UserInterface, VertexKind::UserEnum] {
            for id in full.vertices_of_kind(kind) {
                if let Some(name) = full.vertex(*id).and_then(|v| v.defining_type_ci()) {
                    types.entry(name.to_string()).or_insert(*id);
                }
            }
        }
        Self {
            full,
            reduced: ProgramGraph::new(),
            types,
            loaded: HashSet::new(),
            copied_edges: HashSet::new(),
        }
    }

    pub fn reduced(&self) -> &ProgramGraph {
        &self.reduced
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(&name.to_lowercase())
    }

    pub fn ensure_class(&mut self, name: &str) -> Result<bool> {
        let key = name.to_lowercase();
        if self.loaded.contains(&key) {
            return Ok(true);
        }
        let Some(&declaration) = self.types.get(&key) else {
            return Ok(false);
        };

        let root = self.full.root_of(declaration);
        let file = self.full.file_of(root).unwrap_or_default();
        let copied = self.copy_subtree(&file, root);
        self.copy_edges(&copied)?;
        debug!("Imported {} ({} vertices) into reduced graph", name, copied.len());

        let mut supertypes = Vec::new();
        for id in &copied {
            let Some(vertex) = self.full.vertex(*id) else {
                continue;
            };
            if !vertex.kind.is_type_declaration() {
                continue;
            }
            if let Some(declared) = vertex.defining_type_ci() {
                self.loaded.insert(declared.to_string());
            }
            for kind in [EdgeKind::ExtensionOf, EdgeKind::ImplementationOf] {
                supertypes.extend(self.full.out_neighbors(*id, kind));
            }
        }
        for supertype in supertypes {
            let name = self
                .full
                .vertex(supertype)
                .and_then(|v| v.defining_type())
                .map(str::to_string);
            if let Some(name) = name {
                self.ensure_class(&name)?;
            }
        }
        Ok(true)
    }

    fn copy_subtree(&mut self, file: &str, root: VertexId) -> Vec<VertexId> {
        let mut copied = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.reduced.contains(id) {
                continue;
            }
            let Some(vertex) = self.full.vertex(id) else {
                continue;
            };
            self.reduced.insert_vertex(file, vertex.clone());
            copied.push(id);
            stack.extend(self.full.out_neighbors(id, EdgeKind::Child));
        }
        copied
    }

    fn copy_edges(&mut self, copied: &[VertexId]) -> Result<()> {
        for id in copied {
            for (from, to, kind) in self.full.incident_edges(*id) {
                if !self.reduced.contains(from) || !self.reduced.contains(to) {
                    continue;
                }
                if self.copied_edges.insert((from, to, kind)) {
                    self.reduced.add_edge(from, to, kind)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use apexflow_core::{keys, AstNode};

    fn full_graph() -> Arc<ProgramGraph> {
        let mut builder = GraphBuilder::new();
        builder
            .ingest_user_file(
                "Base.cls",
                AstNode::user_class("Base").child(
                    AstNode::method("helper", 0)
                        .child(AstNode::block(vec![AstNode::call_statement("a", vec![])])),
                ),
            )
            .unwrap();
        builder
            .ingest_user_file(
                "Child.cls",
                AstNode::user_class("Child").with(keys::SUPER_CLASS_NAME, "Base"),
            )
            .unwrap();
        builder
            .ingest_user_file("Unrelated.cls", AstNode::user_class("Unrelated"))
            .unwrap();
        Arc::new(builder.finish().graph)
    }

    #[test]
    fn test_import_preserves_ids_and_supertypes() {
        let full = full_graph();
        let mut provider = GraphProvider::just_in_time(full.clone());
        assert_eq!(provider.graph().vertex_count(), 0);

        assert!(provider.ensure_class("child").unwrap());
        let reduced = provider.graph();
        let expected = full.file_vertices("Child.cls").len() + full.file_vertices("Base.cls").len();
        assert_eq!(reduced.vertex_count(), expected);

        for vertex in reduced.vertices() {
            assert_eq!(full.vertex(vertex.id).unwrap().label, vertex.label);
        }
        assert_eq!(
            reduced.edge_count_of(EdgeKind::CfgPath),
            full.edge_count_of(EdgeKind::CfgPath)
        );
        assert_eq!(reduced.edge_count_of(EdgeKind::ExtensionOf), 1);
        assert_eq!(reduced.edge_count_of(EdgeKind::ExtendedBy), 1);
    }

    #[test]
    fn test_unknown_class_is_noop() {
        let mut provider = GraphProvider::just_in_time(full_graph());
        assert!(!provider.ensure_class("Nope").unwrap());
        assert_eq!(provider.graph().vertex_count(), 0);
    }

    #[test]
    fn test_second_import_adds_nothing() {
        let mut provider = GraphProvider::just_in_time(full_graph());
        provider.ensure_class("Base").unwrap();
        let count = provider.graph().edge_count();
        provider.ensure_class("BASE").unwrap();
        assert_eq!(provider.graph().edge_count(), count);
    }

    #[test]
    fn test_full_provider_reads_shared_graph() {
        let full = full_graph();
        let mut provider = GraphProvider::full(full.clone());
        assert!(provider.ensure_class("Unrelated").unwrap());
        assert_eq!(provider.graph().vertex_count(), full.vertex_count());
    }

    #[test]
    fn test_ensure_class_of_loads_declaring_class() {
        let full = full_graph();
        let helper = full
            .vertices_of_kind(VertexKind::Method)
            .iter()
            .copied()
            .find(|m| full.vertex(*m).unwrap().name() == Some("helper"))
            .unwrap();

        let mut jit = GraphProvider::just_in_time(full.clone());
        assert!(jit.ensure_class_of(helper).unwrap());
        assert!(jit.graph().contains(helper));

        let mut shared = GraphProvider::full(full);
        assert!(shared.ensure_class_of(helper).unwrap());
    }
}
