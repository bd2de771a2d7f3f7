//! Graph builder for constructing the program graph from AST trees.
//!
//! The builder works in two passes:
//! 1. Ingest every file: synthesize implicit nodes, emit one vertex per AST
//!    node with tree and sibling edges, and build control flow per method.
//! 2. Resolve inheritance across all ingested files (`finish`).

use crate::cfg::CfgBuilder;
use crate::edge::EdgeKind;
use crate::graph::ProgramGraph;
use crate::hooks::{AccessorAnnotator, FileHook, NoopFileHook};
use crate::inheritance::InheritanceResolver;
use crate::synthesis::synthesize;
use apexflow_core::{keys, AstNode, Diagnostic, GraphError, PropertyValue, Result, VertexId, VertexKind};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The result of a build: the graph plus user-facing diagnostics.
#[derive(Debug)]
pub struct BuildOutput {
    pub graph: ProgramGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds a ProgramGraph from AST trees, one file at a time.
pub struct GraphBuilder {
    graph: ProgramGraph,
    diagnostics: Vec<Diagnostic>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Context threaded through emission of one file.
struct Emission<'a> {
    file: &'a str,
    standard: bool,
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::from_graph(ProgramGraph::new())
    }

    /// Continues building on an existing graph (for incremental updates).
    pub fn from_graph(graph: ProgramGraph) -> Self {
        Self {
            graph,
            diagnostics: Vec::new(),
        }
    }

    /// Ingests a user source file. Returns the root vertex.
    pub fn ingest_user_file(&mut self, file: &str, root: AstNode) -> Result<VertexId> {
        self.ingest(file, root, false, &AccessorAnnotator)
    }

    /// Ingests library (standard) code. The per-file hook is a no-op.
    pub fn ingest_library_file(&mut self, file: &str, root: AstNode) -> Result<VertexId> {
        self.ingest(file, root, true, &NoopFileHook)
    }

    fn ingest(
        &mut self,
        file: &str,
        mut root: AstNode,
        standard: bool,
        hook: &dyn FileHook,
    ) -> Result<VertexId> {
        if self.graph.has_file(file) {
            debug!("Re-ingesting {}, removing previous vertices", file);
            self.graph.remove_file(file);
            self.diagnostics.retain(|d| d.file != file);
        }

        synthesize(&mut root);

        let emission = Emission { file, standard };
        let root_id = self.emit(&emission, &root, None, 0, None)?;
        self.graph
            .set_property(root_id, keys::FILE_NAME, PropertyValue::from(file))?;

        hook.after_file(&mut self.graph, root_id)?;

        debug!(
            "Ingested {} ({} vertices)",
            file,
            self.graph.file_vertices(file).len()
        );
        Ok(root_id)
    }

    /// Emits a node and its subtree. Methods get their flow built as soon
    /// as their subtree exists.
    fn emit(
        &mut self,
        emission: &Emission<'_>,
        node: &AstNode,
        parent: Option<VertexId>,
        position: usize,
        enclosing_type: Option<&str>,
    ) -> Result<VertexId> {
        let kind = VertexKind::from_label(&node.label);
        let mut properties: BTreeMap<String, PropertyValue> = node
            .properties
            .iter()
            .filter(|(key, _)| !is_structural(key))
            .map(|(key, value)| (key.clone(), PropertyValue::from_json(value)))
            .collect();

        let defining_type = match properties.get(keys::DEFINING_TYPE).and_then(PropertyValue::as_str) {
            Some(explicit) => Some(explicit.to_string()),
            None if kind.is_type_declaration() => {
                let name = node.str_prop(keys::NAME).unwrap_or_default();
                Some(match enclosing_type {
                    Some(outer) => format!("{}.{}", outer, name),
                    None => name.to_string(),
                })
            }
            None => enclosing_type.map(str::to_string),
        };
        if let Some(defining_type) = &defining_type {
            properties.insert(
                keys::DEFINING_TYPE.to_string(),
                PropertyValue::from(defining_type.as_str()),
            );
        }

        let id = self.graph.add_vertex(emission.file, &node.label, properties);
        {
            let vertex = self.graph.vertex_mut(id)?;
            vertex.child_index = explicit_index(node).unwrap_or(position);
            vertex.is_standard = emission.standard;
        }
        if let Some(parent) = parent {
            self.graph.add_edge(parent, id, EdgeKind::Child)?;
            self.graph.add_edge(id, parent, EdgeKind::Parent)?;
        }

        let mut children: Vec<(usize, &AstNode)> = node
            .children
            .iter()
            .enumerate()
            .map(|(position, child)| (explicit_index(child).unwrap_or(position), child))
            .collect();
        children.sort_by_key(|(index, _)| *index);

        let mut previous: Option<VertexId> = None;
        let count = children.len();
        for (ordinal, (index, child)) in children.into_iter().enumerate() {
            let child_id = self.emit(emission, child, Some(id), index, defining_type.as_deref())?;
            {
                let vertex = self.graph.vertex_mut(child_id)?;
                vertex.first_child = ordinal == 0;
                vertex.last_child = ordinal + 1 == count;
            }
            if let Some(previous) = previous {
                self.graph.add_edge(previous, child_id, EdgeKind::NextSibling)?;
            }
            previous = Some(child_id);
        }

        if kind == VertexKind::Method {
            self.build_flow(emission.file, id)?;
        }
        Ok(id)
    }

    fn build_flow(&mut self, file: &str, method: VertexId) -> Result<()> {
        match CfgBuilder::new(&self.graph, file).build(method) {
            Ok(cfg) => {
                cfg.apply(&mut self.graph)?;
                Ok(())
            }
            Err(GraphError::UnreachableCode(diagnostic)) => {
                warn!("Unreachable code: {}", diagnostic);
                self.diagnostics.push(diagnostic);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The graph built so far.
    pub fn graph(&self) -> &ProgramGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resolves inheritance and returns the finished graph.
    pub fn finish(mut self) -> BuildOutput {
        let resolved = InheritanceResolver::new(&mut self.graph).resolve();
        info!(
            "Built graph: {} vertices, {} edges, {} inheritance links, {} diagnostics",
            self.graph.vertex_count(),
            self.graph.edge_count(),
            resolved,
            self.diagnostics.len()
        );
        BuildOutput {
            graph: self.graph,
            diagnostics: self.diagnostics,
        }
    }
}

/// Keys the builder stores as typed fields instead of in the property bag.
fn is_structural(key: &str) -> bool {
    matches!(
        key,
        keys::CHILD_INDEX | keys::FIRST_CHILD | keys::LAST_CHILD | keys::IS_STANDARD | keys::FILE_NAME
    )
}

fn explicit_index(node: &AstNode) -> Option<usize> {
    node.properties
        .get(keys::CHILD_INDEX)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
}
