//! Core graph data structure.
//!
//! ProgramGraph wraps a petgraph `StableDiGraph` and adds indexes for fast
//! lookups by vertex id, kind and source file. Vertex ids are assigned here
//! and stay stable when vertices are removed or copied into another graph.

use crate::edge::{Edge, EdgeKind, GraphEdge};
use apexflow_core::{keys, GraphError, PropertyValue, Result, Vertex, VertexId, VertexKind};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The program graph: one vertex per AST node plus synthesized vertices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: StableDiGraph<Vertex, Edge>,

    /// Maps vertex ids to graph node indexes.
    id_index: HashMap<VertexId, NodeIndex>,

    /// Maps vertex kinds to vertex ids, in insertion order.
    kind_index: HashMap<VertexKind, Vec<VertexId>>,

    /// Maps source files to their vertices (for incremental updates).
    file_index: HashMap<String, Vec<VertexId>>,

    next_id: u64,
}

impl Default for ProgramGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            kind_index: HashMap::new(),
            file_index: HashMap::new(),
            next_id: 1,
        }
    }

    /// Adds a vertex built from a label and property bag, assigning a new id.
    pub fn add_vertex(
        &mut self,
        file: &str,
        label: &str,
        properties: BTreeMap<String, PropertyValue>,
    ) -> VertexId {
        let id = VertexId(self.next_id);
        self.insert_vertex(file, Vertex::new(id, label, properties))
    }

    /// Inserts an existing vertex, keeping its id.
    ///
    /// Inserting an id that is already present is a no-op.
    pub fn insert_vertex(&mut self, file: &str, vertex: Vertex) -> VertexId {
        let id = vertex.id;
        if self.id_index.contains_key(&id) {
            return id;
        }
        self.next_id = self.next_id.max(id.0 + 1);

        let kind = vertex.kind;
        let index = self.graph.add_node(vertex);

        // Update indexes
        self.id_index.insert(id, index);
        self.kind_index.entry(kind).or_default().push(id);
        self.file_index.entry(file.to_string()).or_default().push(id);

        id
    }

    /// Adds a directed edge between two existing vertices.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, kind: EdgeKind) -> Result<()> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        self.graph.add_edge(from_idx, to_idx, Edge::new(kind));
        Ok(())
    }

    /// True if an edge of `kind` runs from `from` to `to`.
    pub fn has_edge(&self, from: VertexId, to: VertexId, kind: EdgeKind) -> bool {
        match (self.id_index.get(&from), self.id_index.get(&to)) {
            (Some(&from_idx), Some(&to_idx)) => self
                .graph
                .edges_connecting(from_idx, to_idx)
                .any(|edge| edge.weight().kind == kind),
            _ => false,
        }
    }

    fn index_of(&self, id: VertexId) -> Result<NodeIndex> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(GraphError::UnknownVertex(id))
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Gets a vertex by id.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        let index = self.id_index.get(&id)?;
        self.graph.node_weight(*index)
    }

    /// Gets a vertex by id, failing if it does not exist.
    pub fn require(&self, id: VertexId) -> Result<&Vertex> {
        self.vertex(id).ok_or(GraphError::UnknownVertex(id))
    }

    pub fn kind(&self, id: VertexId) -> Option<VertexKind> {
        self.vertex(id).map(|v| v.kind)
    }

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        let index = self.index_of(id)?;
        self.graph
            .node_weight_mut(index)
            .ok_or(GraphError::UnknownVertex(id))
    }

    /// Writes an annotation property on a vertex.
    pub fn set_property(&mut self, id: VertexId, key: &str, value: PropertyValue) -> Result<()> {
        self.vertex_mut(id)?.set_property(key, value);
        Ok(())
    }

    /// Children in child-index order. Gaps in the numbering are skipped.
    pub fn children(&self, id: VertexId) -> Vec<VertexId> {
        let mut children: Vec<&Vertex> = self
            .out_neighbors(id, EdgeKind::Child)
            .into_iter()
            .filter_map(|child| self.vertex(child))
            .collect();
        children.sort_by_key(|v| (v.child_index, v.id));
        children.into_iter().map(|v| v.id).collect()
    }

    /// Children of a given kind, in order.
    pub fn children_of_kind(&self, id: VertexId, kind: VertexKind) -> Vec<VertexId> {
        self.children(id)
            .into_iter()
            .filter(|child| self.kind(*child) == Some(kind))
            .collect()
    }

    pub fn parent(&self, id: VertexId) -> Option<VertexId> {
        self.out_neighbors(id, EdgeKind::Parent).into_iter().next()
    }

    /// Targets of outgoing edges of `kind`, in the order the edges were added.
    pub fn out_neighbors(&self, id: VertexId, kind: EdgeKind) -> Vec<VertexId> {
        self.neighbors(id, kind, Direction::Outgoing)
    }

    /// Sources of incoming edges of `kind`, in the order the edges were added.
    pub fn in_neighbors(&self, id: VertexId, kind: EdgeKind) -> Vec<VertexId> {
        self.neighbors(id, kind, Direction::Incoming)
    }

    fn neighbors(&self, id: VertexId, kind: EdgeKind, direction: Direction) -> Vec<VertexId> {
        let Some(&index) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let mut found: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .filter(|edge| edge.weight().kind == kind)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (edge.id(), other)
            })
            .collect();
        found.sort_by_key(|(edge, _)| *edge);
        found
            .into_iter()
            .filter_map(|(_, other)| self.graph.node_weight(other).map(|v| v.id))
            .collect()
    }

    /// Every edge touching `id`, as `(source, target, kind)`.
    pub fn incident_edges(&self, id: VertexId) -> Vec<(VertexId, VertexId, EdgeKind)> {
        let Some(&index) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let outgoing = self.graph.edges_directed(index, Direction::Outgoing);
        let incoming = self.graph.edges_directed(index, Direction::Incoming);
        let mut edges: Vec<_> = outgoing
            .chain(incoming)
            .map(|edge| (edge.id(), edge.source(), edge.target(), edge.weight().kind))
            .collect();
        edges.sort_by_key(|(edge, ..)| *edge);
        edges
            .into_iter()
            .filter_map(|(_, source, target, kind)| {
                let source = self.graph.node_weight(source)?.id;
                let target = self.graph.node_weight(target)?.id;
                Some((source, target, kind))
            })
            .collect()
    }

    /// All vertices of a kind, in insertion order.
    pub fn vertices_of_kind(&self, kind: VertexKind) -> &[VertexId] {
        self.kind_index.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Walks `Parent` edges up to the file root.
    pub fn root_of(&self, id: VertexId) -> VertexId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// The source file recorded on the root above `id`.
    pub fn file_of(&self, id: VertexId) -> Option<String> {
        self.vertex(self.root_of(id))
            .and_then(|root| root.str_property(keys::FILE_NAME))
            .map(str::to_string)
    }

    /// Vertex ids belonging to a source file.
    pub fn file_vertices(&self, file: &str) -> &[VertexId] {
        self.file_index.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_file(&self, file: &str) -> bool {
        self.file_index.contains_key(file)
    }

    /// Removes vertices and every edge touching them.
    pub fn remove_vertices(&mut self, ids: &[VertexId]) {
        for id in ids {
            if let Some(index) = self.id_index.remove(id) {
                if let Some(vertex) = self.graph.remove_node(index) {
                    if let Some(list) = self.kind_index.get_mut(&vertex.kind) {
                        list.retain(|other| other != id);
                    }
                }
            }
        }
        for list in self.file_index.values_mut() {
            list.retain(|id| self.id_index.contains_key(id));
        }
        self.file_index.retain(|_, list| !list.is_empty());
    }

    /// Removes all vertices from a file. Used for incremental updates.
    pub fn remove_file(&mut self, file: &str) {
        if let Some(ids) = self.file_index.remove(file) {
            self.remove_vertices(&ids);
        }
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges of one kind.
    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.graph
            .edge_weights()
            .filter(|edge| edge.kind == kind)
            .count()
    }

    /// Iterates over all vertices.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    /// Returns all edges with source and target ids for export.
    pub fn export_edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .filter_map(|edge_ref| {
                let source = self.graph.node_weight(edge_ref.source())?.id;
                let target = self.graph.node_weight(edge_ref.target())?.id;
                Some(GraphEdge {
                    source: source.0,
                    target: target.0,
                    kind: edge_ref.weight().kind,
                })
            })
            .collect()
    }
}

/// Graph statistics for the status command.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub cfg_edge_count: usize,
    pub files: usize,
}

impl ProgramGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            vertex_count: self.vertex_count(),
            edge_count: self.edge_count(),
            cfg_edge_count: self.edge_count_of(EdgeKind::CfgPath),
            files: self.file_index.len(),
        }
    }
}
