//! Inheritance resolution across all ingested files.
//!
//! Runs after every file is ingested and before any path discovery. Each
//! declared superclass and interface name is resolved against the user types
//! in the graph; matches become symmetric edge pairs, misses are external
//! types and are kept only as text on the implementor.

use crate::edge::EdgeKind;
use crate::graph::ProgramGraph;
use crate::type_table::TypeTable;
use apexflow_core::{keys, PropertyValue, VertexId, VertexKind};
use tracing::{debug, warn};

pub struct InheritanceResolver<'g> {
    graph: &'g mut ProgramGraph,
}

/// One resolved or unresolved inheritance link.
struct Link {
    from: VertexId,
    to: VertexId,
    forward: EdgeKind,
    backward: EdgeKind,
}

impl<'g> InheritanceResolver<'g> {
    pub fn new(graph: &'g mut ProgramGraph) -> Self {
        Self { graph }
    }

    /// Adds inheritance edges. Returns the number of links created.
    pub fn resolve(self) -> usize {
        let table = TypeTable::from_graph(self.graph);
        let mut links = Vec::new();
        let mut implemented: Vec<(VertexId, Vec<String>)> = Vec::new();

        let mut declarations = Vec::new();
        for kind in [VertexKind::UserClass, VertexKind::UserInterface, VertexKind::UserEnum] {
            declarations.extend(self.graph.vertices_of_kind(kind).iter().copied());
        }

        for id in declarations {
            let Some(vertex) = self.graph.vertex(id) else {
                continue;
            };
            if vertex.is_standard {
                continue;
            }

            if let Some(super_name) = vertex.str_property(keys::SUPER_CLASS_NAME) {
                if !super_name.is_empty() {
                    match table.resolve_from(id, super_name) {
                        Some(parent) if parent != id => links.push(Link {
                            from: id,
                            to: parent,
                            forward: EdgeKind::ExtensionOf,
                            backward: EdgeKind::ExtendedBy,
                        }),
                        _ => debug!("Superclass {} of {} is external", super_name, id),
                    }
                }
            }

            let interfaces = vertex.list_property(keys::INTERFACE_NAMES).to_vec();
            let mut names = Vec::with_capacity(interfaces.len());
            for interface in interfaces {
                match table.resolve_from(id, &interface) {
                    Some(target) => {
                        links.push(Link {
                            from: id,
                            to: target,
                            forward: EdgeKind::ImplementationOf,
                            backward: EdgeKind::ImplementedBy,
                        });
                        names.push(table.name_of(target).unwrap_or(&interface).to_string());
                    }
                    None => names.push(interface),
                }
            }
            if !names.is_empty() {
                implemented.push((id, names));
            }
        }

        let mut created = 0;
        for link in links {
            if self.graph.has_edge(link.from, link.to, link.forward) {
                continue;
            }
            let added = self
                .graph
                .add_edge(link.from, link.to, link.forward)
                .and_then(|_| self.graph.add_edge(link.to, link.from, link.backward));
            match added {
                Ok(()) => created += 1,
                Err(e) => warn!("Failed to link {} to {}: {}", link.from, link.to, e),
            }
        }
        for (id, names) in implemented {
            if let Err(e) =
                self.graph
                    .set_property(id, keys::IMPLEMENTED_INTERFACES, PropertyValue::List(names))
            {
                warn!("Failed to record interfaces on {}: {}", id, e);
            }
        }

        debug!(
            "Resolved {} inheritance links over {} user types",
            created,
            table.len()
        );
        created
    }
}
