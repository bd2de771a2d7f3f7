//! Per-file hooks run after a file root has been ingested.

use crate::graph::ProgramGraph;
use apexflow_core::{keys, PropertyValue, Result, VertexId, VertexKind};
use tracing::debug;

/// Callback invoked once a file's vertices and flow edges exist.
pub trait FileHook {
    fn after_file(&self, graph: &mut ProgramGraph, root: VertexId) -> Result<()>;
}

/// Used for library code.
pub struct NoopFileHook;

impl FileHook for NoopFileHook {
    fn after_file(&self, _graph: &mut ProgramGraph, _root: VertexId) -> Result<()> {
        Ok(())
    }
}

/// Marks property backing fields whose accessors have explicit bodies.
///
/// Accessors are the class methods `__sfdc_<name>`: arity 0 is the getter,
/// arity 1 the setter. A bodiless accessor leaves the field unmarked.
pub struct AccessorAnnotator;

const ACCESSOR_PREFIX: &str = "__sfdc_";

impl FileHook for AccessorAnnotator {
    fn after_file(&self, graph: &mut ProgramGraph, root: VertexId) -> Result<()> {
        let mut classes = Vec::new();
        collect_classes(graph, root, &mut classes);

        let mut marked = 0usize;
        for class in classes {
            let methods = graph.children_of_kind(class, VertexKind::Method);
            let fields = graph.children_of_kind(class, VertexKind::Field);
            let properties = graph.children_of_kind(class, VertexKind::Property);

            for property in properties {
                let Some(name) = graph.vertex(property).and_then(|p| p.name_ci()) else {
                    continue;
                };
                let accessor = format!("{}{}", ACCESSOR_PREFIX, name);
                let field = fields
                    .iter()
                    .copied()
                    .find(|f| graph.vertex(*f).and_then(|v| v.name_ci()) == Some(name));
                let Some(field) = field else {
                    continue;
                };

                let mut getter = false;
                let mut setter = false;
                for method in &methods {
                    let Some(vertex) = graph.vertex(*method) else {
                        continue;
                    };
                    if vertex.name_ci() != Some(accessor.as_str()) {
                        continue;
                    }
                    let has_body = !graph
                        .children_of_kind(*method, VertexKind::BlockStatement)
                        .is_empty();
                    match vertex.arity() {
                        Some(0) => getter |= has_body,
                        Some(1) => setter |= has_body,
                        _ => {}
                    }
                }

                if getter {
                    graph.set_property(field, keys::HAS_GETTER_BLOCK, PropertyValue::Bool(true))?;
                    marked += 1;
                }
                if setter {
                    graph.set_property(field, keys::HAS_SETTER_BLOCK, PropertyValue::Bool(true))?;
                    marked += 1;
                }
            }
        }
        if marked > 0 {
            debug!("Annotated {} accessor blocks", marked);
        }
        Ok(())
    }
}

fn collect_classes(graph: &ProgramGraph, id: VertexId, out: &mut Vec<VertexId>) {
    if graph.kind(id) == Some(VertexKind::UserClass) {
        out.push(id);
    }
    for child in graph.children(id) {
        if graph
            .kind(child)
            .map(|k| k.is_type_declaration())
            .unwrap_or(false)
        {
            collect_classes(graph, child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;
    use apexflow_core::{keys, AstNode, VertexKind};

    fn class_with_property(getter_body: bool, setter_body: bool) -> AstNode {
        let mut getter = AstNode::method("__sfdc_count", 0);
        if getter_body {
            getter = getter.child(AstNode::block(vec![AstNode::new("ReturnStatement")]));
        }
        let mut setter = AstNode::method("__sfdc_count", 1).child(AstNode::new("Parameter"));
        if setter_body {
            setter = setter.child(AstNode::block(vec![]));
        }
        AstNode::user_class("Counter")
            .child(AstNode::new("Field").with(keys::NAME, "count"))
            .child(AstNode::new("Property").with(keys::NAME, "Count"))
            .child(getter)
            .child(setter)
    }

    fn field_flags(class: AstNode, user: bool) -> (bool, bool) {
        let mut builder = GraphBuilder::new();
        if user {
            builder.ingest_user_file("Counter.cls", class).unwrap();
        } else {
            builder.ingest_library_file("Counter.cls", class).unwrap();
        }
        let graph = builder.finish().graph;
        let field = graph.vertices_of_kind(VertexKind::Field)[0];
        let vertex = graph.vertex(field).unwrap();
        (
            vertex.bool_property(keys::HAS_GETTER_BLOCK),
            vertex.bool_property(keys::HAS_SETTER_BLOCK),
        )
    }

    #[test]
    fn test_getter_with_body_marks_field() {
        assert_eq!(field_flags(class_with_property(true, false), true), (true, false));
    }

    #[test]
    fn test_bodiless_accessors_leave_field_unmarked() {
        assert_eq!(field_flags(class_with_property(false, false), true), (false, false));
    }

    #[test]
    fn test_library_code_is_not_annotated() {
        assert_eq!(field_flags(class_with_property(true, true), false), (false, false));
    }
}
