//! Method resolution for call-sites.
//!
//! Resolution is syntactic: unqualified and `this.` calls look in the calling
//! class and its superclasses, `Type.m(...)` looks in `Type` when it is a
//! known class, and calls on variables stay unresolved. Methods match by
//! name, ignoring case, and by argument count.

use crate::error::PathError;
use apexflow_core::{keys, VertexId, VertexKind};
use apexflow_graph::{synthesis, EdgeKind, GraphProvider, ProgramGraph, VertexQuery};
use tracing::debug;

/// What a call-site resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Method { method: VertexId, class: String },
    /// `new T(...)`: the constructor, if one matches, and the class whose
    /// fields get initialized.
    NewObject {
        class: String,
        constructor: Option<VertexId>,
    },
    Unresolved,
}

pub struct MethodResolver<'p> {
    provider: &'p mut GraphProvider,
}

impl<'p> MethodResolver<'p> {
    pub fn new(provider: &'p mut GraphProvider) -> Self {
        Self { provider }
    }

    fn graph(&self) -> &ProgramGraph {
        self.provider.graph()
    }

    /// Loads a class if needed and returns its declaration vertex.
    pub fn class(&mut self, name: &str) -> Result<Option<VertexId>, PathError> {
        if !self.provider.ensure_class(name)? {
            return Ok(None);
        }
        Ok(class_vertex(self.graph(), name))
    }

    /// Resolves a call-site vertex.
    pub fn resolve(&mut self, site: VertexId) -> Result<CallTarget, PathError> {
        let (kind, calling_class, method_name, full_name, type_name, arity) = {
            let vertex = self.graph().require(site)?;
            let arity = self.graph().children(site).len();
            (
                vertex.kind,
                vertex.defining_type().unwrap_or_default().to_string(),
                vertex.str_property(keys::METHOD_NAME).unwrap_or_default().to_string(),
                vertex.str_property(keys::FULL_METHOD_NAME).unwrap_or_default().to_string(),
                vertex.str_property(keys::TYPE).unwrap_or_default().to_string(),
                vertex.arity().unwrap_or(arity),
            )
        };

        let target = match kind {
            VertexKind::MethodCallExpression => {
                let qualifier = full_name
                    .rsplit_once('.')
                    .map(|(q, _)| q.to_string())
                    .unwrap_or_default();
                let owner = if qualifier.is_empty() || qualifier.eq_ignore_ascii_case("this") {
                    calling_class
                } else {
                    qualifier
                };
                match self.class(&owner)? {
                    Some(class) => match self.find_method(class, &method_name, arity) {
                        Some((method, class)) => CallTarget::Method { method, class },
                        None => CallTarget::Unresolved,
                    },
                    None => CallTarget::Unresolved,
                }
            }
            VertexKind::ThisMethodCallExpression => match self.class(&calling_class)? {
                Some(class) => self.constructor_target(class, arity),
                None => CallTarget::Unresolved,
            },
            VertexKind::SuperMethodCallExpression => match self.class(&calling_class)? {
                Some(class) => match self.superclass(class) {
                    Some(parent) => self.constructor_target(parent, arity),
                    None => CallTarget::Unresolved,
                },
                None => CallTarget::Unresolved,
            },
            VertexKind::NewObjectExpression => match self.class(&type_name)? {
                Some(class) => CallTarget::NewObject {
                    class: self.declared_name(class),
                    constructor: self.constructor(class, arity),
                },
                None => CallTarget::Unresolved,
            },
            _ => CallTarget::Unresolved,
        };
        if target == CallTarget::Unresolved {
            debug!("Call-site {} left unresolved", site);
        }
        Ok(target)
    }

    fn constructor_target(&self, class: VertexId, arity: usize) -> CallTarget {
        match self.constructor(class, arity) {
            Some(method) => CallTarget::Method {
                method,
                class: self.declared_name(class),
            },
            None => CallTarget::Unresolved,
        }
    }

    fn declared_name(&self, class: VertexId) -> String {
        self.graph()
            .vertex(class)
            .and_then(|v| v.defining_type())
            .unwrap_or_default()
            .to_string()
    }

    /// The resolved superclass. Supertypes are loaded with their subclass.
    pub fn superclass(&self, class: VertexId) -> Option<VertexId> {
        self.graph()
            .out_neighbors(class, EdgeKind::ExtensionOf)
            .into_iter()
            .next()
    }

    /// Looks for a method in `class`, then up the superclass chain.
    /// Constructors are not inherited.
    pub fn find_method(&self, class: VertexId, name: &str, arity: usize) -> Option<(VertexId, String)> {
        let name = name.to_lowercase();
        let mut current = Some(class);
        let mut seen = Vec::new();
        while let Some(class) = current {
            if seen.contains(&class) {
                break;
            }
            seen.push(class);
            let graph = self.graph();
            let found = graph
                .children_of_kind(class, VertexKind::Method)
                .into_iter()
                .find(|m| {
                    graph
                        .vertex(*m)
                        .map(|v| {
                            !v.is_constructor()
                                && v.name_ci() == Some(name.as_str())
                                && method_arity(graph, *m) == arity
                        })
                        .unwrap_or(false)
                });
            if let Some(method) = found {
                return Some((method, self.declared_name(class)));
            }
            current = self.superclass(class);
        }
        None
    }

    pub fn constructor(&self, class: VertexId, arity: usize) -> Option<VertexId> {
        let graph = self.graph();
        graph
            .children_of_kind(class, VertexKind::Method)
            .into_iter()
            .find(|m| {
                graph
                    .vertex(*m)
                    .map(|v| v.is_constructor() && method_arity(graph, *m) == arity)
                    .unwrap_or(false)
            })
    }

    /// Non-static fields, in declaration order.
    pub fn instance_fields(&self, class: VertexId) -> Vec<VertexId> {
        self.fields(class, false)
    }

    pub fn static_fields(&self, class: VertexId) -> Vec<VertexId> {
        self.fields(class, true)
    }

    fn fields(&self, class: VertexId, is_static: bool) -> Vec<VertexId> {
        let graph = self.graph();
        graph
            .children_of_kind(class, VertexKind::Field)
            .into_iter()
            .filter(|f| graph.vertex(*f).map(|v| v.is_static() == is_static).unwrap_or(false))
            .collect()
    }

    /// The method that runs a class's static blocks: the static-block
    /// invoker when blocks were split, otherwise the static initializer.
    pub fn static_initializer(&self, class: VertexId) -> Option<VertexId> {
        let graph = self.graph();
        let methods = graph.children_of_kind(class, VertexKind::Method);
        let invoker = methods.iter().copied().find(|m| {
            graph
                .vertex(*m)
                .map(|v| v.bool_property(keys::STATIC_BLOCK_INVOKER))
                .unwrap_or(false)
        });
        invoker.or_else(|| {
            methods.into_iter().find(|m| {
                graph
                    .vertex(*m)
                    .and_then(|v| v.name())
                    .map(|n| n.eq_ignore_ascii_case(synthesis::STATIC_INITIALIZER))
                    .unwrap_or(false)
            })
        })
    }
}

pub(crate) fn class_vertex(graph: &ProgramGraph, name: &str) -> Option<VertexId> {
    graph.query_one(
        &VertexQuery::kinds(&[VertexKind::UserClass, VertexKind::UserEnum])
            .eq_ignore_case(keys::DEFINING_TYPE, name),
    )
}

/// Qualifier of a member reference such as `Config.LIMIT`. Whether it names
/// a class is up to the caller.
pub fn reference_qualifier(graph: &ProgramGraph, vertex: VertexId) -> Option<String> {
    if graph.kind(vertex) != Some(VertexKind::VariableExpression) {
        return None;
    }
    graph
        .children_of_kind(vertex, VertexKind::ReferenceExpression)
        .into_iter()
        .next()
        .and_then(|reference| graph.vertex(reference))
        .and_then(|reference| reference.name())
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("this"))
        .map(str::to_string)
}

/// Qualifiers of every member reference under `vertex`. Nested statements
/// are skipped.
pub(crate) fn reference_qualifiers(graph: &ProgramGraph, vertex: VertexId, out: &mut Vec<String>) {
    if let Some(qualifier) = reference_qualifier(graph, vertex) {
        out.push(qualifier);
    }
    for child in graph.children(vertex) {
        if graph.kind(child).map(|k| k.is_control_flow()).unwrap_or(false) {
            continue;
        }
        reference_qualifiers(graph, child, out);
    }
}

/// Declared arity, or the parameter count when none is recorded.
pub fn method_arity(graph: &ProgramGraph, method: VertexId) -> usize {
    graph
        .vertex(method)
        .and_then(|v| v.arity())
        .unwrap_or_else(|| graph.children_of_kind(method, VertexKind::Parameter).len())
}
