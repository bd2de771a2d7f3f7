//! The path model.
//!
//! An `ApexPath` is one statically enumerated execution path through a
//! method: the method's own vertices in order, the outcome taken at each
//! branch condition, and the sub-paths that its call-sites resolve to. Sub-
//! paths are owned, so a path is a tree rooted at the entry method.
//!
//! Every path has a stable id taken from a shared generator. Clones keep the
//! id of their source.

use crate::clone::deep_clone_path;
use crate::error::PathError;
use apexflow_core::{VertexId, VertexKind};
use apexflow_graph::ProgramGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(pub u64);

impl std::fmt::Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path-{}", self.0)
    }
}

/// Hands out path ids. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct PathIdGenerator {
    next: Arc<AtomicU64>,
}

impl PathIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> PathId {
        PathId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// The branch taken at a condition vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOutcome {
    Positive,
    Negative,
    /// A placeholder recorded before the branch was known.
    Unknown,
}

/// A vertex as visited on a specific path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathVertex {
    pub path_id: PathId,
    pub vertex: VertexId,
}

/// The call-site whose resolution would re-enter a method already being
/// discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursionMarker {
    /// The statement of this path that contains the call.
    pub top_level: VertexId,
    pub invocation: VertexId,
}

/// Result of looking up a call-site on a path.
#[derive(Debug)]
pub enum CallResolution<'a> {
    Path(&'a ApexPath),
    Unresolved,
    /// The call-site re-enters a method on the discovery stack. Carries the
    /// path that owns the call; do not descend.
    Recursive(&'a ApexPath),
}

#[derive(Debug)]
pub struct ApexPath {
    pub(crate) stable_id: PathId,
    pub(crate) method: Option<VertexId>,
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) conditions: HashMap<VertexId, ConditionOutcome>,
    pub(crate) exception_vertex: Option<VertexId>,
    pub(crate) recursion: Option<RecursionMarker>,
    pub(crate) invocable_paths: BTreeMap<VertexId, ApexPath>,
    pub(crate) invocable_top_level: BTreeMap<VertexId, VertexId>,
    pub(crate) new_object_paths: BTreeMap<VertexId, ApexPath>,
    /// Keyed by lowercase class name.
    pub(crate) static_init_paths: BTreeMap<String, ApexPath>,
    pub(crate) constructor_path: Option<Box<ApexPath>>,
    pub(crate) instance_init_path: Option<Box<ApexPath>>,
}

impl ApexPath {
    pub fn new(stable_id: PathId, method: Option<VertexId>) -> Self {
        Self {
            stable_id,
            method,
            vertices: Vec::new(),
            conditions: HashMap::new(),
            exception_vertex: None,
            recursion: None,
            invocable_paths: BTreeMap::new(),
            invocable_top_level: BTreeMap::new(),
            new_object_paths: BTreeMap::new(),
            static_init_paths: BTreeMap::new(),
            constructor_path: None,
            instance_init_path: None,
        }
    }

    pub fn stable_id(&self) -> PathId {
        self.stable_id
    }

    /// The method this path runs through. Initialization paths have none.
    pub fn method(&self) -> Option<VertexId> {
        self.method
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn condition(&self, vertex: VertexId) -> Option<ConditionOutcome> {
        self.conditions.get(&vertex).copied()
    }

    pub fn conditions(&self) -> &HashMap<VertexId, ConditionOutcome> {
        &self.conditions
    }

    /// Appends a run of this method's own vertices.
    ///
    /// The first vertex of a path must be a block statement, a field or a
    /// call expression.
    pub fn add_vertices(&mut self, graph: &ProgramGraph, vertices: &[VertexId]) -> Result<(), PathError> {
        if self.vertices.is_empty() {
            if let Some(&first) = vertices.first() {
                let vertex = graph.require(first)?;
                let valid = matches!(vertex.kind, VertexKind::BlockStatement | VertexKind::Field)
                    || vertex.kind.is_invocable();
                if !valid {
                    return Err(PathError::InvalidFirstVertex {
                        path: self.stable_id,
                        vertex: first,
                        label: vertex.label.clone(),
                    });
                }
            }
        }
        self.vertices.extend_from_slice(vertices);
        Ok(())
    }

    pub fn set_condition(&mut self, vertex: VertexId, outcome: ConditionOutcome) {
        self.conditions.insert(vertex, outcome);
    }

    /// Own flags only: an exception was recorded or this path holds the
    /// recursion-causing call-site.
    pub fn is_terminated(&self) -> bool {
        self.exception_vertex.is_some() || self.recursion.is_some()
    }

    /// True if this path, or any path it calls into, holds a recursion marker.
    pub fn is_recursion_terminated(&self) -> bool {
        self.recursion.is_some()
            || self
                .invocable_paths
                .values()
                .chain(self.new_object_paths.values())
                .any(ApexPath::is_recursion_terminated)
    }

    fn check_open(&self) -> Result<(), PathError> {
        if self.is_terminated() {
            return Err(PathError::PathTerminated(self.stable_id));
        }
        Ok(())
    }

    /// Registers the sub-path a call-site resolves to.
    pub fn put_invocable_expression(
        &mut self,
        invocation: VertexId,
        top_level: VertexId,
        path: ApexPath,
    ) -> Result<(), PathError> {
        self.check_open()?;
        if self.invocable_paths.contains_key(&invocation) {
            return Err(PathError::DuplicateCallSite {
                path: self.stable_id,
                vertex: invocation,
            });
        }
        self.invocable_paths.insert(invocation, path);
        self.invocable_top_level.insert(invocation, top_level);
        Ok(())
    }

    /// Registers the field-initialization path of an instantiated class.
    pub fn put_new_object_expression(&mut self, invocation: VertexId, path: ApexPath) -> Result<(), PathError> {
        self.check_open()?;
        if self.new_object_paths.contains_key(&invocation) {
            return Err(PathError::DuplicateCallSite {
                path: self.stable_id,
                vertex: invocation,
            });
        }
        self.new_object_paths.insert(invocation, path);
        Ok(())
    }

    /// Registers a class's static initialization path.
    pub fn put_static_initialization_path(&mut self, class: &str, path: ApexPath) -> Result<(), PathError> {
        self.check_open()?;
        let key = class.to_lowercase();
        if self.static_init_paths.contains_key(&key) {
            return Err(PathError::DuplicateStaticInit {
                path: self.stable_id,
                class: class.to_string(),
            });
        }
        self.static_init_paths.insert(key, path);
        Ok(())
    }

    pub fn set_constructor_path(&mut self, path: ApexPath) {
        self.constructor_path = Some(Box::new(path));
    }

    pub fn set_instance_init_path(&mut self, path: ApexPath) {
        self.instance_init_path = Some(Box::new(path));
    }

    /// Flags the path as ending in an exception at `vertex`.
    ///
    /// The vertex must be on this path. When `outcome` is `Unknown` the
    /// vertex is a condition placeholder and is matched by id against the
    /// conditions recorded with a concrete outcome.
    pub fn put_path_ends_in_exception(
        &mut self,
        vertex: VertexId,
        outcome: Option<ConditionOutcome>,
    ) -> Result<(), PathError> {
        let present = match outcome {
            Some(ConditionOutcome::Unknown) => self
                .conditions
                .get(&vertex)
                .map(|o| *o != ConditionOutcome::Unknown)
                .unwrap_or(false),
            Some(expected) => self.conditions.get(&vertex) == Some(&expected),
            None => self.vertices.contains(&vertex),
        };
        if !present {
            return Err(PathError::VertexNotInPath {
                path: self.stable_id,
                vertex,
            });
        }
        self.exception_vertex = Some(vertex);
        Ok(())
    }

    /// Marks `invocation` as the call-site that would recurse.
    pub fn put_recursion(&mut self, top_level: VertexId, invocation: VertexId) -> Result<(), PathError> {
        self.check_open()?;
        self.recursion = Some(RecursionMarker {
            top_level,
            invocation,
        });
        Ok(())
    }

    pub fn recursion(&self) -> Option<RecursionMarker> {
        self.recursion
    }

    /// Looks up what a call-site resolves to on this path.
    pub fn resolve_invocable_call(&self, invocation: VertexId) -> CallResolution<'_> {
        if self.recursion.map(|m| m.invocation) == Some(invocation) {
            return CallResolution::Recursive(self);
        }
        match self.invocable_paths.get(&invocation) {
            Some(path) => CallResolution::Path(path),
            None => CallResolution::Unresolved,
        }
    }

    /// The statement of this path that contains a resolved call-site.
    pub fn top_level_of(&self, invocation: VertexId) -> Option<VertexId> {
        self.invocable_top_level.get(&invocation).copied()
    }

    pub fn invocable_paths(&self) -> &BTreeMap<VertexId, ApexPath> {
        &self.invocable_paths
    }

    pub fn new_object_path(&self, invocation: VertexId) -> Option<&ApexPath> {
        self.new_object_paths.get(&invocation)
    }

    pub fn static_init_path(&self, class: &str) -> Option<&ApexPath> {
        self.static_init_paths.get(&class.to_lowercase())
    }

    pub fn static_init_paths(&self) -> &BTreeMap<String, ApexPath> {
        &self.static_init_paths
    }

    pub fn constructor_path(&self) -> Option<&ApexPath> {
        self.constructor_path.as_deref()
    }

    pub fn instance_init_path(&self) -> Option<&ApexPath> {
        self.instance_init_path.as_deref()
    }

    /// True if the path throws, or any resolved call does. Stops at the
    /// first match.
    pub fn ends_in_exception(&self) -> bool {
        self.throw_statement().is_some()
    }

    /// The vertex at which this path, or the first resolved call that does,
    /// ends in an exception.
    pub fn throw_statement(&self) -> Option<VertexId> {
        self.exception_vertex.or_else(|| {
            self.invocable_paths
                .values()
                .find_map(ApexPath::throw_statement)
        })
    }

    /// An independent copy with the same ids. Fails for recursion-flagged
    /// paths.
    pub fn deep_clone(&self) -> Result<ApexPath, PathError> {
        deep_clone_path(self, &mut HashSet::new())
    }

    /// Finds a path by id in this tree. Search order: this path, new-object
    /// paths, static initialization paths, call sub-paths, the constructor
    /// path, then the instance initialization path.
    pub fn path_with_stable_id(&self, id: PathId) -> Result<&ApexPath, PathError> {
        self.find(id).ok_or(PathError::PathNotFound(id))
    }

    fn find(&self, id: PathId) -> Option<&ApexPath> {
        if self.stable_id == id {
            return Some(self);
        }
        self.new_object_paths
            .values()
            .chain(self.static_init_paths.values())
            .chain(self.invocable_paths.values())
            .chain(self.constructor_path.as_deref())
            .chain(self.instance_init_path.as_deref())
            .find_map(|path| path.find(id))
    }

    /// Number of paths in this tree, including this one.
    pub fn tree_size(&self) -> usize {
        1 + self
            .new_object_paths
            .values()
            .chain(self.static_init_paths.values())
            .chain(self.invocable_paths.values())
            .chain(self.constructor_path.as_deref())
            .chain(self.instance_init_path.as_deref())
            .map(ApexPath::tree_size)
            .sum::<usize>()
    }
}
