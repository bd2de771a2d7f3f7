//! Deep cloning of path trees.
//!
//! Cloning follows the owned edges of a path (call sub-paths, new-object
//! paths, static initialization paths, constructor and instance
//! initialization paths) and copies every map. Ids are kept. The set of ids
//! already cloned guards against reaching one path twice in a single clone.

use crate::error::PathError;
use crate::path::{ApexPath, PathId};
use std::collections::{BTreeMap, HashSet};

/// Clones `source` and everything it owns.
///
/// Fails for a path that holds a recursion marker: such paths are terminal
/// and are never forked.
pub fn deep_clone_path(source: &ApexPath, cloned: &mut HashSet<PathId>) -> Result<ApexPath, PathError> {
    if source.recursion.is_some() {
        return Err(PathError::CloneRecursivePath(source.stable_id));
    }
    if !cloned.insert(source.stable_id) {
        return Err(PathError::DoubleClone(source.stable_id));
    }

    let invocable_paths = clone_map(&source.invocable_paths, cloned)?;
    let new_object_paths = clone_map(&source.new_object_paths, cloned)?;
    let static_init_paths = clone_map(&source.static_init_paths, cloned)?;
    let constructor_path = match &source.constructor_path {
        Some(path) => Some(Box::new(deep_clone_path(path, cloned)?)),
        None => None,
    };
    let instance_init_path = match &source.instance_init_path {
        Some(path) => Some(Box::new(deep_clone_path(path, cloned)?)),
        None => None,
    };

    Ok(ApexPath {
        stable_id: source.stable_id,
        method: source.method,
        vertices: source.vertices.clone(),
        conditions: source.conditions.clone(),
        exception_vertex: source.exception_vertex,
        recursion: None,
        invocable_paths,
        invocable_top_level: source.invocable_top_level.clone(),
        new_object_paths,
        static_init_paths,
        constructor_path,
        instance_init_path,
    })
}

fn clone_map<K: Ord + Clone>(
    source: &BTreeMap<K, ApexPath>,
    cloned: &mut HashSet<PathId>,
) -> Result<BTreeMap<K, ApexPath>, PathError> {
    source
        .iter()
        .map(|(key, path)| Ok((key.clone(), deep_clone_path(path, cloned)?)))
        .collect()
}
