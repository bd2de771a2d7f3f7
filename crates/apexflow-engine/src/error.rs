//! Error types for path construction, walking and configuration.

use crate::path::PathId;
use apexflow_core::{GraphError, VertexId};
use thiserror::Error;

/// Contract violations while building or walking paths.
///
/// Recursion, thrown exceptions and cancellation are not errors; they are
/// reported through `CallResolution` and `WalkOutcome`.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("path {path} cannot start with {label} vertex {vertex}")]
    InvalidFirstVertex {
        path: PathId,
        vertex: VertexId,
        label: String,
    },

    #[error("call-site {vertex} is already resolved on path {path}")]
    DuplicateCallSite { path: PathId, vertex: VertexId },

    #[error("static initialization of {class} is already registered on path {path}")]
    DuplicateStaticInit { path: PathId, class: String },

    #[error("path {0} is terminated")]
    PathTerminated(PathId),

    #[error("path {0} causes recursion and cannot be cloned")]
    CloneRecursivePath(PathId),

    #[error("path {0} was reached twice in one clone")]
    DoubleClone(PathId),

    #[error("vertex {vertex} is not part of path {path}")]
    VertexNotInPath { path: PathId, vertex: VertexId },

    #[error("no path with id {0}")]
    PathNotFound(PathId),

    #[error("resolved path {0} has no method vertex")]
    MissingMethod(PathId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
