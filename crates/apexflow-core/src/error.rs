//! Error types for graph construction and queries.

use crate::vertex::VertexId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A problem in the analysed source that the end user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub defining_type: String,
    pub line: u32,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} ({}): {}",
            self.file, self.line, self.defining_type, self.message
        )
    }
}

#[derive(Error, Debug)]
pub enum GraphError {
    /// User-facing: a statement can never execute.
    #[error("unreachable code at {0}")]
    UnreachableCode(Diagnostic),

    #[error("vertex {0} does not exist")]
    UnknownVertex(VertexId),

    #[error("{label} vertex {vertex} is missing its {expected} child")]
    MissingChild {
        vertex: VertexId,
        label: String,
        expected: &'static str,
    },

    #[error("{label} vertex {vertex} has an unexpected {found} child")]
    UnexpectedChild {
        vertex: VertexId,
        label: String,
        found: String,
    },

    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),

    #[error("{0} has not been initialized")]
    NotInitialized(&'static str),
}

impl GraphError {
    /// True for errors that belong in the user-facing report.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, GraphError::UnreachableCode(_))
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
