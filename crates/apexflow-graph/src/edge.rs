//! Edge types for the program graph.
//!
//! Tree edges come from ingestion, `CfgPath` edges from the control-flow
//! builder, and the inheritance pairs from the resolver. Inheritance edges
//! are always added in symmetric pairs.

use serde::{Deserialize, Serialize};

/// The type of relationship between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Child to parent.
    Parent,

    /// Parent to child.
    Child,

    /// A child to the child that follows it.
    NextSibling,

    /// Control flow: statement A may execute right before statement B.
    CfgPath,

    /// Class to the class it extends.
    ExtensionOf,

    /// Class to a class that extends it.
    ExtendedBy,

    /// Class to an interface it implements.
    ImplementationOf,

    /// Interface to a class that implements it.
    ImplementedBy,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::NextSibling => "next_sibling",
            Self::CfgPath => "cfg_path",
            Self::ExtensionOf => "extension_of",
            Self::ExtendedBy => "extended_by",
            Self::ImplementationOf => "implementation_of",
            Self::ImplementedBy => "implemented_by",
        };
        write!(f, "{}", s)
    }
}

/// An edge in the program graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// The kind of relationship.
    pub kind: EdgeKind,
}

impl Edge {
    /// Creates a new edge.
    pub fn new(kind: EdgeKind) -> Self {
        Self { kind }
    }
}

/// A flattened edge for graph export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: u64,
    pub target: u64,
    pub kind: EdgeKind,
}
