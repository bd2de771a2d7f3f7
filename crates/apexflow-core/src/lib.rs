//! Apexflow Core - vertex model and AST input
//!
//! This crate defines the vocabulary shared by the rest of the workspace:
//! the closed set of vertex kinds, typed vertices with their property bags,
//! the AST trees handed to ingestion, and the graph-level error type.
//!
//! # Example
//!
//! ```
//! use apexflow_core::{AstNode, VertexKind};
//!
//! let class = AstNode::user_class("Greeter")
//!     .child(AstNode::method("hello", 0).child(AstNode::block(vec![])));
//!
//! assert_eq!(class.size(), 3);
//! assert_eq!(VertexKind::from_label(&class.label), VertexKind::UserClass);
//! ```

pub mod ast;
pub mod error;
pub mod kind;
pub mod property;
pub mod vertex;

pub use ast::AstNode;
pub use error::{Diagnostic, GraphError, Result};
pub use kind::VertexKind;
pub use property::{keys, PropertyValue};
pub use vertex::{Vertex, VertexId};
